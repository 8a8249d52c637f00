// In-memory fakes shared by the poll moderation tests.

use super::audit::AuditEntry;
use super::guild_config::{ConfigError, ConfigFile, ConfigSource};
use super::platform::{PlatformError, PollPlatform};
use super::poll_models::{ChannelInfo, ChannelPermission, GuildInfo, MessageInfo};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// Fake Discord that records every write.
pub struct FakePlatform {
    guilds: DashSet<u64>,
    channels: DashMap<u64, ChannelInfo>,
    grants: DashMap<u64, Vec<ChannelPermission>>,
    messages: DashMap<u64, MessageInfo>,
    fail_permissions: AtomicBool,
    fail_deletes: AtomicBool,
    fail_sends: AtomicBool,
    deleted: Mutex<Vec<(u64, u64)>>,
    sent: Mutex<Vec<(u64, AuditEntry)>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            guilds: DashSet::new(),
            channels: DashMap::new(),
            grants: DashMap::new(),
            messages: DashMap::new(),
            fail_permissions: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
            deleted: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn add_guild(&self, guild_id: u64) {
        self.guilds.insert(guild_id);
    }

    pub fn add_channel(
        &self,
        guild_id: u64,
        channel_id: u64,
        name: &str,
        text_based: bool,
    ) -> ChannelInfo {
        let channel = ChannelInfo {
            id: channel_id,
            guild_id,
            name: name.to_string(),
            text_based,
        };
        self.channels.insert(channel_id, channel.clone());
        channel
    }

    pub fn add_text_channel(&self, guild_id: u64, channel_id: u64, name: &str) -> ChannelInfo {
        self.add_channel(guild_id, channel_id, name, true)
    }

    pub fn grant(&self, channel_id: u64, permissions: &[ChannelPermission]) {
        self.grants
            .entry(channel_id)
            .or_insert_with(Vec::new)
            .extend_from_slice(permissions);
    }

    pub fn add_message(&self, message: MessageInfo) {
        self.messages.insert(message.id, message);
    }

    pub fn fail_permission_lookups(&self) {
        self.fail_permissions.store(true, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    /// `(channel_id, message_id)` of every delete request.
    pub fn deleted(&self) -> Vec<(u64, u64)> {
        self.deleted.lock().unwrap().clone()
    }

    /// `(channel_id, entry)` of every audit entry sent.
    pub fn sent(&self) -> Vec<(u64, AuditEntry)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PollPlatform for FakePlatform {
    async fn fetch_guild(&self, guild_id: u64) -> Result<GuildInfo, PlatformError> {
        if !self.guilds.contains(&guild_id) {
            return Err(PlatformError::NotFound(format!("guild {}", guild_id)));
        }
        Ok(GuildInfo {
            id: guild_id,
            name: format!("Guild {}", guild_id),
        })
    }

    async fn fetch_channel(
        &self,
        guild_id: u64,
        channel_id: u64,
    ) -> Result<ChannelInfo, PlatformError> {
        self.channels
            .get(&channel_id)
            .map(|c| c.clone())
            .filter(|c| c.guild_id == guild_id)
            .ok_or_else(|| PlatformError::NotFound(format!("channel {}", channel_id)))
    }

    async fn permissions_in(
        &self,
        channel: &ChannelInfo,
    ) -> Result<Vec<ChannelPermission>, PlatformError> {
        if self.fail_permissions.load(Ordering::SeqCst) {
            return Err(PlatformError::Request("permissions unavailable".to_string()));
        }
        Ok(self
            .grants
            .get(&channel.id)
            .map(|g| g.clone())
            .unwrap_or_default())
    }

    async fn fetch_message(
        &self,
        channel: &ChannelInfo,
        message_id: u64,
    ) -> Result<MessageInfo, PlatformError> {
        self.messages
            .get(&message_id)
            .map(|m| m.clone())
            .filter(|m| m.channel_id == channel.id)
            .ok_or_else(|| PlatformError::NotFound(format!("message {}", message_id)))
    }

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), PlatformError> {
        self.deleted.lock().unwrap().push((channel_id, message_id));
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(PlatformError::Request("delete rejected".to_string()));
        }
        self.messages.remove(&message_id);
        Ok(())
    }

    async fn send_audit_entry(
        &self,
        channel_id: u64,
        entry: &AuditEntry,
    ) -> Result<(), PlatformError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(PlatformError::Request("send rejected".to_string()));
        }
        self.sent.lock().unwrap().push((channel_id, entry.clone()));
        Ok(())
    }
}

/// Config files held in memory, as `(guild_id, yaml)` pairs.
pub struct MemorySource {
    files: Vec<ConfigFile>,
}

impl MemorySource {
    pub fn new(files: Vec<(&str, &str)>) -> Self {
        Self {
            files: files
                .into_iter()
                .map(|(guild_id, contents)| ConfigFile {
                    guild_id: guild_id.to_string(),
                    contents: contents.to_string(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl ConfigSource for MemorySource {
    fn location(&self) -> String {
        "memory".to_string()
    }

    async fn load_files(&self) -> Result<Vec<ConfigFile>, ConfigError> {
        Ok(self.files.clone())
    }
}

/// Collects formatted `tracing` output for the current thread.
#[derive(Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Route every level to this capture until the guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .without_time()
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn lines(&self) -> Vec<String> {
        let buf = self.buf.lock().unwrap();
        String::from_utf8_lossy(&buf)
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
