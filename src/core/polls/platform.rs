// The port the poll moderation core uses to talk to the chat platform.
//
// The Discord layer implements this on top of serenity's HTTP client; tests
// use an in-memory fake. Every method is a single request so callers can
// decide per call whether a failure is fatal (config mount) or simply ends
// the current event (router).

use super::audit::AuditEntry;
use super::poll_models::{ChannelInfo, ChannelPermission, GuildInfo, MessageInfo};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request failed: {0}")]
    Request(String),
}

#[async_trait]
pub trait PollPlatform: Send + Sync {
    async fn fetch_guild(&self, guild_id: u64) -> Result<GuildInfo, PlatformError>;

    /// Resolve a channel that must belong to `guild_id`.
    async fn fetch_channel(
        &self,
        guild_id: u64,
        channel_id: u64,
    ) -> Result<ChannelInfo, PlatformError>;

    /// The bot's own permissions in `channel`, evaluated now.
    async fn permissions_in(
        &self,
        channel: &ChannelInfo,
    ) -> Result<Vec<ChannelPermission>, PlatformError>;

    async fn fetch_message(
        &self,
        channel: &ChannelInfo,
        message_id: u64,
    ) -> Result<MessageInfo, PlatformError>;

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), PlatformError>;

    /// Post an audit entry as a rich message in `channel_id`.
    async fn send_audit_entry(
        &self,
        channel_id: u64,
        entry: &AuditEntry,
    ) -> Result<(), PlatformError>;
}
