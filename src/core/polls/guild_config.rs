// Per-guild poll moderation configuration.
//
// One YAML document per guild, loaded once at startup:
//
//     logging_channel: 123456789012345678
//     excluded_roles:
//       - 234567890123456789
//
// Every file is validated against Discord before the bot handles a single
// event. Any invalid file aborts the whole mount.

use super::platform::PollPlatform;
use super::poll_models::{ChannelInfo, ChannelPermission, Snowflake};
use async_trait::async_trait;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Permissions the bot needs in a logging channel.
const REQUIRED_LOG_PERMISSIONS: [ChannelPermission; 2] =
    [ChannelPermission::SendMessages, ChannelPermission::EmbedLinks];

// ============================================================================
// ERRORS
// ============================================================================

/// Why a single guild's config file was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidConfig {
    #[error("file name is not a guild ID")]
    BadGuildId,

    #[error("invalid YAML content ({0})")]
    InvalidYaml(String),

    #[error("missing logging_channel field")]
    MissingLoggingChannel,

    #[error("excluded_roles is specified but is empty")]
    EmptyExcludedRoles,

    #[error("guild not found")]
    GuildNotFound,

    #[error("logging channel with ID {0} not found")]
    ChannelNotFound(u64),

    #[error("logging channel with ID {0} is not a text channel")]
    NotTextChannel(u64),

    #[error("missing permissions in logging channel: {0}")]
    MissingPermissions(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No config files found in the `{0}` directory")]
    NoConfigFiles(String),

    #[error("[GUILD: {guild_id}] Failed to mount config file, {reason}")]
    Invalid {
        guild_id: String,
        reason: InvalidConfig,
    },
}

// ============================================================================
// SOURCE TRAIT (PORT)
// ============================================================================

/// One config file as found on disk, not yet parsed.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    /// File name up to the first `.`
    pub guild_id: String,
    pub contents: String,
}

/// Where config files come from. The infra layer reads a directory.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Human-readable location, used in diagnostics.
    fn location(&self) -> String;

    /// All eligible config files; templates are already filtered out.
    async fn load_files(&self) -> Result<Vec<ConfigFile>, ConfigError>;
}

// ============================================================================
// MODELS
// ============================================================================

/// A config file exactly as written.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGuildConfig {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub logging_channel: Option<Snowflake>,
    #[serde(default)]
    pub excluded_roles: Option<Vec<Snowflake>>,
}

impl RawGuildConfig {
    pub fn parse(contents: &str) -> Result<Self, InvalidConfig> {
        let raw: Option<RawGuildConfig> =
            serde_yaml::from_str(contents).map_err(|e| InvalidConfig::InvalidYaml(e.to_string()))?;
        raw.ok_or_else(|| InvalidConfig::InvalidYaml("empty document".to_string()))
    }
}

/// A blank value counts as an absent one.
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<Snowflake>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_yaml::Value>::deserialize(deserializer)? {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(serde_yaml::Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(value) => Snowflake::deserialize(value)
            .map(Some)
            .map_err(de::Error::custom),
    }
}

/// A validated guild configuration.
#[derive(Debug, Clone)]
pub struct GuildPolicy {
    pub guild_id: u64,
    pub guild_name: String,
    /// Where removed polls are logged. Checked for send and embed
    /// permissions at mount time only.
    pub logging_channel: ChannelInfo,
    /// Members holding any of these roles may post polls.
    pub excluded_roles: HashSet<u64>,
}

// ============================================================================
// STORE
// ============================================================================

/// Guild ID -> policy, built once by `mount` and read-only afterwards.
#[derive(Debug, Default)]
pub struct GuildConfigStore {
    policies: HashMap<u64, GuildPolicy>,
}

impl GuildConfigStore {
    /// Load and validate every config file from `source`.
    pub async fn mount<S, P>(source: &S, platform: &P) -> Result<Self, ConfigError>
    where
        S: ConfigSource + ?Sized,
        P: PollPlatform + ?Sized,
    {
        let files = source.load_files().await?;
        if files.is_empty() {
            return Err(ConfigError::NoConfigFiles(source.location()));
        }

        let mut policies = HashMap::with_capacity(files.len());
        for file in files {
            let policy = sanitize(platform, &file)
                .await
                .map_err(|reason| ConfigError::Invalid {
                    guild_id: file.guild_id.clone(),
                    reason,
                })?;

            tracing::debug!(
                guild_id = policy.guild_id,
                guild = %policy.guild_name,
                logging_channel = policy.logging_channel.id,
                excluded_roles = policy.excluded_roles.len(),
                "Mounted guild config"
            );
            policies.insert(policy.guild_id, policy);
        }

        Ok(Self { policies })
    }

    /// Build a store from already validated policies.
    #[cfg(test)]
    pub fn from_policies(policies: impl IntoIterator<Item = GuildPolicy>) -> Self {
        Self {
            policies: policies.into_iter().map(|p| (p.guild_id, p)).collect(),
        }
    }

    pub fn get(&self, guild_id: u64) -> Option<&GuildPolicy> {
        self.policies.get(&guild_id)
    }

    pub fn guild_count(&self) -> usize {
        self.policies.len()
    }
}

/// Validate one file against the platform.
async fn sanitize<P>(platform: &P, file: &ConfigFile) -> Result<GuildPolicy, InvalidConfig>
where
    P: PollPlatform + ?Sized,
{
    let guild_id: u64 = file
        .guild_id
        .parse()
        .map_err(|_| InvalidConfig::BadGuildId)?;

    let guild = platform
        .fetch_guild(guild_id)
        .await
        .map_err(|_| InvalidConfig::GuildNotFound)?;

    let raw = RawGuildConfig::parse(&file.contents)?;

    let channel_id = raw
        .logging_channel
        .ok_or(InvalidConfig::MissingLoggingChannel)?
        .get();

    if matches!(&raw.excluded_roles, Some(roles) if roles.is_empty()) {
        return Err(InvalidConfig::EmptyExcludedRoles);
    }

    let logging_channel = platform
        .fetch_channel(guild.id, channel_id)
        .await
        .map_err(|_| InvalidConfig::ChannelNotFound(channel_id))?;

    if !logging_channel.text_based {
        return Err(InvalidConfig::NotTextChannel(channel_id));
    }

    // An unreadable permission set counts as missing everything.
    let held = platform
        .permissions_in(&logging_channel)
        .await
        .unwrap_or_default();

    let missing = REQUIRED_LOG_PERMISSIONS
        .iter()
        .filter(|p| !held.contains(*p))
        .map(|p| p.to_string())
        .collect::<Vec<_>>();

    if !missing.is_empty() {
        return Err(InvalidConfig::MissingPermissions(missing.join(", ")));
    }

    Ok(GuildPolicy {
        guild_id: guild.id,
        guild_name: guild.name,
        logging_channel,
        excluded_roles: raw
            .excluded_roles
            .unwrap_or_default()
            .into_iter()
            .map(Snowflake::get)
            .collect(),
    })
}
