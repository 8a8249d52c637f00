// Poll moderation domain models.
//
// Pure data types with no Discord dependencies. The Discord layer serializes
// gateway payloads into `RawEvent` and converts lookups into `ChannelInfo`
// and `MessageInfo`; everything in core only ever sees these.

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Gateway event name for a newly created message.
pub const MESSAGE_CREATE: &str = "MESSAGE_CREATE";

// ============================================================================
// SNOWFLAKES
// ============================================================================

/// A Discord snowflake that accepts both JSON/YAML numbers and strings.
///
/// Discord sends IDs as strings, but people write them as bare integers in
/// YAML config files, so we take either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Snowflake(pub u64);

impl Snowflake {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Snowflake> for u64 {
    fn from(id: Snowflake) -> Self {
        id.0
    }
}

impl Serialize for Snowflake {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Int(u64),
            Str(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Int(id) => Ok(Snowflake(id)),
            Repr::Str(s) => s
                .trim()
                .parse()
                .map(Snowflake)
                .map_err(|_| de::Error::custom(format!("invalid snowflake `{}`", s))),
        }
    }
}

// ============================================================================
// POLL PAYLOAD
// ============================================================================

/// Emoji attached to a poll answer.
///
/// Built-in emoji only carry a `name`; custom emoji also carry an `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollEmoji {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animated: Option<bool>,
}

impl PollEmoji {
    pub fn is_animated(&self) -> bool {
        self.animated.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollMedia {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<PollEmoji>,
}

impl PollMedia {
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollAnswer {
    pub answer_id: Snowflake,
    pub poll_media: PollMedia,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    pub question: PollMedia,
    #[serde(default)]
    pub answers: Vec<PollAnswer>,
}

// ============================================================================
// RAW EVENT FEED
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Author {
    pub id: Snowflake,
    #[serde(default)]
    pub username: String,
}

/// The part of a message object we care about, either from a
/// `MESSAGE_CREATE` dispatch or a REST fetch.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageCreatePayload {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub author: Author,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub poll: Option<Poll>,
}

impl MessageCreatePayload {
    /// Guild messages carrying a poll become removal candidates; DMs and
    /// plain messages do not.
    pub fn into_candidate(self) -> Option<RemovalCandidate> {
        let poll = self.poll?;
        let guild_id = self.guild_id?;

        Some(RemovalCandidate {
            guild_id: guild_id.get(),
            channel_id: self.channel_id.get(),
            message_id: self.id.get(),
            author: self.author,
            poll,
        })
    }

    /// Snapshot of a fetched message. `member_roles` comes from a separate
    /// member lookup since message objects don't carry it.
    pub fn into_message_info(self, member_roles: Option<Vec<u64>>) -> MessageInfo {
        MessageInfo {
            id: self.id.get(),
            channel_id: self.channel_id.get(),
            author_id: self.author.id.get(),
            author_name: self.author.username,
            member_roles,
            created_at: self.timestamp.unwrap_or_else(Utc::now),
            poll: self.poll,
        }
    }
}

/// An undecoded gateway dispatch: the event name plus its JSON body.
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub kind: String,
    pub data: serde_json::Value,
}

/// Decoded gateway dispatch. Only message creation is interesting to us;
/// everything else is carried as its name and ignored.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    MessageCreate(Box<MessageCreatePayload>),
    Other(String),
}

impl RawEvent {
    pub fn new(kind: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    pub fn decode(self) -> GatewayEvent {
        if self.kind != MESSAGE_CREATE {
            return GatewayEvent::Other(self.kind);
        }

        match serde_json::from_value::<MessageCreatePayload>(self.data) {
            Ok(payload) => GatewayEvent::MessageCreate(Box::new(payload)),
            Err(e) => {
                tracing::debug!("Ignoring undecodable {} payload: {}", self.kind, e);
                GatewayEvent::Other(self.kind)
            }
        }
    }
}

/// A poll message that may need to be removed. Lives for one event.
#[derive(Debug, Clone)]
pub struct RemovalCandidate {
    pub guild_id: u64,
    pub channel_id: u64,
    pub message_id: u64,
    pub author: Author,
    pub poll: Poll,
}

impl RemovalCandidate {
    /// `@name (id)`, used in operator-facing diagnostics.
    pub fn author_reference(&self) -> String {
        format!("@{} ({})", self.author.username, self.author.id)
    }
}

// ============================================================================
// PLATFORM LOOKUPS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildInfo {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: u64,
    pub guild_id: u64,
    pub name: String,
    /// Whether messages can be sent to the channel.
    pub text_based: bool,
}

/// Snapshot of a fetched message.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageInfo {
    pub id: u64,
    pub channel_id: u64,
    pub author_id: u64,
    pub author_name: String,
    /// Role IDs of the author, `None` when the member could not be resolved.
    pub member_roles: Option<Vec<u64>>,
    pub created_at: DateTime<Utc>,
    /// The poll exactly as the API returned it.
    pub poll: Option<Poll>,
}

/// The channel permissions this bot cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelPermission {
    SendMessages,
    EmbedLinks,
    ManageMessages,
}

impl fmt::Display for ChannelPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelPermission::SendMessages => write!(f, "SendMessages"),
            ChannelPermission::EmbedLinks => write!(f, "EmbedLinks"),
            ChannelPermission::ManageMessages => write!(f, "ManageMessages"),
        }
    }
}
