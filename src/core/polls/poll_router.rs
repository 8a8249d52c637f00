// Poll router - decides what happens to each gateway event.
//
// For every poll posted in a configured guild:
// 1. Resolve the guild config, the channel and the message
// 2. Check the bot may delete messages there
// 3. Skip members with an excluded role
// 4. Delete the poll and post an audit entry
//
// Each event is handled on its own; a failed lookup only ends that event.

use super::audit::AuditEntry;
use super::guild_config::GuildConfigStore;
use super::platform::PollPlatform;
use super::poll_models::{GatewayEvent, RawEvent, RemovalCandidate};
use super::policy::{can_act_in, is_immune};
use std::sync::Arc;

/// How handling one event ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Not a poll, or not a message creation at all.
    Ignored,
    /// The guild has no mounted config.
    Unconfigured,
    /// Channel vanished or cannot hold messages.
    ChannelUnavailable,
    /// The bot lacks "Manage Messages" in the channel.
    MissingPermission,
    /// Message vanished before we could fetch it.
    MessageUnavailable,
    /// The author holds an excluded role.
    Immune,
    /// Deletion was attempted and the audit entry dispatched.
    Removed { deleted: bool, logged: bool },
}

pub struct PollRouter<P: PollPlatform> {
    platform: P,
    configs: Arc<GuildConfigStore>,
}

impl<P: PollPlatform> PollRouter<P> {
    pub fn new(platform: P, configs: Arc<GuildConfigStore>) -> Self {
        Self { platform, configs }
    }

    #[cfg(test)]
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Handle one raw gateway event.
    pub async fn handle(&self, event: RawEvent) -> RouteOutcome {
        let candidate = match event.decode() {
            GatewayEvent::MessageCreate(payload) => match payload.into_candidate() {
                Some(candidate) => candidate,
                None => return RouteOutcome::Ignored,
            },
            GatewayEvent::Other(_) => return RouteOutcome::Ignored,
        };

        self.process(candidate).await
    }

    async fn process(&self, candidate: RemovalCandidate) -> RouteOutcome {
        let Some(policy) = self.configs.get(candidate.guild_id) else {
            tracing::warn!(guild_id = candidate.guild_id, "Config not found");
            return RouteOutcome::Unconfigured;
        };

        let channel = match self
            .platform
            .fetch_channel(candidate.guild_id, candidate.channel_id)
            .await
        {
            Ok(channel) if channel.text_based => channel,
            _ => return RouteOutcome::ChannelUnavailable,
        };

        let author = candidate.author_reference();

        if !can_act_in(&self.platform, &channel).await {
            tracing::warn!(
                "Ignoring poll from {}, sent in #{}. Missing the \"Manage Messages\" permission",
                author,
                channel.name
            );
            return RouteOutcome::MissingPermission;
        }

        let message = match self
            .platform
            .fetch_message(&channel, candidate.message_id)
            .await
        {
            Ok(message) => message,
            Err(_) => return RouteOutcome::MessageUnavailable,
        };

        if let Some(roles) = &message.member_roles {
            if is_immune(roles, policy) {
                tracing::debug!(
                    "Keeping poll from {}, sent in #{}. Author has an excluded role",
                    author,
                    channel.name
                );
                return RouteOutcome::Immune;
            }
        }

        // The fetched copy is authoritative; gateway copies may have been
        // through a lossy re-encode.
        let poll = message.poll.as_ref().unwrap_or(&candidate.poll);

        tracing::info!(
            guild_id = policy.guild_id,
            "Removing poll from {}, sent in #{}",
            author,
            channel.name
        );
        match serde_json::to_string_pretty(poll) {
            Ok(dump) => tracing::debug!("{}", dump),
            Err(e) => tracing::debug!("Failed to serialize poll: {}", e),
        }

        let deleted = match self
            .platform
            .delete_message(channel.id, message.id)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    "Failed to remove poll from {}, sent in #{}: {}",
                    author,
                    channel.name,
                    e
                );
                false
            }
        };

        // Logged even when the delete failed; the entry says so.
        let entry = AuditEntry::new(&message, &channel, poll, deleted);
        let logged = match self
            .platform
            .send_audit_entry(policy.logging_channel.id, &entry)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    logging_channel = policy.logging_channel.id,
                    "Failed to log removed poll from {} ({}): {}",
                    author,
                    message.author_name,
                    e
                );
                false
            }
        };

        RouteOutcome::Removed { deleted, logged }
    }
}
