// Serenity-backed implementation of the poll platform port.
//
// Everything goes through the HTTP client rather than the gateway cache:
// config mounting runs before the gateway connects, and permission checks
// must reflect the live state of the guild.

use crate::core::polls::{
    AuditEntry, ChannelInfo, ChannelPermission, GuildInfo, MessageCreatePayload, MessageInfo,
    PlatformError, PollPlatform,
};
use crate::discord::polls::formatter::format_audit_entry;
use ::serenity::http::{LightMethod, Request, Route};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

pub struct SerenityPlatform {
    http: Arc<serenity::Http>,
}

impl SerenityPlatform {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }

    async fn guild_channel(&self, channel_id: u64) -> Result<serenity::GuildChannel, PlatformError> {
        self.http
            .get_channel(serenity::ChannelId::new(channel_id))
            .await
            .map_err(request_failed)?
            .guild()
            .ok_or_else(|| PlatformError::NotFound(format!("guild channel {}", channel_id)))
    }
}

fn request_failed(err: serenity::Error) -> PlatformError {
    PlatformError::Request(err.to_string())
}

/// Channel types that can hold regular messages.
fn is_text_based(kind: serenity::ChannelType) -> bool {
    matches!(
        kind,
        serenity::ChannelType::Text
            | serenity::ChannelType::News
            | serenity::ChannelType::Voice
            | serenity::ChannelType::Stage
            | serenity::ChannelType::NewsThread
            | serenity::ChannelType::PublicThread
            | serenity::ChannelType::PrivateThread
    )
}

/// Threads have no overwrites of their own; they inherit the parent's.
fn permission_source(
    kind: serenity::ChannelType,
    id: serenity::ChannelId,
    parent_id: Option<serenity::ChannelId>,
) -> serenity::ChannelId {
    let is_thread = matches!(
        kind,
        serenity::ChannelType::NewsThread
            | serenity::ChannelType::PublicThread
            | serenity::ChannelType::PrivateThread
    );

    match parent_id {
        Some(parent) if is_thread => parent,
        _ => id,
    }
}

/// Decode a raw message object from the API.
///
/// Serenity's own `Message` drops custom emoji ids from poll answers, so the
/// poll is read straight from the JSON.
fn decode_message(
    raw: serde_json::Value,
    member_roles: Option<Vec<u64>>,
) -> Result<MessageInfo, PlatformError> {
    let payload: MessageCreatePayload = serde_json::from_value(raw)
        .map_err(|e| PlatformError::Request(format!("undecodable message: {}", e)))?;
    Ok(payload.into_message_info(member_roles))
}

fn held_permissions(permissions: serenity::Permissions) -> Vec<ChannelPermission> {
    [
        (serenity::Permissions::SEND_MESSAGES, ChannelPermission::SendMessages),
        (serenity::Permissions::EMBED_LINKS, ChannelPermission::EmbedLinks),
        (serenity::Permissions::MANAGE_MESSAGES, ChannelPermission::ManageMessages),
    ]
    .into_iter()
    .filter(|(flag, _)| permissions.contains(*flag))
    .map(|(_, permission)| permission)
    .collect()
}

#[async_trait]
impl PollPlatform for SerenityPlatform {
    async fn fetch_guild(&self, guild_id: u64) -> Result<GuildInfo, PlatformError> {
        let guild = self
            .http
            .get_guild(serenity::GuildId::new(guild_id))
            .await
            .map_err(request_failed)?;

        Ok(GuildInfo {
            id: guild.id.get(),
            name: guild.name,
        })
    }

    async fn fetch_channel(
        &self,
        guild_id: u64,
        channel_id: u64,
    ) -> Result<ChannelInfo, PlatformError> {
        let channel = self.guild_channel(channel_id).await?;
        if channel.guild_id.get() != guild_id {
            return Err(PlatformError::NotFound(format!(
                "channel {} in guild {}",
                channel_id, guild_id
            )));
        }

        Ok(ChannelInfo {
            id: channel.id.get(),
            guild_id,
            name: channel.name.clone(),
            text_based: is_text_based(channel.kind),
        })
    }

    async fn permissions_in(
        &self,
        channel: &ChannelInfo,
    ) -> Result<Vec<ChannelPermission>, PlatformError> {
        let guild_id = serenity::GuildId::new(channel.guild_id);

        let guild = self.http.get_guild(guild_id).await.map_err(request_failed)?;
        let mut guild_channel = self.guild_channel(channel.id).await?;
        let source = permission_source(
            guild_channel.kind,
            guild_channel.id,
            guild_channel.parent_id,
        );
        if source != guild_channel.id {
            guild_channel = self.guild_channel(source.get()).await?;
        }
        let me = self.http.get_current_user().await.map_err(request_failed)?;
        let member = self
            .http
            .get_member(guild_id, me.id)
            .await
            .map_err(request_failed)?;

        Ok(held_permissions(
            guild.user_permissions_in(&guild_channel, &member),
        ))
    }

    async fn fetch_message(
        &self,
        channel: &ChannelInfo,
        message_id: u64,
    ) -> Result<MessageInfo, PlatformError> {
        let raw: serde_json::Value = self
            .http
            .fire(Request::new(
                Route::ChannelMessage {
                    channel_id: serenity::ChannelId::new(channel.id),
                    message_id: serenity::MessageId::new(message_id),
                },
                LightMethod::Get,
            ))
            .await
            .map_err(request_failed)?;

        let author_id = raw
            .pointer("/author/id")
            .and_then(|id| id.as_str())
            .and_then(|id| id.parse::<u64>().ok())
            .ok_or_else(|| {
                PlatformError::Request(format!("message {} has no author", message_id))
            })?;

        // Fetched messages don't carry the member, so look it up separately.
        let member_roles = self
            .http
            .get_member(
                serenity::GuildId::new(channel.guild_id),
                serenity::UserId::new(author_id),
            )
            .await
            .ok()
            .map(|member| member.roles.iter().map(|role| role.get()).collect());

        decode_message(raw, member_roles)
    }

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), PlatformError> {
        serenity::ChannelId::new(channel_id)
            .delete_message(&self.http, serenity::MessageId::new(message_id))
            .await
            .map_err(request_failed)
    }

    async fn send_audit_entry(
        &self,
        channel_id: u64,
        entry: &AuditEntry,
    ) -> Result<(), PlatformError> {
        let embed = format_audit_entry(entry);

        serenity::ChannelId::new(channel_id)
            .send_message(&self.http, serenity::CreateMessage::new().embed(embed))
            .await
            .map_err(request_failed)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::polls::audit::format_answer;

    #[test]
    fn test_held_permissions_maps_flags() {
        let held = held_permissions(
            serenity::Permissions::SEND_MESSAGES | serenity::Permissions::MANAGE_MESSAGES,
        );
        assert_eq!(
            held,
            vec![
                ChannelPermission::SendMessages,
                ChannelPermission::ManageMessages
            ]
        );
        assert!(held_permissions(serenity::Permissions::empty()).is_empty());
    }

    #[test]
    fn test_thread_permissions_come_from_parent() {
        let thread = serenity::ChannelId::new(10);
        let parent = serenity::ChannelId::new(20);

        for kind in [
            serenity::ChannelType::PublicThread,
            serenity::ChannelType::PrivateThread,
            serenity::ChannelType::NewsThread,
        ] {
            assert_eq!(permission_source(kind, thread, Some(parent)), parent);
        }

        // A regular channel's parent is its category, which doesn't apply.
        assert_eq!(
            permission_source(serenity::ChannelType::Text, thread, Some(parent)),
            thread
        );
        assert_eq!(
            permission_source(serenity::ChannelType::PublicThread, thread, None),
            thread
        );
    }

    #[test]
    fn test_fetched_message_keeps_animated_custom_emoji() {
        let raw = serde_json::json!({
            "id": "300",
            "channel_id": "200",
            "author": { "id": "42", "username": "pollster", "discriminator": "0" },
            "content": "",
            "timestamp": "2024-05-01T12:00:00.000000+00:00",
            "edited_timestamp": null,
            "tts": false,
            "pinned": false,
            "type": 0,
            "poll": {
                "question": { "text": "Best crab?" },
                "answers": [
                    {
                        "answer_id": 1,
                        "poll_media": {
                            "text": "Hermit",
                            "emoji": { "id": "555", "name": "party", "animated": true }
                        }
                    }
                ],
                "expiry": "2024-05-02T12:00:00.000000+00:00",
                "allow_multiselect": false,
                "layout_type": 1
            }
        });

        let message = decode_message(raw, None).unwrap();
        let poll = message.poll.unwrap();

        assert_eq!(message.author_id, 42);
        assert_eq!(
            format_answer(&poll.answers[0]),
            "1. [`party`](https://cdn.discordapp.com/emojis/555.gif) Hermit"
        );
    }

    #[test]
    fn test_text_based_channel_types() {
        assert!(is_text_based(serenity::ChannelType::Text));
        assert!(is_text_based(serenity::ChannelType::PublicThread));
        assert!(!is_text_based(serenity::ChannelType::Category));
        assert!(!is_text_based(serenity::ChannelType::Forum));
    }
}
