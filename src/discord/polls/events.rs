// Gateway glue for poll moderation.
//
// Serenity hands us decoded messages; poll messages are turned back into the
// raw `MESSAGE_CREATE` shape the core router understands and handled each in
// its own task. The re-encoded poll is lossy, so the router re-fetches the
// message before logging it.

use crate::core::polls::{RawEvent, MESSAGE_CREATE};
use crate::discord::Data;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Re-encode a created message as a raw gateway event.
pub fn raw_message_create(message: &serenity::Message) -> Option<RawEvent> {
    match serde_json::to_value(message) {
        Ok(data) => Some(RawEvent::new(MESSAGE_CREATE, data)),
        Err(e) => {
            tracing::warn!(message_id = message.id.get(), "Failed to encode message: {}", e);
            None
        }
    }
}

/// Route a newly created guild message without blocking the event loop.
pub fn handle_message_create(data: &Data, message: &serenity::Message) {
    // Polls only matter in guilds
    if message.guild_id.is_none() || message.poll.is_none() {
        return;
    }

    let Some(event) = raw_message_create(message) else {
        return;
    };

    let router = Arc::clone(&data.polls);
    tokio::spawn(async move {
        let outcome = router.handle(event).await;
        tracing::trace!(?outcome, "Handled message");
    });
}
