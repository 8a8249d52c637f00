// Audit entries for removed polls.
//
// Builds the text of the log entry here so the Discord formatter only has to
// place strings into an embed. Limits mirror Discord's embed limits.

use super::poll_models::{ChannelInfo, MessageInfo, Poll, PollAnswer, PollEmoji};

/// Maximum length of an embed field value.
pub const FIELD_LIMIT: usize = 1024;
/// Maximum length of an embed description.
pub const DESCRIPTION_LIMIT: usize = 4096;

const ELLIPSIS: &str = "...";
const EMOJI_CDN: &str = "https://cdn.discordapp.com/emojis";

/// Everything the logging channel gets told about one removal.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    /// `**Answers**:` header plus one line per answer
    pub answers: String,
    pub question: String,
    pub author: String,
    pub channel: String,
    /// Discord timestamp markup, rendered in the viewer's locale
    pub posted: String,
    /// False when the delete request failed but we logged anyway.
    pub deleted: bool,
}

impl AuditEntry {
    pub fn new(message: &MessageInfo, channel: &ChannelInfo, poll: &Poll, deleted: bool) -> Self {
        let answers = poll
            .answers
            .iter()
            .map(format_answer)
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            answers: crop(&format!("**Answers**:\n\n{}", answers), DESCRIPTION_LIMIT),
            question: crop(poll.question.text(), FIELD_LIMIT),
            author: format!("<@{}> (`{}`)", message.author_id, message.author_id),
            channel: format!("<#{}> (`#{}`)", channel.id, channel.name),
            // `f` is Discord's short date/time style
            posted: format!("<t:{}:f>", message.created_at.timestamp()),
            deleted,
        }
    }
}

/// Crop `text` to at most `limit` characters, ending in an ellipsis when cut.
pub fn crop(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }

    let keep = limit.saturating_sub(ELLIPSIS.len());
    let mut cropped: String = text.chars().take(keep).collect();
    cropped.push_str(ELLIPSIS);
    cropped
}

/// `1. Ferris` or, with an emoji, ``2. `crab` Ferris``.
pub fn format_answer(answer: &PollAnswer) -> String {
    match &answer.poll_media.emoji {
        Some(emoji) => format!(
            "{}. {} {}",
            answer.answer_id,
            format_emoji(emoji),
            answer.poll_media.text()
        ),
        None => format!("{}. {}", answer.answer_id, answer.poll_media.text()),
    }
}

/// The emoji name as inline code, linked to its image for custom emoji.
pub fn format_emoji(emoji: &PollEmoji) -> String {
    let name = format!("`{}`", emoji.name.as_deref().unwrap_or_default());

    match emoji.id {
        Some(id) => {
            let extension = if emoji.is_animated() { "gif" } else { "webp" };
            format!("[{}]({}/{}.{})", name, EMOJI_CDN, id, extension)
        }
        None => name,
    }
}
