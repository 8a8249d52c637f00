use crate::core::polls::AuditEntry;
use poise::serenity_prelude::{self as serenity, CreateEmbed, CreateEmbedAuthor};

pub fn format_audit_entry(entry: &AuditEntry) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .author(CreateEmbedAuthor::new("Poll Deleted"))
        .description(&entry.answers)
        .color(serenity::Color::RED)
        .field("Question", &entry.question, false)
        .field("Author", &entry.author, false)
        .field("Channel", &entry.channel, false)
        .field("Posted", &entry.posted, false)
        .timestamp(serenity::Timestamp::now());

    if !entry.deleted {
        embed = embed.field(
            "Removal",
            "⚠️ Deleting the message failed, the poll may still be visible",
            false,
        );
    }
    embed
}
