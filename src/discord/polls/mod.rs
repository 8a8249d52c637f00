// Discord side of poll moderation: the serenity adapter, the audit embed and
// the gateway event glue.

pub mod events;
pub mod formatter;
pub mod serenity_platform;

pub use serenity_platform::SerenityPlatform;
