// Core poll moderation module - guild configs, policy checks and the router.
// Same layout as the other core features: models, a port trait, services.

pub mod audit;
pub mod guild_config;
pub mod platform;
pub mod policy;
pub mod poll_models;
pub mod poll_router;

#[cfg(test)]
pub mod test_support;

pub use audit::AuditEntry;
pub use guild_config::{ConfigError, ConfigFile, ConfigSource, GuildConfigStore};
pub use platform::{PlatformError, PollPlatform};
pub use poll_models::*;
pub use poll_router::PollRouter;
