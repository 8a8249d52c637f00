// This is the entry point of the poll sweeper bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (config files)
// - `discord/` = Discord-specific adapters (serenity client, events)
//
// This file's job is to:
// 1. Load configuration
// 2. Mount and validate every guild config (fatal on any error)
// 3. Set up the Discord framework
// 4. Route gateway events to the poll router

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::polls::{GuildConfigStore, PollRouter};
use crate::discord::polls::events as poll_events;
use crate::discord::polls::SerenityPlatform;
use crate::discord::{Data, Error};
use crate::infra::polls::ConfigDirectory;
use anyhow::{Context as _, Result};
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_DIR: &str = "configs";

/// Event handler for non-command Discord events.
async fn event_handler(
    _ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            tracing::info!(
                "Logged in as {} ({})",
                data_about_bot.user.name,
                data_about_bot.user.id
            );
        }
        serenity::FullEvent::Message { new_message } => {
            poll_events::handle_message_create(data, new_message);
        }
        _ => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = run().await {
        tracing::error!("{:#}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let token = std::env::var("DISCORD_TOKEN")
        .map_err(|_| anyhow::anyhow!("Missing DISCORD_TOKEN environment variable"))?;
    let config_dir =
        std::env::var("POLL_CONFIG_DIR").unwrap_or_else(|_| DEFAULT_CONFIG_DIR.to_string());

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Guild configs are validated over plain HTTP before the gateway connects,
    // so no event is ever handled with a half-mounted config.

    let http = Arc::new(serenity::Http::new(&token));
    let platform = SerenityPlatform::new(Arc::clone(&http));

    let source = ConfigDirectory::new(&config_dir);
    let configs = Arc::new(GuildConfigStore::mount(&source, &platform).await?);
    tracing::info!(guilds = configs.guild_count(), "Mounted guild configs from `{}`", config_dir);

    let data = Data {
        polls: Arc::new(PollRouter::new(platform, configs)),
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT; // Poll payloads ride on message content

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(|_ctx, _ready, _framework| Box::pin(async move { Ok(data) }))
        .build();

    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await
        .context("Error creating client")?;

    client.start().await.context("Error running bot")?;
    Ok(())
}
