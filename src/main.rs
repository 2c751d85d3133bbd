mod activation;
mod config;
mod hackernews;
mod links;
mod platform;
mod preview;
mod server;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::hackernews::HackerNewsClient;
use crate::platform::mattermost::MattermostClient;
use crate::platform::BotSpec;
use crate::preview::Previewer;
use crate::server::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,hnbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Mattermost: {}", config.mattermost.url);
    info!("  Plugin id: {}", config.mattermost.plugin_id);
    info!("  Hacker News API: {}", config.hackernews.api_base_url);
    info!("  On network error: {}", config.hackernews.on_network_error);

    // Provision the bot identity
    let host = MattermostClient::new(&config.mattermost, &config.bot);
    let bot = BotSpec {
        username: config.bot.username.clone(),
        display_name: config.bot.display_name.clone(),
        description: config.bot.description.clone(),
    };
    let activation = activation::activate(&host, &bot).await?;

    let source = HackerNewsClient::new(&config.hackernews)
        .context("Failed to build Hacker News client")?;
    let previewer = Previewer::new(
        Arc::new(source),
        activation.bot_user_id,
        config.icon_path(),
        config.hackernews.on_network_error,
    );

    let state = Arc::new(AppState {
        previewer,
        profile_image: Some(activation.profile_image.into()),
    });

    info!("Bot is starting...");
    server::run(state, &config.mattermost.plugin_id, &config.server.bind).await?;

    Ok(())
}
