use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// What to do when the Hacker News API can't be reached for one link.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NetworkErrorPolicy {
    /// Stop scanning the message; it is posted without a preview.
    #[default]
    AbortMessage,
    /// Log the failure and try the next link in the message.
    SkipLink,
}

impl std::fmt::Display for NetworkErrorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkErrorPolicy::AbortMessage => write!(f, "abort_message"),
            NetworkErrorPolicy::SkipLink => write!(f, "skip_link"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub mattermost: MattermostConfig,
    #[serde(default = "default_bot_config")]
    pub bot: BotConfig,
    #[serde(default = "default_hackernews_config")]
    pub hackernews: HackerNewsConfig,
    #[serde(default = "default_server_config")]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MattermostConfig {
    /// Base URL of the Mattermost server, e.g. "https://chat.example.com"
    pub url: String,
    /// Personal access token of an account allowed to manage bots
    pub token: String,
    #[serde(default = "default_plugin_id")]
    pub plugin_id: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BotConfig {
    #[serde(default = "default_bot_username")]
    pub username: String,
    #[serde(default = "default_bot_display_name")]
    pub display_name: String,
    #[serde(default = "default_bot_description")]
    pub description: String,
    /// Plugin bundle directory; the icon is read from `assets/hn.png` below it.
    #[serde(default = "default_bundle_path")]
    pub bundle_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HackerNewsConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Per-request timeout. Unset means requests may block indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub on_network_error: NetworkErrorPolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_plugin_id() -> String {
    "com.github.hnbot".to_string()
}

fn default_bot_username() -> String {
    "hackernewsbot".to_string()
}

fn default_bot_display_name() -> String {
    "Hacker News Bot".to_string()
}

fn default_bot_description() -> String {
    "The Hacker News Bot".to_string()
}

fn default_bundle_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_api_base_url() -> String {
    "https://hacker-news.firebaseio.com/v0".to_string()
}

fn default_bind() -> String {
    "127.0.0.1:8719".to_string()
}

fn default_bot_config() -> BotConfig {
    BotConfig {
        username: default_bot_username(),
        display_name: default_bot_display_name(),
        description: default_bot_description(),
        bundle_path: default_bundle_path(),
    }
}

fn default_hackernews_config() -> HackerNewsConfig {
    HackerNewsConfig {
        api_base_url: default_api_base_url(),
        timeout_secs: None,
        on_network_error: NetworkErrorPolicy::default(),
    }
}

fn default_server_config() -> ServerConfig {
    ServerConfig {
        bind: default_bind(),
    }
}

impl Config {
    /// Path the bot icon is served under, relative to the Mattermost root.
    pub fn icon_path(&self) -> String {
        format!("/plugins/{}/hn.png", self.mattermost.plugin_id)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn parse(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;

        let url = config.mattermost.url.trim_end_matches('/').to_string();
        if url.is_empty() {
            anyhow::bail!("[mattermost] url must not be empty");
        }
        config.mattermost.url = url;
        config.hackernews.api_base_url = config
            .hackernews
            .api_base_url
            .trim_end_matches('/')
            .to_string();

        Ok(config)
    }
}
