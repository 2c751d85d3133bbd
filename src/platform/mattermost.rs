use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::{BotConfig, MattermostConfig};
use crate::platform::{BotSpec, HostApi};

#[derive(Debug, Deserialize)]
struct User {
    id: String,
    #[serde(default)]
    is_bot: bool,
}

#[derive(Debug, Deserialize)]
struct CreatedBot {
    user_id: String,
}

/// Mattermost REST (v4) implementation of the host calls.
pub struct MattermostClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    bundle_path: PathBuf,
}

impl MattermostClient {
    pub fn new(config: &MattermostConfig, bot: &BotConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            bundle_path: bot.bundle_path.clone(),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/v4{}", self.base_url, path)
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>> {
        let url = self.api_url(&format!("/users/username/{username}"));
        debug!("Looking up Mattermost user: {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("Failed to send request to Mattermost")?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Mattermost API error ({}): {}", status, error_body);
        }

        let user = response
            .json()
            .await
            .context("Failed to parse Mattermost user")?;
        Ok(Some(user))
    }

    async fn create_bot(&self, bot: &BotSpec) -> Result<String> {
        let response = self
            .client
            .post(self.api_url("/bots"))
            .bearer_auth(&self.token)
            .json(bot)
            .send()
            .await
            .context("Failed to send request to Mattermost")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to create bot ({}): {}", status, error_body);
        }

        let created: CreatedBot = response
            .json()
            .await
            .context("Failed to parse created bot")?;
        Ok(created.user_id)
    }
}

#[async_trait]
impl HostApi for MattermostClient {
    async fn ensure_bot(&self, bot: &BotSpec) -> Result<String> {
        if let Some(user) = self.find_user(&bot.username).await? {
            if !user.is_bot {
                anyhow::bail!(
                    "User '{}' already exists and is not a bot account",
                    bot.username
                );
            }
            info!("Using existing bot '{}' ({})", bot.username, user.id);
            return Ok(user.id);
        }

        let user_id = self.create_bot(bot).await?;
        info!("Created bot '{}' ({})", bot.username, user_id);
        Ok(user_id)
    }

    fn bundle_path(&self) -> Result<PathBuf> {
        Ok(self.bundle_path.clone())
    }

    async fn set_profile_image(&self, user_id: &str, image: &[u8]) -> Result<()> {
        let part = Part::bytes(image.to_vec())
            .file_name("hn.png")
            .mime_str("image/png")?;
        let form = Form::new().part("image", part);

        let response = self
            .client
            .post(self.api_url(&format!("/users/{user_id}/image")))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await
            .context("Failed to send request to Mattermost")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to set profile image ({}): {}", status, error_body);
        }

        Ok(())
    }
}
