use anyhow::{Context, Result};
use tracing::{error, info};

use crate::platform::{BotSpec, HostApi};

/// Result of provisioning the bot at startup.
#[derive(Debug, Clone)]
pub struct Activation {
    pub bot_user_id: String,
    pub profile_image: Vec<u8>,
}

/// Ensure the bot account exists and brand it with the packaged icon.
pub async fn activate(host: &dyn HostApi, bot: &BotSpec) -> Result<Activation> {
    let bot_user_id = host
        .ensure_bot(bot)
        .await
        .with_context(|| format!("Failed to ensure bot '{}'", bot.username))?;

    let image_path = host.bundle_path()?.join("assets").join("hn.png");
    let profile_image = match tokio::fs::read(&image_path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(
                "Couldn't read profile image {}: {}",
                image_path.display(),
                e
            );
            return Err(e).with_context(|| {
                format!("Failed to read profile image: {}", image_path.display())
            });
        }
    };

    host.set_profile_image(&bot_user_id, &profile_image)
        .await
        .context("Failed to set bot profile image")?;

    info!(
        "Bot '{}' ({}) activated with {} byte profile image",
        bot.username,
        bot_user_id,
        profile_image.len()
    );

    Ok(Activation {
        bot_user_id,
        profile_image,
    })
}
