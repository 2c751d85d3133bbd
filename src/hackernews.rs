use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::HackerNewsConfig;

/// The subset of a Hacker News item used to build a preview.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct RemoteItem {
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

impl RemoteItem {
    pub fn is_story(&self) -> bool {
        self.item_type == "story"
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to Hacker News failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("failed to read Hacker News response body: {0}")]
    Body(#[source] reqwest::Error),

    #[error("response from Hacker News was empty")]
    EmptyResponse,

    #[error("failed to decode Hacker News item: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    /// The request never got an answer. A reply that breaks off while its
    /// body is read counts as unreadable, like a body that fails to decode.
    pub fn is_network(&self) -> bool {
        matches!(self, FetchError::Network(_))
    }
}

/// Anything that can look up a Hacker News item by id.
#[async_trait]
pub trait ItemSource: Send + Sync {
    async fn fetch_item(&self, id: &str) -> Result<RemoteItem, FetchError>;
}

/// Decode a raw item response body.
pub fn decode_item(body: &[u8]) -> Result<RemoteItem, FetchError> {
    if body.is_empty() {
        return Err(FetchError::EmptyResponse);
    }
    Ok(serde_json::from_slice(body)?)
}

/// Client for the public Hacker News Firebase API.
pub struct HackerNewsClient {
    client: reqwest::Client,
    base_url: String,
}

impl HackerNewsClient {
    pub fn new(config: &HackerNewsConfig) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            client: builder.build()?,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn item_url(&self, id: &str) -> String {
        format!("{}/item/{}.json", self.base_url, id)
    }
}

#[async_trait]
impl ItemSource for HackerNewsClient {
    async fn fetch_item(&self, id: &str) -> Result<RemoteItem, FetchError> {
        let url = self.item_url(id);
        debug!("Fetching Hacker News item: {}", url);

        // Status is not checked; error bodies fail to decode instead.
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.bytes().await.map_err(FetchError::Body)?;
        debug!("Hacker News item {} answered {} ({} bytes)", id, status, body.len());

        decode_item(&body)
    }
}
