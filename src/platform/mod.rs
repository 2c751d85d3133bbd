pub mod mattermost;

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// A post as handed over by the host just before it is stored.
///
/// Only the fields the hook reads are typed; everything else the host sends
/// is kept in `extra` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub props: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Post {
    /// Attachments currently on the post, in display order.
    pub fn attachments(&self) -> Vec<Value> {
        match self.props.get("attachments") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        }
    }

    /// Append an attachment after any the post already carries.
    pub fn add_attachment(&mut self, attachment: Attachment) {
        let mut attachments = self.attachments();
        attachments.push(attachment.into_value());
        self.props
            .insert("attachments".to_string(), Value::Array(attachments));
    }
}

/// Preview card rendered under a post (Mattermost "slack attachment" fields).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub author_icon: String,
    pub author_name: String,
    pub author_link: String,
}

impl Attachment {
    fn into_value(self) -> Value {
        json!({
            "author_icon": self.author_icon,
            "author_name": self.author_name,
            "author_link": self.author_link,
        })
    }
}

/// Per-call metadata the host sends along with a hook invocation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginContext {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub accept_language: String,
    #[serde(default)]
    pub user_agent: String,
}

/// The bot account the service posts and brands previews as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BotSpec {
    pub username: String,
    pub display_name: String,
    pub description: String,
}

/// Host calls needed to provision the bot identity.
#[async_trait]
pub trait HostApi: Send + Sync {
    /// Return the user id of the bot, creating the bot if it doesn't exist.
    async fn ensure_bot(&self, bot: &BotSpec) -> Result<String>;

    /// Directory holding the plugin's packaged assets.
    fn bundle_path(&self) -> Result<PathBuf>;

    async fn set_profile_image(&self, user_id: &str, image: &[u8]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(name: &str) -> Attachment {
        Attachment {
            author_icon: "/plugins/hn/hn.png".to_string(),
            author_name: name.to_string(),
            author_link: "https://example.com".to_string(),
        }
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let raw = json!({
            "id": "p1",
            "user_id": "u1",
            "channel_id": "c1",
            "root_id": "r1",
            "create_at": 1700000000000u64,
            "message": "hi",
            "props": {"from_webhook": "true"}
        });
        let post: Post = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(post.extra["root_id"], "r1");
        assert_eq!(serde_json::to_value(&post).unwrap(), raw);
    }

    #[test]
    fn test_add_attachment_to_bare_post() {
        let mut post = Post {
            message: "hi".to_string(),
            ..Default::default()
        };
        assert!(post.attachments().is_empty());

        post.add_attachment(attachment("T"));
        let attachments = post.attachments();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0]["author_name"], "T");
        assert_eq!(attachments[0]["author_link"], "https://example.com");
        assert_eq!(attachments[0]["author_icon"], "/plugins/hn/hn.png");
    }

    #[test]
    fn test_add_attachment_keeps_existing_ones_first() {
        let mut post: Post = serde_json::from_value(json!({
            "message": "hi",
            "props": {"attachments": [{"text": "existing", "color": "#ff0000"}]}
        }))
        .unwrap();

        post.add_attachment(attachment("T"));
        let attachments = post.attachments();
        assert_eq!(attachments.len(), 2);
        assert_eq!(attachments[0], json!({"text": "existing", "color": "#ff0000"}));
        assert_eq!(attachments[1]["author_name"], "T");
    }

    #[test]
    fn test_plugin_context_fields() {
        let context: PluginContext = serde_json::from_value(json!({
            "session_id": "s1",
            "request_id": "r1",
            "ip_address": "10.0.0.1",
            "accept_language": "en-US",
            "user_agent": "mattermost-desktop",
            "source_plugin_id": "ignored"
        }))
        .unwrap();
        assert_eq!(context.session_id, "s1");
        assert_eq!(context.request_id, "r1");
        assert_eq!(context.ip_address, "10.0.0.1");
        assert_eq!(context.accept_language, "en-US");
        assert_eq!(context.user_agent, "mattermost-desktop");

        let empty: PluginContext = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.request_id, "");
    }

    #[test]
    fn test_non_array_attachments_are_replaced() {
        let mut post: Post =
            serde_json::from_value(json!({"props": {"attachments": "bogus"}})).unwrap();
        assert!(post.attachments().is_empty());
        post.add_attachment(attachment("T"));
        assert_eq!(post.attachments().len(), 1);
    }
}
