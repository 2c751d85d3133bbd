use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::NetworkErrorPolicy;
use crate::hackernews::{FetchError, ItemSource, RemoteItem};
use crate::links;
use crate::platform::{Attachment, PluginContext, Post};

/// What the hook tells the host to do with a post.
#[derive(Debug, Clone, PartialEq)]
pub enum HookOutcome {
    /// Post as-is.
    Unchanged,
    /// Post this version instead.
    Replaced(Post),
}

/// Fetch the candidates in order and return the first one that is a story.
///
/// Undecodable replies and non-story items move on to the next id. A network
/// failure either ends the scan with the error or is skipped, per `policy`.
pub async fn find_first_story(
    source: &dyn ItemSource,
    ids: &[String],
    policy: NetworkErrorPolicy,
) -> Result<Option<RemoteItem>, FetchError> {
    for id in ids {
        let item = match source.fetch_item(id).await {
            Ok(item) => item,
            Err(e) if e.is_network() && policy == NetworkErrorPolicy::AbortMessage => {
                return Err(e);
            }
            Err(e) => {
                warn!("Skipping Hacker News item {}: {}", id, e);
                continue;
            }
        };

        if item.is_story() {
            return Ok(Some(item));
        }
        debug!("Hacker News item {} is a {:?}, not a story", id, item.item_type);
    }

    Ok(None)
}

/// Adds a Hacker News preview to posts that link to a story.
pub struct Previewer {
    source: Arc<dyn ItemSource>,
    bot_user_id: String,
    icon_path: String,
    policy: NetworkErrorPolicy,
}

impl Previewer {
    pub fn new(
        source: Arc<dyn ItemSource>,
        bot_user_id: String,
        icon_path: String,
        policy: NetworkErrorPolicy,
    ) -> Self {
        Self {
            source,
            bot_user_id,
            icon_path,
            policy,
        }
    }

    pub async fn message_will_be_posted(
        &self,
        context: &PluginContext,
        mut post: Post,
    ) -> HookOutcome {
        if post.user_id == self.bot_user_id {
            return HookOutcome::Unchanged;
        }

        let ids = links::candidate_ids(&post.message);
        if ids.is_empty() {
            return HookOutcome::Unchanged;
        }

        info!(
            "Post {} links {} Hacker News item(s) (request {})",
            post.id,
            ids.len(),
            context.request_id
        );
        debug!(
            "Hook context: session {}, ip {}, language {:?}, agent {:?}",
            context.session_id, context.ip_address, context.accept_language, context.user_agent
        );

        let story = match find_first_story(self.source.as_ref(), &ids, self.policy).await {
            Ok(Some(story)) => story,
            Ok(None) => return HookOutcome::Unchanged,
            Err(e) => {
                error!("Giving up on previews for post {}: {}", post.id, e);
                return HookOutcome::Unchanged;
            }
        };

        post.add_attachment(Attachment {
            author_icon: self.icon_path.clone(),
            author_name: story.title,
            author_link: story.url,
        });
        HookOutcome::Replaced(post)
    }
}
