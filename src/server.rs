use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::platform::{PluginContext, Post};
use crate::preview::{HookOutcome, Previewer};

/// Shared state behind every request; built once at startup.
pub struct AppState {
    pub previewer: Previewer,
    pub profile_image: Option<Bytes>,
}

#[derive(Deserialize)]
struct HookRequest {
    #[serde(default)]
    context: PluginContext,
    post: Post,
}

#[derive(Serialize, Debug)]
struct HookReply {
    /// `None` tells the host to keep the post as it was.
    post: Option<Post>,
    rejection_reason: String,
}

async fn message_will_be_posted(
    State(state): State<Arc<AppState>>,
    Json(body): Json<HookRequest>,
) -> Json<HookReply> {
    let post = match state
        .previewer
        .message_will_be_posted(&body.context, body.post)
        .await
    {
        HookOutcome::Unchanged => None,
        HookOutcome::Replaced(post) => Some(post),
    };

    Json(HookReply {
        post,
        rejection_reason: String::new(),
    })
}

async fn serve_icon(State(state): State<Arc<AppState>>) -> Response {
    match &state.profile_image {
        Some(image) => ([(header::CONTENT_TYPE, "image/png")], image.clone()).into_response(),
        None => {
            error!("Profile image was not loaded; serving nothing");
            StatusCode::OK.into_response()
        }
    }
}

pub fn router(state: Arc<AppState>, plugin_id: &str) -> Router {
    Router::new()
        .route("/hooks/message_will_be_posted", post(message_will_be_posted))
        .route(&format!("/plugins/{plugin_id}/hn.png"), get(serve_icon))
        .with_state(state)
}

/// Serve the hook and the icon until Ctrl-C.
pub async fn run(state: Arc<AppState>, plugin_id: &str, bind: &str) -> Result<()> {
    let app = router(state, plugin_id);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind to {bind}"))?;
    info!("Listening on http://{}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("Server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkErrorPolicy;
    use crate::hackernews::{FetchError, ItemSource, RemoteItem};
    use async_trait::async_trait;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    struct OneStory;

    #[async_trait]
    impl ItemSource for OneStory {
        async fn fetch_item(&self, id: &str) -> Result<RemoteItem, FetchError> {
            match id {
                "123" => Ok(RemoteItem {
                    item_type: "story".to_string(),
                    title: "Cool Thing".to_string(),
                    url: "https://example.com".to_string(),
                }),
                _ => crate::hackernews::decode_item(b""),
            }
        }
    }

    fn app(profile_image: Option<&'static [u8]>) -> Router {
        let previewer = Previewer::new(
            Arc::new(OneStory),
            "bot-user".to_string(),
            "/plugins/hn/hn.png".to_string(),
            NetworkErrorPolicy::AbortMessage,
        );
        let state = Arc::new(AppState {
            previewer,
            profile_image: profile_image.map(Bytes::from_static),
        });
        router(state, "hn")
    }

    async fn call_hook(app: Router, body: serde_json::Value) -> serde_json::Value {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/hooks/message_will_be_posted")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_hook_attaches_preview() {
        let reply = call_hook(
            app(None),
            json!({
                "context": {"request_id": "req-1"},
                "post": {
                    "id": "p1",
                    "user_id": "alice",
                    "channel_id": "c1",
                    "message": "see https://news.ycombinator.com/item?id=123 for details",
                    "create_at": 1
                }
            }),
        )
        .await;

        assert_eq!(reply["rejection_reason"], "");
        assert_eq!(reply["post"]["id"], "p1");
        assert_eq!(reply["post"]["create_at"], 1);
        let attachments = reply["post"]["props"]["attachments"].as_array().unwrap();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0]["author_name"], "Cool Thing");
        assert_eq!(attachments[0]["author_link"], "https://example.com");
        assert_eq!(attachments[0]["author_icon"], "/plugins/hn/hn.png");
    }

    #[tokio::test]
    async fn test_hook_without_links_returns_null_post() {
        let reply = call_hook(
            app(None),
            json!({"post": {"user_id": "alice", "message": "hello"}}),
        )
        .await;
        assert_eq!(reply, json!({"post": null, "rejection_reason": ""}));
    }

    #[tokio::test]
    async fn test_icon_is_served_as_png() {
        let response = app(Some(b"\x89PNG"))
            .oneshot(
                Request::builder()
                    .uri("/plugins/hn/hn.png")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"\x89PNG");
    }

    #[tokio::test]
    async fn test_missing_icon_serves_empty_body() {
        let response = app(None)
            .oneshot(
                Request::builder()
                    .uri("/plugins/hn/hn.png")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_other_plugin_paths_are_not_found() {
        let response = app(Some(b"\x89PNG"))
            .oneshot(
                Request::builder()
                    .uri("/plugins/other/hn.png")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
