use aiproxy::history::{with_reply, ConversationStore};
use aiproxy::providers::base::CompletionRequest;
use aiproxy::relay::{self, CloseReason, RelayHandle};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{JsonBody, PromptRequest};
use crate::error::ApiError;
use crate::sse::SseResponse;
use crate::state::AppState;

// Conversation turn: the prompt joins the session history before the provider is called
async fn chat_handler(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<PromptRequest>,
) -> Result<Json<Value>, ApiError> {
    let session_id = ConversationStore::session_key(request.session_id.as_deref()).to_string();
    let sent = state.history.append_user(&session_id, &request.prompt).await;
    info!("Chat turn {} in session {}", sent.len(), session_id);

    let completion_request = CompletionRequest::new(sent.clone())
        .with_system(state.prompts.chat.clone());
    let completion = state.provider.complete(&completion_request).await?;

    state
        .history
        .replace(&session_id, with_reply(sent, &completion.text))
        .await;

    Ok(Json(json!({ "result": completion.text })))
}

async fn chat_stream_handler(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<PromptRequest>,
) -> Result<SseResponse, ApiError> {
    let session_id = ConversationStore::session_key(request.session_id.as_deref()).to_string();
    let sent = state.history.append_user(&session_id, &request.prompt).await;
    info!("Streaming chat turn {} in session {}", sent.len(), session_id);

    let completion_request = CompletionRequest::new(sent.clone())
        .with_system(state.prompts.chat.clone());
    let RelayHandle { body, outcome } =
        relay::open_stream(state.provider.as_ref(), &completion_request).await?;

    // Only a reply that reached end-of-stream is written back to the history
    let history = state.history;
    tokio::spawn(async move {
        match outcome.await {
            Ok(outcome) if outcome.reason == CloseReason::Exhausted => {
                history
                    .replace(&session_id, with_reply(sent, &outcome.transcript))
                    .await;
                info!(
                    "Session {} updated after {} records",
                    session_id, outcome.records
                );
            }
            Ok(outcome) => warn!(
                "Session {} stream closed ({:?}), reply not recorded",
                session_id, outcome.reason
            ),
            Err(e) => tracing::error!("/chat/stream relay task failed: {}", e),
        }
    });

    Ok(SseResponse::new(body))
}

async fn history_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<Value> {
    let messages = state.history.history(&session_id).await;
    Json(json!({ "sessionId": session_id, "messages": messages }))
}

async fn clear_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> StatusCode {
    if state.history.clear(&session_id).await {
        info!("Cleared session {}", session_id);
    }
    StatusCode::NO_CONTENT
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/chat/stream", post(chat_stream_handler))
        .route(
            "/chat/:session_id",
            get(history_handler).delete(clear_handler),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{body_fragments, body_json, post_json, state_with};
    use aiproxy::errors::ProxyError;
    use aiproxy::models::message::Message;
    use aiproxy::providers::mock::MockProvider;
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    async fn wait_for_history(state: &AppState, session_id: &str, len: usize) -> Vec<Message> {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let history = state.history.history(session_id).await;
                if history.len() == len {
                    return history;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("history was not updated")
    }

    #[tokio::test]
    async fn test_chat_records_exchange() {
        let (state, provider) = state_with(MockProvider::new().with_text("Use a queue."));
        let app = routes(state.clone());

        let response = app
            .clone()
            .oneshot(post_json("/chat", json!({"prompt": "How to decouple?"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"result": "Use a queue."}));

        app.oneshot(post_json("/chat", json!({"prompt": "Why?"})))
            .await
            .unwrap();

        // the second call carried the whole conversation
        assert_eq!(
            provider.requests()[1].messages,
            vec![
                Message::user("How to decouple?"),
                Message::assistant("Use a queue."),
                Message::user("Why?"),
            ]
        );
        assert_eq!(state.history.history("default").await.len(), 4);
    }

    #[tokio::test]
    async fn test_chat_sessions_are_isolated() {
        let (state, provider) = state_with(MockProvider::new().with_text("ok"));
        let app = routes(state.clone());

        app.clone()
            .oneshot(post_json("/chat", json!({"prompt": "A", "sessionId": "alice"})))
            .await
            .unwrap();
        app.oneshot(post_json("/chat", json!({"prompt": "B", "sessionId": "bob"})))
            .await
            .unwrap();

        assert_eq!(provider.requests()[1].messages, vec![Message::user("B")]);
        assert_eq!(
            state.history.history("alice").await,
            vec![Message::user("A"), Message::assistant("ok")]
        );
    }

    #[tokio::test]
    async fn test_chat_failure_keeps_prompt_only() {
        let (state, _) = state_with(
            MockProvider::new().failing(ProxyError::upstream(Some(500), "Internal error")),
        );
        let app = routes(state.clone());

        let response = app
            .oneshot(post_json("/chat", json!({"prompt": "Hi"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({"message": "Internal error"})
        );
        assert_eq!(
            state.history.history("default").await,
            vec![Message::user("Hi")]
        );
    }

    #[tokio::test]
    async fn test_chat_stream_updates_history_on_completion() {
        let (state, _) =
            state_with(MockProvider::new().with_fragments(["Weigh ", "the ", "costs."]));
        let app = routes(state.clone());

        let response = app
            .oneshot(post_json(
                "/chat/stream",
                json!({"prompt": "Monolith or services?", "sessionId": "s1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_fragments(response).await,
            vec!["Weigh ", "the ", "costs."]
        );

        let history = wait_for_history(&state, "s1", 2).await;
        assert_eq!(
            history,
            vec![
                Message::user("Monolith or services?"),
                Message::assistant("Weigh the costs."),
            ]
        );
    }

    #[tokio::test]
    async fn test_chat_stream_error_does_not_record_reply() {
        let (state, _) = state_with(
            MockProvider::new()
                .with_fragments(["partial"])
                .with_stream_error(ProxyError::Transport("reset".into())),
        );
        let app = routes(state.clone());

        let response = app
            .oneshot(post_json("/chat/stream", json!({"prompt": "Hi"})))
            .await
            .unwrap();
        assert_eq!(body_fragments(response).await, vec!["partial"]);

        // give the outcome task a moment; the history must keep only the prompt
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            state.history.history("default").await,
            vec![Message::user("Hi")]
        );
    }

    #[tokio::test]
    async fn test_history_and_clear() {
        let (state, _) = state_with(MockProvider::new().with_text("Hello"));
        let app = routes(state.clone());

        app.clone()
            .oneshot(post_json("/chat", json!({"prompt": "Hi", "sessionId": "s9"})))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/chat/s9").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(
            body_json(response).await,
            json!({
                "sessionId": "s9",
                "messages": [
                    {"role": "user", "content": "Hi"},
                    {"role": "assistant", "content": "Hello"}
                ]
            })
        );

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/chat/s9")
                    .method("DELETE")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(state.history.history("s9").await.is_empty());
    }
}
