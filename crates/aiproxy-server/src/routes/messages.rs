use aiproxy::providers::base::CompletionRequest;
use aiproxy::relay;
use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};
use tracing::info;

use super::{log_outcome, JsonBody, PromptRequest};
use crate::error::ApiError;
use crate::sse::SseResponse;
use crate::state::AppState;

// Single-shot completion, the provider's response is passed through untouched
async fn messages_handler(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<PromptRequest>,
) -> Result<Json<Value>, ApiError> {
    info!("Completion requested ({} chars)", request.prompt.len());

    let completion = state
        .provider
        .complete(&CompletionRequest::prompt(request.prompt))
        .await?;

    Ok(Json(json!({ "result": completion.raw })))
}

async fn stream_handler(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<PromptRequest>,
) -> Result<SseResponse, ApiError> {
    info!("Streaming completion requested ({} chars)", request.prompt.len());

    let completion_request =
        CompletionRequest::prompt(request.prompt).with_system(state.prompts.stream.clone());
    let handle = relay::open_stream(state.provider.as_ref(), &completion_request).await?;

    tokio::spawn(log_outcome("/messages/stream", handle.outcome));
    Ok(SseResponse::new(handle.body))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/messages", post(messages_handler))
        .route("/messages/stream", post(stream_handler))
        .with_state(state)
}
