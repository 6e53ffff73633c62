use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};
use tracing::info;

use super::{JsonBody, PromptRequest};
use crate::error::ApiError;
use crate::state::AppState;

async fn images_handler(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<PromptRequest>,
) -> Result<Json<Value>, ApiError> {
    info!("Image requested ({} chars)", request.prompt.len());
    let image = state.provider.generate_image(&request.prompt).await?;
    Ok(Json(json!({ "image": image })))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/images", post(images_handler))
        .with_state(state)
}
