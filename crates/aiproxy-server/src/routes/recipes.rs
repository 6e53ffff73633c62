use aiproxy::errors::ProxyError;
use aiproxy::models::recipe::Recipe;
use aiproxy::providers::base::CompletionRequest;
use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};
use tracing::info;

use super::{JsonBody, PromptRequest};
use crate::error::ApiError;
use crate::state::AppState;

// Structured output: the model must answer with a recipe matching the schema
async fn recipes_handler(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<PromptRequest>,
) -> Result<Json<Value>, ApiError> {
    info!("Recipe requested ({} chars)", request.prompt.len());

    let completion_request = CompletionRequest::prompt(request.prompt)
        .with_system(Some(state.prompts.recipes.clone()));
    let value = state
        .provider
        .complete_json(&completion_request, Recipe::SCHEMA_NAME, &Recipe::json_schema())
        .await?;

    let recipe: Recipe = serde_json::from_value(value)
        .map_err(|e| ProxyError::InvalidResponse(format!("model output is not a recipe: {}", e)))?;

    Ok(Json(json!({ "recipe": recipe })))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/recipes", post(recipes_handler))
        .with_state(state)
}
