use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

async fn models_handler(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let models = state.provider.list_models().await?;
    tracing::info!("Provider offers {} models", models.len());
    Ok(Json(json!({ "models": models })))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/models", get(models_handler))
        .with_state(state)
}
