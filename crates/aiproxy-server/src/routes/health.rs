use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

async fn liveness() -> Json<Value> {
    Json(json!({ "message": "Running" }))
}

pub fn routes() -> Router {
    Router::new().route("/", get(liveness))
}
