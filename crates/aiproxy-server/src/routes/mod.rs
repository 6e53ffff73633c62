// Export route modules
pub mod chat;
pub mod cv;
pub mod health;
pub mod images;
pub mod messages;
pub mod models;
pub mod recipes;

use aiproxy::errors::ProxyError;
use aiproxy::relay::SessionOutcome;
use axum::{
    extract::FromRequest,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use serde::Deserialize;
use tokio::task::JoinHandle;

use crate::error::ApiError;
use crate::state::AppState;

/// `{prompt}` body shared by every generation route. A missing prompt is
/// forwarded as an empty string and left to the provider to judge.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Json extractor whose rejection is reported as `{message}` like every other failure
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(messages::routes(state.clone()))
        .merge(chat::routes(state.clone()))
        .merge(images::routes(state.clone()))
        .merge(models::routes(state.clone()))
        .merge(cv::routes(state.clone()))
        .merge(recipes::routes(state))
        .layer(middleware::map_response(method_not_allowed))
        .fallback(not_found)
}

async fn not_found() -> ApiError {
    ApiError(ProxyError::NotFound)
}

// A known path with an unsupported method is answered like any unknown route
async fn method_not_allowed(response: Response) -> Response {
    if response.status() == StatusCode::METHOD_NOT_ALLOWED {
        ApiError(ProxyError::NotFound).into_response()
    } else {
        response
    }
}

/// Log how a detached relay session ended
async fn log_outcome(route: &'static str, outcome: JoinHandle<SessionOutcome>) {
    match outcome.await {
        Ok(outcome) => tracing::info!(
            "{} stream closed ({:?}) after {} records",
            route,
            outcome.reason,
            outcome.records
        ),
        Err(e) => tracing::error!("{} relay task failed: {}", route, e),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use aiproxy::providers::mock::MockProvider;
    use aiproxy::relay::RecordDecoder;
    use axum::{
        body::Body,
        http::{Request, Response},
        Router,
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::sync::Arc;

    use crate::configuration::PromptSettings;
    use crate::state::AppState;

    pub fn state_with(provider: MockProvider) -> (AppState, Arc<MockProvider>) {
        let provider = Arc::new(provider);
        let state = AppState::new(provider.clone(), PromptSettings::default());
        (state, provider)
    }

    pub fn app(provider: MockProvider) -> (Router, Arc<MockProvider>) {
        let (state, provider) = state_with(provider);
        (super::configure(state), provider)
    }

    pub fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    pub async fn body_json(response: Response<Body>) -> Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    /// Read an event-stream body to the end and decode every record
    pub async fn body_fragments(response: Response<Body>) -> Vec<String> {
        let mut body = response.into_body();
        let mut decoder = RecordDecoder::new();
        let mut fragments = Vec::new();
        while let Some(frame) = body.frame().await {
            if let Ok(data) = frame.unwrap().into_data() {
                fragments.extend(decoder.push(&data).unwrap());
            }
        }
        assert!(decoder.is_idle());
        fragments
    }
}
