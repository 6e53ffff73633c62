use aiproxy::errors::ProxyError;
use aiproxy::providers::base::CompletionRequest;
use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};
use tracing::info;

use super::{JsonBody, PromptRequest};
use crate::error::ApiError;
use crate::state::AppState;

// Persona bot: single-shot completion under the configured CV persona.
// Without a persona the route behaves as if it did not exist.
async fn cv_handler(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<PromptRequest>,
) -> Result<Json<Value>, ApiError> {
    let persona = state.prompts.cv.clone().ok_or(ProxyError::NotFound)?;
    info!("CV question ({} chars)", request.prompt.len());

    let completion = state
        .provider
        .complete(&CompletionRequest::prompt(request.prompt).with_system(Some(persona)))
        .await?;

    Ok(Json(json!({ "result": completion.raw })))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/cv", post(cv_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::PromptSettings;
    use crate::routes::test_support::{body_json, post_json, state_with};
    use aiproxy::models::message::Message;
    use aiproxy::providers::mock::MockProvider;
    use axum::http::StatusCode;
    use std::sync::Arc;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_cv_answers_in_persona() {
        let provider = Arc::new(MockProvider::new().with_text("Yes, I maintain COBOL."));
        let prompts = PromptSettings {
            cv: Some("You are acting as Alex Schmidt.".to_string()),
            ..PromptSettings::default()
        };
        let app = routes(AppState::new(provider.clone(), prompts));

        let response = app
            .oneshot(post_json("/cv", json!({"prompt": "Can you do COBOL?"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"result": MockProvider::raw_completion("Yes, I maintain COBOL.")})
        );
        let sent = &provider.requests()[0];
        assert_eq!(sent.system.as_deref(), Some("You are acting as Alex Schmidt."));
        assert_eq!(sent.messages, vec![Message::user("Can you do COBOL?")]);
    }

    #[tokio::test]
    async fn test_cv_without_persona_is_404() {
        let (state, provider) = state_with(MockProvider::new().with_text("unused"));

        let response = routes(state)
            .oneshot(post_json("/cv", json!({"prompt": "Hi"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({"message": "Page not found"})
        );
        assert!(provider.requests().is_empty());
    }
}
