use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::{Client, Response};
use serde_json::{json, Value};

use super::base::{Completion, CompletionRequest, FragmentStream, ModelInfo, Provider};
use super::configs::OpenAiProviderConfig;
use super::utils::{
    chat_payload, check_openai_error, delta_text, error_from_body, get_usage,
    openai_response_text,
};
use crate::errors::{ProxyError, ProxyResult};

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> ProxyResult<Self> {
        // No request timeout: a streamed reply may legitimately stay open for minutes
        let client = Client::builder().build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OpenAiProviderConfig {
        &self.config
    }

    async fn check_status(response: Response) -> ProxyResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::warn!("Provider responded with {}: {}", status, body);
        Err(error_from_body(status.as_u16(), &body))
    }

    async fn post(&self, path: &str, payload: &Value) -> ProxyResult<Response> {
        let response = self
            .client
            .post(self.config.endpoint(path))
            .bearer_auth(&self.config.api_key)
            .json(payload)
            .send()
            .await?;

        Self::check_status(response).await
    }

    async fn post_json(&self, path: &str, payload: &Value) -> ProxyResult<Value> {
        let body: Value = self.post(path, payload).await?.json().await?;
        if let Some(err) = check_openai_error(&body, None) {
            return Err(err);
        }
        Ok(body)
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(&self, request: &CompletionRequest) -> ProxyResult<Completion> {
        let payload = chat_payload(&self.config, request);
        let response = self.post_json("chat/completions", &payload).await?;

        let text = openai_response_text(&response)?;
        let usage = get_usage(&response);
        Ok(Completion {
            text,
            usage,
            raw: response,
        })
    }

    async fn stream(&self, request: &CompletionRequest) -> ProxyResult<FragmentStream> {
        let mut payload = chat_payload(&self.config, request);
        payload["stream"] = json!(true);

        let response = self.post("chat/completions", &payload).await?;
        let mut events = response.bytes_stream().eventsource();

        let fragments = async_stream::try_stream! {
            while let Some(event) = events.next().await {
                let event = event.map_err(|e| ProxyError::Transport(e.to_string()))?;
                let data = event.data.trim();
                if data == "[DONE]" {
                    break;
                }
                if data.is_empty() {
                    continue;
                }

                let chunk: Value = serde_json::from_str(data)?;
                if let Some(err) = check_openai_error(&chunk, None) {
                    Err::<(), ProxyError>(err)?;
                }
                if let Some(text) = delta_text(&chunk) {
                    if !text.is_empty() {
                        yield text.to_string();
                    }
                }
            }
        };

        Ok(fragments.boxed())
    }

    async fn complete_json(
        &self,
        request: &CompletionRequest,
        schema_name: &str,
        schema: &Value,
    ) -> ProxyResult<Value> {
        let mut payload = chat_payload(&self.config, request);
        payload["response_format"] = json!({
            "type": "json_schema",
            "json_schema": {
                "name": schema_name,
                "schema": schema,
                "strict": true
            }
        });

        let response = self.post_json("chat/completions", &payload).await?;
        let text = openai_response_text(&response)?;
        serde_json::from_str(&text).map_err(|e| {
            ProxyError::InvalidResponse(format!("model output is not valid {}: {}", schema_name, e))
        })
    }

    async fn generate_image(&self, prompt: &str) -> ProxyResult<Value> {
        let payload = json!({
            "model": self.config.image_model,
            "prompt": prompt,
            "response_format": "b64_json",
            "n": 1
        });
        self.post_json("images/generations", &payload).await
    }

    async fn list_models(&self) -> ProxyResult<Vec<ModelInfo>> {
        let response = self
            .client
            .get(self.config.endpoint("models"))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;
        let body: Value = Self::check_status(response).await?.json().await?;

        let data = body
            .get("data")
            .cloned()
            .ok_or_else(|| ProxyError::InvalidResponse("no data in model list".to_string()))?;
        Ok(serde_json::from_value(data)?)
    }
}
