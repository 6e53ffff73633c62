use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ProxyResult;
use crate::models::message::Message;

/// Incremental text produced by a streaming completion, in arrival order
pub type FragmentStream = BoxStream<'static, ProxyResult<String>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// What to send to the model: an optional system prompt and the conversation so far
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub messages: Vec<Message>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            system: None,
            messages,
        }
    }

    /// A single user turn
    pub fn prompt<S: Into<String>>(prompt: S) -> Self {
        Self::new(vec![Message::user(prompt)])
    }

    pub fn with_system(mut self, system: Option<String>) -> Self {
        self.system = system;
        self
    }
}

/// The result of a single-shot completion
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Assistant text of the first choice
    pub text: String,
    pub usage: Usage,
    /// The provider's response body, untouched
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Base trait for hosted model providers
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the full reply in one response
    async fn complete(&self, request: &CompletionRequest) -> ProxyResult<Completion>;

    /// Open an incremental completion. Errors returned here happen before any
    /// fragment is produced.
    async fn stream(&self, request: &CompletionRequest) -> ProxyResult<FragmentStream>;

    /// Generate a reply constrained to the given JSON schema and return it parsed
    async fn complete_json(
        &self,
        request: &CompletionRequest,
        schema_name: &str,
        schema: &Value,
    ) -> ProxyResult<Value>;

    /// Generate a single image, returning the provider's payload as-is
    async fn generate_image(&self, prompt: &str) -> ProxyResult<Value>;

    async fn list_models(&self) -> ProxyResult<Vec<ModelInfo>>;
}
