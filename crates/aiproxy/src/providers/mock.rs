use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::errors::{ProxyError, ProxyResult};
use crate::providers::base::{
    Completion, CompletionRequest, FragmentStream, ModelInfo, Provider, Usage,
};

/// A mock provider that replays pre-configured output for testing
#[derive(Default)]
pub struct MockProvider {
    text: String,
    fragments: Vec<String>,
    stream_error: Option<ProxyError>,
    failure: Option<ProxyError>,
    hold_open: bool,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    released: Arc<AtomicBool>,
}

/// Flags the stream as released once the consumer drops it
struct ReleaseGuard(Arc<AtomicBool>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text returned by single-shot completions
    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.text = text.into();
        self
    }

    /// Fragments emitted, in order, by streaming completions
    pub fn with_fragments<I, S>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fragments = fragments.into_iter().map(Into::into).collect();
        self
    }

    /// Error emitted after the scripted fragments
    pub fn with_stream_error(mut self, err: ProxyError) -> Self {
        self.stream_error = Some(err);
        self
    }

    /// Every call fails up front with this error
    pub fn failing(mut self, err: ProxyError) -> Self {
        self.failure = Some(err);
        self
    }

    /// Keep the stream pending after the scripted fragments instead of ending it
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// The body an openai endpoint would answer with for `text`
    pub fn raw_completion(text: &str) -> Value {
        json!({
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": text},
                "finish_reason": "stop"
            }]
        })
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Becomes true once a stream handed out by this provider has been dropped
    pub fn stream_released(&self) -> Arc<AtomicBool> {
        self.released.clone()
    }

    fn record(&self, request: &CompletionRequest) -> ProxyResult<()> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: &CompletionRequest) -> ProxyResult<Completion> {
        self.record(request)?;
        Ok(Completion {
            text: self.text.clone(),
            usage: Usage::default(),
            raw: Self::raw_completion(&self.text),
        })
    }

    async fn stream(&self, request: &CompletionRequest) -> ProxyResult<FragmentStream> {
        self.record(request)?;

        let mut items: Vec<ProxyResult<String>> =
            self.fragments.iter().cloned().map(Ok).collect();
        if let Some(err) = &self.stream_error {
            items.push(Err(err.clone()));
        }

        let scripted = stream::iter(items);
        let fragments = if self.hold_open {
            scripted.chain(stream::pending()).boxed()
        } else {
            scripted.boxed()
        };

        let guard = ReleaseGuard(self.released.clone());
        Ok(fragments
            .map(move |item| {
                let _ = &guard;
                item
            })
            .boxed())
    }

    async fn complete_json(
        &self,
        request: &CompletionRequest,
        _schema_name: &str,
        _schema: &Value,
    ) -> ProxyResult<Value> {
        self.record(request)?;
        serde_json::from_str(&self.text).map_err(|e| ProxyError::InvalidResponse(e.to_string()))
    }

    async fn generate_image(&self, prompt: &str) -> ProxyResult<Value> {
        self.record(&CompletionRequest::prompt(prompt))?;
        Ok(json!({"data": [{"b64_json": "aW1hZ2U="}]}))
    }

    async fn list_models(&self) -> ProxyResult<Vec<ModelInfo>> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(vec![ModelInfo {
            id: "mock-model".to_string(),
            details: Default::default(),
        }])
    }
}
