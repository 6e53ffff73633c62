use serde_json::{json, Value};

use super::base::{CompletionRequest, Usage};
use super::configs::OpenAiProviderConfig;
use crate::errors::{ProxyError, ProxyResult};
use crate::models::message::Message;

/// Convert internal messages to openai's chat message specification, system prompt first
pub fn messages_to_openai_spec(system: Option<&str>, messages: &[Message]) -> Vec<Value> {
    let mut spec = Vec::with_capacity(messages.len() + 1);
    if let Some(system) = system {
        spec.push(json!({
            "role": "system",
            "content": system
        }));
    }
    spec.extend(messages.iter().map(|message| {
        json!({
            "role": message.role,
            "content": message.content
        })
    }));
    spec
}

/// Build the body of a chat completion request
pub fn chat_payload(config: &OpenAiProviderConfig, request: &CompletionRequest) -> Value {
    let mut payload = json!({
        "model": config.model,
        "messages": messages_to_openai_spec(request.system.as_deref(), &request.messages),
    });

    if let Some(object) = payload.as_object_mut() {
        if let Some(temp) = config.temperature {
            object.insert("temperature".to_string(), json!(temp));
        }
        if let Some(tokens) = config.max_tokens {
            object.insert("max_completion_tokens".to_string(), json!(tokens));
        }
    }
    payload
}

/// Extract the assistant text from a chat completion response. A null content
/// (e.g. a refusal or a length cut before any text) reads as empty.
pub fn openai_response_text(response: &Value) -> ProxyResult<String> {
    let message = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| ProxyError::InvalidResponse("no choices in response".to_string()))?;

    Ok(message
        .get("content")
        .and_then(|content| content.as_str())
        .unwrap_or_default()
        .to_string())
}

/// Text carried by one streaming chunk, if any
pub fn delta_text(chunk: &Value) -> Option<&str> {
    chunk
        .get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()
}

pub fn get_usage(data: &Value) -> Usage {
    let Some(usage) = data.get("usage") else {
        return Usage::default();
    };

    let input_tokens = usage
        .get("prompt_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32);

    let output_tokens = usage
        .get("completion_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32);

    let total_tokens = usage
        .get("total_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32)
        .or_else(|| match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        });

    Usage::new(input_tokens, output_tokens, total_tokens)
}

/// Look for an error object in a provider body. Some compatible endpoints wrap
/// it in a one-element array.
pub fn check_openai_error(body: &Value, status: Option<u16>) -> Option<ProxyError> {
    let body = match body {
        Value::Array(items) => items.first()?,
        other => other,
    };
    let error = body.get("error")?;

    let message = error
        .get("message")
        .and_then(|m| m.as_str())
        .map(String::from)
        .unwrap_or_else(|| error.to_string());
    let status = status.or_else(|| {
        error
            .get("code")
            .and_then(|c| c.as_u64())
            .and_then(|c| u16::try_from(c).ok())
    });

    Some(ProxyError::upstream(status, message))
}

/// Turn a failed response body into an error, keeping the provider's message when it has one
pub fn error_from_body(status: u16, body: &str) -> ProxyError {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| check_openai_error(&value, Some(status)))
        .unwrap_or_else(|| {
            let message = if body.trim().is_empty() {
                format!("Provider returned status {}", status)
            } else {
                body.trim().to_string()
            };
            ProxyError::upstream(Some(status), message)
        })
}
