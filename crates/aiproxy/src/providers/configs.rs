pub const DEFAULT_HOST: &str = "https://generativelanguage.googleapis.com/v1beta/openai/";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-3.0-generate-002";

/// Settings for any endpoint speaking the openai chat completions API
#[derive(Clone)]
pub struct OpenAiProviderConfig {
    /// Base url, the api paths (`chat/completions`, ...) are appended to it
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub image_model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl OpenAiProviderConfig {
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.host.trim_end_matches('/'), path)
    }
}

// Keep the key out of logs
impl std::fmt::Debug for OpenAiProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProviderConfig")
            .field("host", &self.host)
            .field("model", &self.model)
            .field("image_model", &self.image_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_with_single_slash() {
        let mut config = OpenAiProviderConfig::new("key");
        assert_eq!(
            config.endpoint("chat/completions"),
            "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
        );

        config.host = "https://api.openai.com/v1".to_string();
        assert_eq!(config.endpoint("models"), "https://api.openai.com/v1/models");
    }

    #[test]
    fn test_debug_hides_api_key() {
        let config = OpenAiProviderConfig::new("secret-key");
        assert!(!format!("{:?}", config).contains("secret-key"));
    }
}
