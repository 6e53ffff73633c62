use crate::error::{to_env_var, ConfigError};
use aiproxy::history::DEFAULT_MAX_SESSIONS;
use aiproxy::providers::configs::{
    OpenAiProviderConfig, DEFAULT_HOST, DEFAULT_IMAGE_MODEL, DEFAULT_MODEL,
};
use config::{Config, Environment};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};

pub const ENV_PREFIX: &str = "AIPROXY";

const RECIPES_PROMPT: &str = "You are an inventive cook. You create a new recipe based on the user's ideas and taste.";

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.host.parse().map_err(|_| ConfigError::InvalidValue {
            env_var: to_env_var("server.host"),
            value: self.host.clone(),
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_provider_host")]
    pub host: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl ProviderSettings {
    // Convert to the aiproxy provider config, the api key is the one setting without a default
    pub fn into_config(self) -> Result<OpenAiProviderConfig, ConfigError> {
        let api_key = self
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar {
                env_var: to_env_var("provider.api_key"),
            })?;

        Ok(OpenAiProviderConfig {
            host: self.host,
            api_key,
            model: self.model,
            image_model: self.image_model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        })
    }
}

/// System prompts prepended by the routes that use one
#[derive(Debug, Deserialize)]
pub struct PromptSettings {
    #[serde(default)]
    pub stream: Option<String>,
    #[serde(default)]
    pub chat: Option<String>,
    #[serde(default = "default_recipes_prompt")]
    pub recipes: String,
    /// Persona for `/cv`; the route answers 404 while unset
    #[serde(default)]
    pub cv: Option<String>,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            stream: None,
            chat: None,
            recipes: default_recipes_prompt(),
            cv: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistorySettings {
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub provider: ProviderSettings,
    #[serde(default)]
    pub prompts: PromptSettings,
    #[serde(default)]
    pub history: HistorySettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Server defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            // Provider defaults
            .set_default("provider.host", default_provider_host())?
            .set_default("provider.model", default_model())?
            .set_default("provider.image_model", default_image_model())?
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            // A bare PORT wins, as hosting platforms set it
            .set_override_option("server.port", std::env::var("PORT").ok())?
            .build()?;

        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        match result {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_provider_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_image_model() -> String {
    DEFAULT_IMAGE_MODEL.to_string()
}

fn default_recipes_prompt() -> String {
    RECIPES_PROMPT.to_string()
}

fn default_max_sessions() -> usize {
    DEFAULT_MAX_SESSIONS
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("AIPROXY_") {
                env::remove_var(&key);
            }
        }
        env::remove_var("PORT");
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();
        env::set_var("AIPROXY_PROVIDER__API_KEY", "test-key");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.prompts.stream, None);
        assert_eq!(settings.prompts.recipes, RECIPES_PROMPT);
        assert_eq!(settings.prompts.cv, None);
        assert_eq!(settings.history.max_sessions, 1000);

        let provider = settings.provider.into_config().unwrap();
        assert_eq!(provider.host, DEFAULT_HOST);
        assert_eq!(provider.api_key, "test-key");
        assert_eq!(provider.model, "gemini-2.0-flash");
        assert_eq!(provider.image_model, "imagen-3.0-generate-002");
        assert_eq!(provider.temperature, None);
        assert_eq!(provider.max_tokens, None);

        clean_env();
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        clean_env();
        env::set_var("AIPROXY_SERVER__PORT", "9000");
        env::set_var("AIPROXY_PROVIDER__API_KEY", "test-key");
        env::set_var("AIPROXY_PROVIDER__HOST", "https://api.openai.com/v1");
        env::set_var("AIPROXY_PROVIDER__MODEL", "gpt-4o-mini");
        env::set_var("AIPROXY_PROVIDER__TEMPERATURE", "0.8");
        env::set_var("AIPROXY_PROVIDER__MAX_TOKENS", "150");
        env::set_var("AIPROXY_PROMPTS__STREAM", "Answer in sonnets.");
        env::set_var("AIPROXY_PROMPTS__CV", "You are acting as Alex Schmidt.");
        env::set_var("AIPROXY_HISTORY__MAX_SESSIONS", "50");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.prompts.stream.as_deref(), Some("Answer in sonnets."));
        assert_eq!(
            settings.prompts.cv.as_deref(),
            Some("You are acting as Alex Schmidt.")
        );
        assert_eq!(settings.history.max_sessions, 50);

        let provider = settings.provider.into_config().unwrap();
        assert_eq!(provider.host, "https://api.openai.com/v1");
        assert_eq!(provider.model, "gpt-4o-mini");
        assert_eq!(provider.temperature, Some(0.8));
        assert_eq!(provider.max_tokens, Some(150));

        clean_env();
    }

    #[test]
    #[serial]
    fn test_bare_port_wins() {
        clean_env();
        env::set_var("AIPROXY_SERVER__PORT", "9000");
        env::set_var("PORT", "3001");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.port, 3001);

        clean_env();
    }

    #[test]
    #[serial]
    fn test_missing_api_key() {
        clean_env();

        let settings = Settings::new().unwrap();
        match settings.provider.into_config() {
            Err(ConfigError::MissingEnvVar { env_var }) => {
                assert_eq!(env_var, "AIPROXY_PROVIDER__API_KEY");
            }
            other => panic!("Expected MissingEnvVar, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_socket_addr_conversion() {
        let server_settings = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 3000,
        };
        let addr = server_settings.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:3000");

        let bad = ServerSettings {
            host: "not an ip".to_string(),
            port: 3000,
        };
        assert!(matches!(
            bad.socket_addr(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
