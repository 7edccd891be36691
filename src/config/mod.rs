//! Process configuration.
//!
//! Loaded once at startup from a YAML file into an immutable
//! [`AppConfig`] and passed by reference into every component that
//! needs it. Nothing re-reads configuration after boot.

use std::path::Path;

use chat_protocol::SamplingParams;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Deployment environment, selects the log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,

    /// Shared secret expected in the `X-API-Key` request header
    pub api_key: String,

    pub server: ServerConfig,

    /// Endpoint serving the text-only chat model
    pub text_model: ModelEndpointConfig,

    /// Endpoint serving the vision-language model
    pub image_model: ModelEndpointConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    pub port: u16,

    /// Default tracing filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    #[serde(default)]
    pub allow_credentials: bool,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
}

/// Per-modality model endpoint. Immutable after process start and
/// shared read-only across all in-flight requests.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelEndpointConfig {
    /// Model identifier passed through to the backend
    pub model_name: String,

    /// Base address of the model-serving endpoint
    pub base_url: String,

    /// Maximum in-flight requests the backend client may hold open
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Default sampling parameters, overridable per request
    #[serde(default)]
    pub llm_args: SamplingParams,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_concurrency() -> usize {
    10
}

impl AppConfig {
    /// Read and validate the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: AppConfig = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.is_empty() {
            return Err(ConfigError::Invalid("api_key must not be empty".into()));
        }
        for endpoint in [&self.text_model, &self.image_model] {
            url::Url::parse(&endpoint.base_url).map_err(|e| {
                ConfigError::Invalid(format!(
                    "base_url '{}' for model '{}' is not a valid URL: {e}",
                    endpoint.base_url, endpoint.model_name
                ))
            })?;
            if endpoint.max_concurrency == 0 {
                return Err(ConfigError::Invalid(format!(
                    "max_concurrency for model '{}' must be greater than 0",
                    endpoint.model_name
                )));
            }
        }
        let cors = &self.server.cors;
        if cors.allow_credentials && cors.allow_origins.iter().any(|o| o == "*") {
            return Err(ConfigError::Invalid(
                "cors.allow_credentials cannot be combined with a wildcard origin".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
environment: development
api_key: test-key
server:
  port: 1999
  cors:
    allow_origins: ["*"]
    allow_credentials: false
    allow_methods: ["*"]
    allow_headers: ["*"]
text_model:
  model_name: llama-3.1-8b
  base_url: http://localhost:8000/v1
  llm_args:
    temperature: 0.7
    max_tokens: 256
image_model:
  model_name: qwen2-vl-7b
  base_url: http://localhost:8001/v1
  max_concurrency: 4
  llm_args: {}
"#;

    #[test]
    fn parses_example_config() {
        let config: AppConfig = serde_yaml::from_str(EXAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 1999);
        assert_eq!(config.text_model.max_concurrency, 10);
        assert_eq!(config.image_model.max_concurrency, 4);
        assert_eq!(config.text_model.llm_args.temperature, Some(0.7));
        assert_eq!(config.image_model.llm_args.temperature, None);
    }

    #[test]
    fn rejects_empty_api_key() {
        let mut config: AppConfig = serde_yaml::from_str(EXAMPLE).unwrap();
        config.api_key.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_invalid_base_url() {
        let mut config: AppConfig = serde_yaml::from_str(EXAMPLE).unwrap();
        config.text_model.base_url = "not a url".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_credentials_with_wildcard_origin() {
        let mut config: AppConfig = serde_yaml::from_str(EXAMPLE).unwrap();
        config.server.cors.allow_credentials = true;
        assert!(config.validate().is_err());
    }
}
