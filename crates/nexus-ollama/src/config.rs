//! Ollama configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use url::Url;

use nexus_core::config::parse_var;
use nexus_core::{Error, Result};

/// Configuration for the Ollama client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub embedding_model: String,
    pub timeout_secs: u64,
    pub temperature: Option<f32>,
    pub num_predict: Option<u32>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "mistral".to_string(),
            embedding_model: "all-minilm".to_string(),
            timeout_secs: 120,
            temperature: None,
            num_predict: None,
        }
    }
}

impl OllamaConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            base_url: optional("OLLAMA_BASE_URL").unwrap_or(defaults.base_url),
            model: optional("OLLAMA_MODEL").unwrap_or(defaults.model),
            embedding_model: optional("OLLAMA_EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            timeout_secs: parse_var(&lookup, "OLLAMA_TIMEOUT_SECS", defaults.timeout_secs)?,
            temperature: optional("OLLAMA_TEMPERATURE")
                .map(|raw| {
                    raw.trim().parse::<f32>().map_err(|_| {
                        Error::Configuration(format!("OLLAMA_TEMPERATURE has an invalid value: {}", raw))
                    })
                })
                .transpose()?,
            num_predict: optional("OLLAMA_NUM_PREDICT")
                .map(|raw| {
                    raw.trim().parse::<u32>().map_err(|_| {
                        Error::Configuration(format!("OLLAMA_NUM_PREDICT has an invalid value: {}", raw))
                    })
                })
                .transpose()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create configuration with explicit endpoint and models
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, embedding_model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            embedding_model: embedding_model.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            Error::Configuration(format!("OLLAMA_BASE_URL '{}' is not a valid URL: {}", self.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Configuration(format!(
                "OLLAMA_BASE_URL must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.model.trim().is_empty() || self.embedding_model.trim().is_empty() {
            return Err(Error::Configuration("model names must not be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Configuration("OLLAMA_TIMEOUT_SECS must be positive".to_string()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Endpoint URL for an API path such as `/api/generate`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}
