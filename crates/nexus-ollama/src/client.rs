//! Ollama HTTP client implementation

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use nexus_core::{
    EmbeddingProvider, Error, GenerationConfig, GenerationResult, LLMProvider, Result,
    ServiceHealth,
};

use crate::config::OllamaConfig;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_BATCH_SIZE: usize = 32;

/// Ollama client serving both generation and embeddings
pub struct OllamaClient {
    config: OllamaConfig,
    client: Client,
    batch_size: usize,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

impl OllamaClient {
    /// Create a new Ollama client from configuration
    pub fn new(config: OllamaConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Create a new Ollama client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(OllamaConfig::from_env()?)
    }

    /// Set how many texts go into one embedding request
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn default_generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            model_id: self.config.model.clone(),
            max_tokens: self.config.num_predict,
            temperature: self.config.temperature,
            stop_sequences: Vec::new(),
            timeout: self.config.timeout(),
        }
    }

    async fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.config.embedding_model,
            input: texts,
        };

        let response = self
            .client
            .post(self.config.endpoint("/api/embed"))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::EmbeddingUnavailable(format!(
                "embedding request failed with {}: {}",
                status, body
            )));
        }

        let data: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::EmbeddingUnavailable(format!("malformed embedding response: {}", e)))?;

        if data.embeddings.len() != texts.len() {
            return Err(Error::EmbeddingUnavailable(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                data.embeddings.len()
            )));
        }
        Ok(data.embeddings)
    }

    async fn perform_generation(&self, prompt: &str, config: &GenerationConfig) -> Result<GenerationResult> {
        let request = GenerateRequest {
            model: &config.model_id,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: config.temperature,
                num_predict: config.max_tokens,
                stop: config.stop_sequences.clone(),
            },
        };

        let response = self
            .client
            .post(self.config.endpoint("/api/generate"))
            .timeout(config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::GenerationFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::GenerationFailed(format!(
                "generation request failed with {}: {}",
                status, body
            )));
        }

        let data: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::GenerationFailed(format!("malformed generation response: {}", e)))?;

        Ok(GenerationResult {
            text: data.response,
            model_id: config.model_id.clone(),
            tokens_used: data.eval_count,
        })
    }

    /// Whether the server is up and lists `model` among its pulled models
    async fn model_health(&self, model: &str) -> ServiceHealth {
        let response = match self
            .client
            .get(self.config.endpoint("/api/tags"))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return ServiceHealth::Unavailable(format!("cannot reach Ollama: {}", e)),
        };

        if !response.status().is_success() {
            return ServiceHealth::Unavailable(format!("Ollama returned {}", response.status()));
        }

        match response.json::<TagsResponse>().await {
            Ok(tags) if tags.models.iter().any(|m| m.name.contains(model)) => ServiceHealth::Ready,
            Ok(_) => ServiceHealth::Unavailable(format!("model {} is not pulled", model)),
            Err(e) => ServiceHealth::Unavailable(format!("malformed model list: {}", e)),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaClient {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            debug!(size = batch.len(), model = %self.config.embedding_model, "embedding batch");
            vectors.extend(self.embed_chunk(batch).await?);
        }

        if let Some(first) = vectors.first() {
            let dimension = first.len();
            if dimension == 0 || vectors.iter().any(|v| v.len() != dimension) {
                return Err(Error::EmbeddingUnavailable(
                    "embedding service returned vectors of inconsistent dimension".to_string(),
                ));
            }
        }
        Ok(vectors)
    }

    async fn health(&self) -> ServiceHealth {
        self.model_health(&self.config.embedding_model).await
    }

    fn model_id(&self) -> &str {
        &self.config.embedding_model
    }
}

#[async_trait]
impl LLMProvider for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<GenerationResult> {
        let config = self.default_generation_config();
        self.generate_with_config(prompt, &config).await
    }

    async fn generate_with_config(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<GenerationResult> {
        let fut = self.perform_generation(prompt, config);
        match timeout(config.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(model = %config.model_id, timeout_secs = config.timeout.as_secs(), "generation timed out");
                Err(Error::GenerationFailed(format!(
                    "generation timed out after {:?}",
                    config.timeout
                )))
            }
        }
    }

    async fn health(&self) -> ServiceHealth {
        self.model_health(&self.config.model).await
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}
