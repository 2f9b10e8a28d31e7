//! Embedding provider trait

use async_trait::async_trait;

use crate::{Error, Result, ServiceHealth};

/// Trait for embedding providers
///
/// `embed_batch` returns exactly one vector per input, in input order, all of the
/// model's fixed dimension. Any failure is reported as
/// [`Error::EmbeddingUnavailable`] and no partial result is returned.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed several texts
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::EmbeddingUnavailable("embedding service returned no vector".to_string()))
    }

    /// Check that the backend is reachable and the model is available
    async fn health(&self) -> ServiceHealth;

    /// Get the embedding model ID
    fn model_id(&self) -> &str;
}
