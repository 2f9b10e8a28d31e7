//! Vector store trait

use async_trait::async_trait;

use crate::{IndexEntry, MetadataFilter, Result, ScoredEntry, ServiceHealth};

/// Trait for vector stores (local JSON-backed store, Qdrant)
///
/// The store is the only writer of its backing storage and must tolerate
/// concurrent callers. Distances are cosine distances.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace entries by id.
    ///
    /// Fails with `DimensionMismatch` if any vector disagrees with the index
    /// dimension; in that case nothing from the batch is written.
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<()>;

    /// Nearest neighbours of `vector`, best match first, at most `k`.
    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredEntry>>;

    /// Every stored entry
    async fn get_all(&self) -> Result<Vec<IndexEntry>>;

    /// Delete entries by id, returning how many existed
    async fn delete(&self, ids: &[String]) -> Result<usize>;

    /// Get the total number of entries
    async fn count(&self) -> Result<usize>;

    /// Check that the store can serve requests
    async fn health(&self) -> ServiceHealth;
}
