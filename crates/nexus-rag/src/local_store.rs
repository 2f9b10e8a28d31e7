//! Brute-force vector store persisted as a JSON file

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

use nexus_core::{
    Error, IndexEntry, MetadataFilter, Result, ScoredEntry, ServiceHealth, VectorStore,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreData {
    dimension: Option<usize>,
    entries: BTreeMap<String, IndexEntry>,
}

/// Local vector store: exact cosine search over an in-memory map.
///
/// When created with a path, every successful write replaces the file
/// atomically (write to a sibling temp file, then rename).
pub struct LocalVectorStore {
    path: Option<PathBuf>,
    data: RwLock<StoreData>,
}

impl LocalVectorStore {
    /// Open the store at `path`, loading existing entries if the file exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| {
                Error::IndexUnavailable(format!("cannot read {}: {}", path.display(), e))
            })?;
            serde_json::from_str(&content).map_err(|e| {
                Error::IndexUnavailable(format!("corrupt index file {}: {}", path.display(), e))
            })?
        } else {
            StoreData::default()
        };
        info!(path = %path.display(), entries = data.entries.len(), "opened local vector store");

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    /// A store that is never written to disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(StoreData::default()),
        }
    }

    /// Established vector dimension, if any entry was ever stored
    pub async fn dimension(&self) -> Option<usize> {
        self.data.read().await.dimension
    }

    async fn persist(&self, data: &StoreData) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let content = serde_json::to_string(data)?;
        let tmp = path.with_extension("json.tmp");
        let write = async {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            tokio::fs::write(&tmp, content).await?;
            tokio::fs::rename(&tmp, path).await
        };
        write.await.map_err(|e| {
            Error::IndexUnavailable(format!("cannot write {}: {}", path.display(), e))
        })
    }
}

/// Check every vector of a batch against the established dimension (or the batch's first vector).
fn batch_dimension(established: Option<usize>, entries: &[IndexEntry]) -> Result<Option<usize>> {
    let mut expected = established;
    for entry in entries {
        let actual = entry.vector.len();
        match expected {
            Some(dim) if dim != actual => {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    actual,
                });
            }
            Some(_) => {}
            None if actual == 0 => {
                return Err(Error::Validation(format!("entry {} has an empty vector", entry.id)));
            }
            None => expected = Some(actual),
        }
    }
    Ok(expected)
}

/// Cosine distance `1 - cos(a, b)`; zero vectors are treated as maximally distant.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut data = self.data.write().await;
        let dimension = batch_dimension(data.dimension, &entries)?;

        let previous = data.clone();
        let count = entries.len();
        data.dimension = dimension;
        for entry in entries {
            data.entries.insert(entry.id.clone(), entry);
        }

        if let Err(e) = self.persist(&data).await {
            *data = previous;
            return Err(e);
        }
        debug!(count, total = data.entries.len(), "upserted entries");
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredEntry>> {
        let data = self.data.read().await;
        if k == 0 || data.entries.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(dim) = data.dimension {
            if dim != vector.len() {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    actual: vector.len(),
                });
            }
        }

        let mut scored: Vec<ScoredEntry> = data
            .entries
            .values()
            .filter(|entry| filter.is_none_or(|f| f.matches(&entry.metadata)))
            .map(|entry| ScoredEntry {
                distance: cosine_distance(vector, &entry.vector),
                entry: entry.clone(),
            })
            .collect();

        // Stable sort keeps id order among equal distances.
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(k);
        Ok(scored)
    }

    async fn get_all(&self) -> Result<Vec<IndexEntry>> {
        Ok(self.data.read().await.entries.values().cloned().collect())
    }

    async fn delete(&self, ids: &[String]) -> Result<usize> {
        let mut data = self.data.write().await;
        let previous = data.clone();

        let removed = ids
            .iter()
            .filter(|id| data.entries.remove(id.as_str()).is_some())
            .count();
        if removed == 0 {
            return Ok(0);
        }

        if let Err(e) = self.persist(&data).await {
            *data = previous;
            return Err(e);
        }
        debug!(removed, "deleted entries");
        Ok(removed)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.data.read().await.entries.len())
    }

    async fn health(&self) -> ServiceHealth {
        match &self.path {
            Some(path) => match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() && parent.is_file() => {
                    ServiceHealth::Unavailable(format!("{} is not a directory", parent.display()))
                }
                _ => ServiceHealth::Ready,
            },
            None => ServiceHealth::Ready,
        }
    }
}
