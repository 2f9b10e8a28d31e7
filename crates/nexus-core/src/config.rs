//! Retrieval and storage configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::{Error, Result};

/// Parse an optional variable, falling back to `default` when unset.
pub fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| Error::Configuration(format!("{} has an invalid value: {}", key, raw))),
        _ => Ok(default),
    }
}

/// Chunking and retrieval parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub max_context_chars: usize,
    pub embed_batch_size: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
            max_context_chars: 4000,
            embed_batch_size: 32,
        }
    }
}

impl RagConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            chunk_size: parse_var(&lookup, "NEXUS_CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: parse_var(&lookup, "NEXUS_CHUNK_OVERLAP", defaults.chunk_overlap)?,
            top_k: parse_var(&lookup, "NEXUS_TOP_K", defaults.top_k)?,
            max_context_chars: parse_var(&lookup, "NEXUS_MAX_CONTEXT_CHARS", defaults.max_context_chars)?,
            embed_batch_size: parse_var(&lookup, "NEXUS_EMBED_BATCH_SIZE", defaults.embed_batch_size)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Configuration("chunk size must be positive".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::Configuration(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(Error::Configuration("top_k must be positive".to_string()));
        }
        if self.embed_batch_size == 0 {
            return Err(Error::Configuration("embedding batch size must be positive".to_string()));
        }
        Ok(())
    }
}

/// Vector index backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Local,
    Qdrant,
}

impl FromStr for StoreBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(StoreBackend::Local),
            "qdrant" => Ok(StoreBackend::Qdrant),
            other => Err(Error::Configuration(format!(
                "unknown vector backend '{}', expected local or qdrant",
                other
            ))),
        }
    }
}

/// Where indexed data and the governance ledger live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub backend: StoreBackend,
    pub collection: String,
    pub qdrant_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            backend: StoreBackend::Local,
            collection: "campus_documents".to_string(),
            qdrant_url: "http://localhost:6334".to_string(),
        }
    }
}

impl StoreConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let backend = match lookup("NEXUS_VECTOR_BACKEND") {
            Some(raw) => raw.parse()?,
            None => defaults.backend,
        };
        let collection = lookup("NEXUS_COLLECTION").unwrap_or(defaults.collection);
        if collection.trim().is_empty() {
            return Err(Error::Configuration("NEXUS_COLLECTION must not be empty".to_string()));
        }

        Ok(Self {
            data_dir: lookup("NEXUS_DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            backend,
            collection,
            qdrant_url: lookup("QDRANT_URL").unwrap_or(defaults.qdrant_url),
        })
    }

    /// File backing the local vector store
    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", self.collection))
    }

    /// File backing the governance ledger
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("governance.json")
    }
}
