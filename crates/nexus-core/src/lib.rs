//! Core traits and types for Campus Nexus
//!
//! This crate defines the fundamental traits and types used across the Nexus system.
//! It provides capability-facing interfaces for LLM providers, embedding providers,
//! vector stores, document extractors and indexers, so that every gateway can be
//! replaced by a test double.

pub mod config;
pub mod document_indexer;
pub mod embedding;
pub mod error;
pub mod extractor;
pub mod language;
pub mod llm;
pub mod types;
pub mod vector_store;

#[cfg(test)]
mod tests;

pub use config::{RagConfig, StoreBackend, StoreConfig};
pub use document_indexer::{DocumentIndexer, IndexingResult};
pub use embedding::EmbeddingProvider;
pub use error::{Error, ErrorClass, Result};
pub use extractor::{DocumentExtractor, ExtractedDocument, ExtractedSegment, FileType};
pub use language::Language;
pub use llm::{GenerationConfig, GenerationResult, LLMProvider};
pub use types::*;
pub use vector_store::VectorStore;
