//! Retrieval-augmented generation pipeline for Campus Nexus
//!
//! This crate provides the chunker, the local and Qdrant vector stores, the
//! retriever, the answer composer, the document ingestor and the RAG engine.

mod chunker;
mod composer;
mod engine;
mod ingest;
mod local_store;
mod qdrant_store;
mod retriever;

#[cfg(test)]
mod test_support;

pub use chunker::TextChunker;
pub use composer::{AnswerComposer, build_prompt, confidence_score, format_sources};
pub use engine::{AskRequest, AskResponse, HealthReport, IndexedDocument, RagEngine};
pub use ingest::{Ingestor, entry_id};
pub use local_store::{LocalVectorStore, cosine_distance};
pub use qdrant_store::QdrantVectorStore;
pub use retriever::{Retriever, build_context};

// Re-export core types for convenience
pub use nexus_core::{
    AnswerResult, DocumentIndexer, EmbeddingProvider, Error, IndexingResult, LLMProvider,
    Language, MetadataFilter, RagConfig, Result, RetrievedDocument, SourceRef, VectorStore,
};
