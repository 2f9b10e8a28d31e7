//! Ollama integration for Campus Nexus
//!
//! This crate provides the Ollama implementation of both the LLMProvider and
//! EmbeddingProvider traits.

mod client;
mod config;


pub use client::OllamaClient;
pub use config::OllamaConfig;

// Re-export core types for convenience
pub use nexus_core::{
    EmbeddingProvider, Error, GenerationConfig, GenerationResult, LLMProvider, Result,
    ServiceHealth,
};
