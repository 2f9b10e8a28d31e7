//! Error types for Campus Nexus

use thiserror::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// How a caller should react to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// A backing service is not reachable or not ready yet; the caller may retry later.
    NotReady,
    /// The request or the configuration is wrong; retrying will not help.
    Fatal,
}

/// Core error types for the Campus Nexus system
#[derive(Error, Debug)]
pub enum Error {
    #[error("Embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Answer generation failed: {0}")]
    GenerationFailed(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify the error for the caller.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::EmbeddingUnavailable(_)
            | Error::IndexUnavailable(_)
            | Error::GenerationFailed(_) => ErrorClass::NotReady,
            _ => ErrorClass::Fatal,
        }
    }

    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::NotReady
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
