//! Document indexer trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{ExtractedDocument, FileType, Result};

/// Result of an indexing operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexingResult {
    pub document_id: String,
    pub filename: String,
    pub file_type: FileType,
    pub total_pages: Option<u32>,
    pub total_chunks: usize,
}

/// Trait for document indexers
///
/// Indexing is all-or-nothing per document: either every chunk of the
/// document is stored or none is.
#[async_trait]
pub trait DocumentIndexer: Send + Sync {
    /// Index already-extracted content under `document_id`
    async fn index_document(
        &self,
        document_id: &str,
        document: ExtractedDocument,
    ) -> Result<IndexingResult>;

    /// Extract and index a local file under `document_id`
    async fn index_file(&self, document_id: &str, path: &Path) -> Result<IndexingResult>;

    /// Remove every chunk of a document, returning how many were removed
    async fn remove_document(&self, document_id: &str) -> Result<usize>;
}
