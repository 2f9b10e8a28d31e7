//! Document ingestion: extraction, chunking, embedding and indexing

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use nexus_core::{
    DocumentExtractor, DocumentIndexer, EmbeddedChunk, EmbeddingProvider, Error,
    ExtractedDocument, FileType, IndexingResult, Metadata, MetadataValue, Result, VectorStore,
    keys,
};

use crate::chunker::TextChunker;

/// Id of the index entry holding chunk `index` of a document
pub fn entry_id(document_id: &str, index: usize) -> String {
    format!("{}_{}", document_id, index)
}

/// Turns documents into index entries.
///
/// Each document is committed with a single upsert, so a failure at any stage
/// leaves the index untouched.
pub struct Ingestor<E: ?Sized = dyn EmbeddingProvider, V: ?Sized = dyn VectorStore> {
    embedder: Arc<E>,
    store: Arc<V>,
    chunker: TextChunker,
    extractors: HashMap<FileType, Arc<dyn DocumentExtractor>>,
}

impl<E, V> Ingestor<E, V>
where
    E: EmbeddingProvider + ?Sized,
    V: VectorStore + ?Sized,
{
    pub fn new(embedder: Arc<E>, store: Arc<V>, chunker: TextChunker) -> Self {
        Self {
            embedder,
            store,
            chunker,
            extractors: HashMap::new(),
        }
    }

    /// Register an extractor for its file type, replacing any previous one
    pub fn with_extractor(mut self, extractor: Arc<dyn DocumentExtractor>) -> Self {
        self.extractors.insert(extractor.file_type(), extractor);
        self
    }

    pub fn with_extractors(self, extractors: impl IntoIterator<Item = Arc<dyn DocumentExtractor>>) -> Self {
        extractors
            .into_iter()
            .fold(self, |ingestor, extractor| ingestor.with_extractor(extractor))
    }

    /// File types that can be ingested
    pub fn supported_types(&self) -> Vec<FileType> {
        FileType::all()
            .into_iter()
            .filter(|t| self.extractors.contains_key(t))
            .collect()
    }

    fn extractor_for(&self, path: &Path) -> Result<Arc<dyn DocumentExtractor>> {
        let file_type = FileType::from_path(path)?;
        self.extractors.get(&file_type).cloned().ok_or_else(|| {
            let supported: Vec<&str> = self.supported_types().iter().map(|t| t.extension()).collect();
            Error::Validation(format!(
                "Unsupported file type '{}'. Supported: {}",
                file_type,
                supported.join(", ")
            ))
        })
    }

    async fn embed_chunks(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(Error::EmbeddingUnavailable(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }
}

fn chunk_metadata(
    document_id: &str,
    document: &ExtractedDocument,
    chunk_index: usize,
    page: Option<u32>,
) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(keys::FILENAME.to_string(), MetadataValue::from(document.filename.as_str()));
    metadata.insert(
        keys::FILE_TYPE.to_string(),
        MetadataValue::from(document.file_type.extension()),
    );
    if let Some(page) = page {
        metadata.insert(keys::PAGE.to_string(), MetadataValue::from(page));
    }
    if let Some(total) = document.total_pages {
        metadata.insert(keys::TOTAL_PAGES.to_string(), MetadataValue::from(total));
    }
    metadata.insert(keys::DOCUMENT_ID.to_string(), MetadataValue::from(document_id));
    metadata.insert(keys::CHUNK_INDEX.to_string(), MetadataValue::from(chunk_index));
    metadata
}

#[async_trait]
impl<E, V> DocumentIndexer for Ingestor<E, V>
where
    E: EmbeddingProvider + ?Sized,
    V: VectorStore + ?Sized,
{
    async fn index_document(
        &self,
        document_id: &str,
        document: ExtractedDocument,
    ) -> Result<IndexingResult> {
        if document_id.trim().is_empty() {
            return Err(Error::Validation("document id must not be empty".to_string()));
        }
        if document.is_blank() {
            return Err(Error::ExtractionFailed(format!(
                "{} contains no extractable text",
                document.filename
            )));
        }

        let chunks = self.chunker.chunk_document(document_id, &document);
        debug!(document_id, chunks = chunks.len(), "chunked document");

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embed_chunks(texts).await?;

        let entries: Vec<_> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                let index = chunk.sequence_index;
                let metadata = chunk_metadata(document_id, &document, index, chunk.page);
                EmbeddedChunk { chunk, vector }.into_entry(entry_id(document_id, index), metadata)
            })
            .collect();
        let total_chunks = entries.len();

        self.store.upsert(entries).await?;
        info!(
            document_id,
            filename = %document.filename,
            total_chunks,
            "indexed document"
        );

        Ok(IndexingResult {
            document_id: document_id.to_string(),
            filename: document.filename,
            file_type: document.file_type,
            total_pages: document.total_pages,
            total_chunks,
        })
    }

    async fn index_file(&self, document_id: &str, path: &Path) -> Result<IndexingResult> {
        let extractor = self.extractor_for(path)?;
        let owned_path = path.to_path_buf();

        let document = tokio::task::spawn_blocking(move || extractor.extract(&owned_path))
            .await
            .map_err(|e| Error::ExtractionFailed(format!("extraction task failed: {}", e)))??;

        self.index_document(document_id, document).await
    }

    async fn remove_document(&self, document_id: &str) -> Result<usize> {
        let ids: Vec<String> = self
            .store
            .get_all()
            .await?
            .into_iter()
            .filter(|entry| {
                entry
                    .metadata
                    .get(keys::DOCUMENT_ID)
                    .and_then(MetadataValue::as_str)
                    == Some(document_id)
            })
            .map(|entry| entry.id)
            .collect();

        if ids.is_empty() {
            return Ok(0);
        }
        let removed = self.store.delete(&ids).await?;
        info!(document_id, removed, "removed document from index");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LocalVectorStore;
    use crate::test_support::{DownEmbedder, FixedEmbedder};
    use nexus_core::ExtractedSegment;

    struct StaticExtractor {
        file_type: FileType,
        segments: Vec<(&'static str, Option<u32>)>,
    }

    impl DocumentExtractor for StaticExtractor {
        fn file_type(&self) -> FileType {
            self.file_type
        }

        fn extract(&self, path: &Path) -> Result<ExtractedDocument> {
            Ok(ExtractedDocument {
                filename: path.file_name().unwrap().to_string_lossy().to_string(),
                file_type: self.file_type,
                segments: self
                    .segments
                    .iter()
                    .map(|(text, page)| ExtractedSegment {
                        text: text.to_string(),
                        page: *page,
                    })
                    .collect(),
                total_pages: Some(self.segments.len() as u32),
            })
        }
    }

    fn ingestor(store: Arc<LocalVectorStore>) -> Ingestor {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(FixedEmbedder::new(vec![1.0, 0.0, 0.0]));
        let store: Arc<dyn VectorStore> = store;
        Ingestor::new(embedder, store, TextChunker::new(40, 10).unwrap())
    }

    #[tokio::test]
    async fn test_index_document_writes_metadata() {
        let store = Arc::new(LocalVectorStore::in_memory());
        let ingestor = ingestor(store.clone());

        let document = ExtractedDocument::from_text(
            "handbook.txt",
            FileType::Txt,
            "The library opens at nine. It closes at six on weekdays. Weekends are shorter.",
        );
        let result = ingestor.index_document("doc1", document).await.unwrap();

        assert_eq!(result.filename, "handbook.txt");
        assert!(result.total_chunks >= 2);
        assert_eq!(store.count().await.unwrap(), result.total_chunks);

        let entries = store.get_all().await.unwrap();
        let first = entries.iter().find(|e| e.id == "doc1_0").unwrap();
        assert_eq!(first.metadata[keys::FILENAME], MetadataValue::from("handbook.txt"));
        assert_eq!(first.metadata[keys::FILE_TYPE], MetadataValue::from("txt"));
        assert_eq!(first.metadata[keys::DOCUMENT_ID], MetadataValue::from("doc1"));
        assert_eq!(first.metadata[keys::CHUNK_INDEX], MetadataValue::Integer(0));
        assert!(!first.metadata.contains_key(keys::PAGE));
    }

    #[tokio::test]
    async fn test_blank_document_is_extraction_failure() {
        let store = Arc::new(LocalVectorStore::in_memory());
        let ingestor = ingestor(store.clone());

        let err = ingestor
            .index_document("doc1", ExtractedDocument::from_text("empty.txt", FileType::Txt, " \n "))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ExtractionFailed(_)));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_embedding_failure_commits_nothing() {
        let store = Arc::new(LocalVectorStore::in_memory());
        let ingestor = Ingestor::new(Arc::new(DownEmbedder), store.clone(), TextChunker::default());

        let err = ingestor
            .index_document("doc1", ExtractedDocument::from_text("a.txt", FileType::Txt, "Some text."))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmbeddingUnavailable(_)));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_index_file_uses_registered_extractor() {
        let store = Arc::new(LocalVectorStore::in_memory());
        let ingestor = ingestor(store.clone()).with_extractor(Arc::new(StaticExtractor {
            file_type: FileType::Pdf,
            segments: vec![("Page one text.", Some(1)), ("Page two text.", Some(2))],
        }));

        let result = ingestor
            .index_file("lecture", Path::new("/uploads/lecture.pdf"))
            .await
            .unwrap();
        assert_eq!(result.total_chunks, 2);
        assert_eq!(result.total_pages, Some(2));

        let entries = store.get_all().await.unwrap();
        let second = entries.iter().find(|e| e.id == "lecture_1").unwrap();
        assert_eq!(second.metadata[keys::PAGE], MetadataValue::Integer(2));
        assert_eq!(second.metadata[keys::TOTAL_PAGES], MetadataValue::Integer(2));
    }

    #[tokio::test]
    async fn test_index_file_rejects_unregistered_type() {
        let ingestor = ingestor(Arc::new(LocalVectorStore::in_memory()));
        let err = ingestor
            .index_file("x", Path::new("slides.pptx"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = ingestor.index_file("x", Path::new("song.mp3")).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_remove_document_only_touches_its_chunks() {
        let store = Arc::new(LocalVectorStore::in_memory());
        let ingestor = ingestor(store.clone());

        ingestor
            .index_document("keep", ExtractedDocument::from_text("a.txt", FileType::Txt, "Keep me."))
            .await
            .unwrap();
        ingestor
            .index_document("drop", ExtractedDocument::from_text("b.txt", FileType::Txt, "Drop me."))
            .await
            .unwrap();

        assert_eq!(ingestor.remove_document("drop").await.unwrap(), 1);
        assert_eq!(ingestor.remove_document("drop").await.unwrap(), 0);
        let remaining = store.get_all().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "keep_0");
    }
}
