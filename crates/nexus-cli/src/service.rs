//! Knowledge service: wires extraction, indexing, answering and governance

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use nexus_core::{
    DocumentIndexer, EmbeddingProvider, Error, FileType, IndexingResult, LLMProvider, RagConfig,
    Result, StoreBackend, StoreConfig, VectorStore,
};
use nexus_extract::default_extractors;
use nexus_ollama::OllamaClient;
use nexus_rag::{
    AskRequest, AskResponse, HealthReport, IndexedDocument, Ingestor, LocalVectorStore,
    QdrantVectorStore, RagEngine, TextChunker,
};

use crate::governance::{
    DocumentUpload, GovernanceLedger, GovernanceRecord, GovernanceStats, LedgerDocument, checksum,
};

/// Everything the command line can do, behind one handle
pub struct KnowledgeService {
    engine: RagEngine,
    ingestor: Ingestor,
    ledger: Mutex<GovernanceLedger>,
    /// Checksums of uploads still being indexed
    in_flight: Mutex<HashSet<String>>,
}

impl KnowledgeService {
    /// Build the service from environment configuration
    pub async fn from_env() -> Result<Self> {
        let rag = RagConfig::from_env()?;
        let store_config = StoreConfig::from_env()?;
        let ollama = Arc::new(OllamaClient::from_env()?.with_batch_size(rag.embed_batch_size));

        let store: Arc<dyn VectorStore> = match store_config.backend {
            StoreBackend::Local => Arc::new(LocalVectorStore::open(store_config.index_path())?),
            StoreBackend::Qdrant => Arc::new(
                QdrantVectorStore::connect(&store_config.qdrant_url, &store_config.collection).await?,
            ),
        };
        let ledger = GovernanceLedger::open(store_config.ledger_path()).await?;

        Self::new(ollama.clone(), store, ollama, rag, ledger)
    }

    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LLMProvider>,
        config: RagConfig,
        ledger: GovernanceLedger,
    ) -> Result<Self> {
        let chunker = TextChunker::from_config(&config)?;
        let ingestor = Ingestor::new(embedder.clone(), store.clone(), chunker)
            .with_extractors(default_extractors()?);
        let engine = RagEngine::new(embedder, store, llm, config);

        Ok(Self {
            engine,
            ingestor,
            ledger: Mutex::new(ledger),
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    pub fn config(&self) -> &RagConfig {
        self.engine.config()
    }

    pub fn supported_types(&self) -> Vec<FileType> {
        self.ingestor.supported_types()
    }

    /// Index a file and register it for approval.
    ///
    /// Content already in the ledger, or being uploaded concurrently, is
    /// refused unless `allow_duplicates` is set. A failed registration
    /// removes the indexed chunks again.
    pub async fn ingest(&self, path: &Path, uploader: &str, allow_duplicates: bool) -> Result<IndexingResult> {
        let file_type = FileType::from_path(path)?;
        let bytes = tokio::fs::read(path).await?;
        let upload = DocumentUpload {
            filename: String::new(),
            file_type: file_type.extension().to_string(),
            uploader: uploader.to_string(),
            checksum: checksum(&bytes),
            size_bytes: bytes.len() as u64,
            total_chunks: 0,
        };

        if allow_duplicates {
            return self.index_and_register(path, upload).await;
        }

        let digest = upload.checksum.clone();
        self.reserve(path, &digest).await?;
        let result = self.index_and_register(path, upload).await;
        self.in_flight.lock().await.remove(&digest);
        result
    }

    /// Claim `digest` for one upload at a time
    async fn reserve(&self, path: &Path, digest: &str) -> Result<()> {
        let ledger = self.ledger.lock().await;
        let mut in_flight = self.in_flight.lock().await;

        if let Some(existing) = ledger.find_by_checksum(digest) {
            return Err(Error::Validation(format!(
                "{} was already uploaded as document {}",
                path.display(),
                existing
            )));
        }
        if !in_flight.insert(digest.to_string()) {
            return Err(Error::Validation(format!(
                "{} is already being uploaded",
                path.display()
            )));
        }
        Ok(())
    }

    async fn index_and_register(&self, path: &Path, mut upload: DocumentUpload) -> Result<IndexingResult> {
        let document_id = Uuid::new_v4().to_string();
        let result = self.ingestor.index_file(&document_id, path).await?;
        upload.filename = result.filename.clone();
        upload.total_chunks = result.total_chunks;

        let registered = self
            .ledger
            .lock()
            .await
            .register(&document_id, upload)
            .await
            .map(|_| ());
        if let Err(e) = registered {
            if let Err(undo) = self.ingestor.remove_document(&document_id).await {
                warn!(document_id, error = %undo, "could not remove chunks of unregistered document");
            }
            return Err(e);
        }
        Ok(result)
    }

    /// Answer a question on behalf of `user`
    pub async fn ask(&self, request: &AskRequest, user: &str) -> Result<AskResponse> {
        if !request.query.trim().is_empty() {
            self.ledger.lock().await.log_query(&request.query, user).await?;
        }
        self.engine.ask(request).await
    }

    /// Remove a document from the index and the ledger, returning the chunks removed
    pub async fn delete(&self, document_id: &str) -> Result<usize> {
        let removed = self.ingestor.remove_document(document_id).await?;

        let registered = match self.ledger.lock().await.remove(document_id).await {
            Ok(_) => true,
            Err(Error::NotFound(_)) => false,
            Err(e) => return Err(e),
        };
        if removed == 0 && !registered {
            return Err(Error::NotFound(format!("document {}", document_id)));
        }
        if !registered {
            warn!(document_id, "deleted document had no governance record");
        }

        info!(document_id, removed, "deleted document");
        Ok(removed)
    }

    pub async fn health(&self) -> HealthReport {
        self.engine.health().await
    }

    pub async fn documents(&self) -> Result<Vec<IndexedDocument>> {
        self.engine.documents().await
    }

    pub async fn stats(&self) -> Result<serde_json::Value> {
        self.engine.stats().await
    }

    pub async fn governance_stats(&self) -> GovernanceStats {
        self.ledger.lock().await.statistics()
    }

    pub async fn pending_documents(&self) -> Vec<LedgerDocument> {
        self.ledger.lock().await.pending()
    }

    pub async fn approve(&self, document_id: &str, approver: &str) -> Result<GovernanceRecord> {
        self.ledger.lock().await.approve(document_id, approver).await.cloned()
    }

    pub async fn reject(&self, document_id: &str, reason: Option<&str>, approver: &str) -> Result<GovernanceRecord> {
        self.ledger.lock().await.reject(document_id, reason, approver).await.cloned()
    }
}
