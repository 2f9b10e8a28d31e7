//! RAG engine: the query pipeline plus health and index statistics

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use nexus_core::{
    AnswerResult, EmbeddingProvider, LLMProvider, Language, MetadataFilter, MetadataValue,
    RagConfig, Result, ServiceHealth, VectorStore, keys,
};

use crate::composer::AnswerComposer;
use crate::retriever::{Retriever, build_context};

/// A question for the knowledge base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskRequest {
    pub query: String,
    pub language: Language,
    /// Falls back to the configured `top_k` when unset
    pub top_k: Option<usize>,
    pub include_sources: bool,
    pub filter: Option<MetadataFilter>,
}

impl AskRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            language: Language::default(),
            top_k: None,
            include_sources: true,
            filter: None,
        }
    }

    pub fn language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn include_sources(mut self, include: bool) -> Self {
        self.include_sources = include;
        self
    }

    pub fn filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// An answer together with how long the pipeline took
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    #[serde(flatten)]
    pub result: AnswerResult,
    pub processing_time_secs: f64,
}

/// Readiness of every backing service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub llm: ServiceHealth,
    pub embedding: ServiceHealth,
    pub index: ServiceHealth,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.llm.is_ready() && self.embedding.is_ready() && self.index.is_ready()
    }

    /// `healthy` when every service is ready, otherwise `degraded`
    pub fn status(&self) -> &'static str {
        if self.is_healthy() { "healthy" } else { "degraded" }
    }
}

/// One ingested document as seen from the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub document_id: String,
    pub filename: String,
    pub file_type: String,
    pub total_pages: Option<i64>,
    pub chunks: usize,
}

/// Query pipeline over injected gateways
pub struct RagEngine {
    retriever: Retriever,
    composer: AnswerComposer,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LLMProvider>,
    store: Arc<dyn VectorStore>,
    config: RagConfig,
}

impl RagEngine {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LLMProvider>,
        config: RagConfig,
    ) -> Self {
        Self {
            retriever: Retriever::new(embedder.clone(), store.clone()),
            composer: AnswerComposer::new(llm.clone()),
            embedder,
            llm,
            store,
            config,
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Answer a question: retrieve, window the context, then compose.
    pub async fn ask(&self, request: &AskRequest) -> Result<AskResponse> {
        let started = Instant::now();
        let top_k = request.top_k.unwrap_or(self.config.top_k);

        let docs = self
            .retriever
            .retrieve(&request.query, top_k, request.filter.as_ref())
            .await?;
        let context = build_context(&docs, self.config.max_context_chars);

        let mut result = self
            .composer
            .compose(&request.query, &context, request.language, &docs)
            .await?;
        if !request.include_sources {
            result.sources.clear();
        }

        let processing_time_secs = started.elapsed().as_secs_f64();
        info!(
            retrieved = docs.len(),
            language = request.language.code(),
            confidence = result.confidence_score,
            processing_time_secs,
            "answered query"
        );

        Ok(AskResponse {
            result,
            processing_time_secs,
        })
    }

    /// Check every backing service
    pub async fn health(&self) -> HealthReport {
        let report = HealthReport {
            llm: self.llm.health().await,
            embedding: self.embedder.health().await,
            index: self.store.health().await,
        };
        if !report.is_healthy() {
            warn!(?report, "system degraded");
        }
        report
    }

    /// Documents present in the index, ordered by document id
    pub async fn documents(&self) -> Result<Vec<IndexedDocument>> {
        let mut documents: BTreeMap<String, IndexedDocument> = BTreeMap::new();

        for entry in self.store.get_all().await? {
            let text = |key: &str| {
                entry
                    .metadata
                    .get(key)
                    .and_then(MetadataValue::as_str)
                    .map(str::to_string)
            };
            let Some(document_id) = text(keys::DOCUMENT_ID) else {
                continue;
            };
            let filename = text(keys::FILENAME).unwrap_or_else(|| "Unknown".to_string());
            let file_type = text(keys::FILE_TYPE).unwrap_or_default();
            let total_pages = entry.metadata.get(keys::TOTAL_PAGES).and_then(MetadataValue::as_i64);

            documents
                .entry(document_id.clone())
                .or_insert_with(|| IndexedDocument {
                    document_id,
                    filename,
                    file_type,
                    total_pages,
                    chunks: 0,
                })
                .chunks += 1;
        }

        Ok(documents.into_values().collect())
    }

    /// Index statistics and pipeline settings
    pub async fn stats(&self) -> Result<serde_json::Value> {
        let total_chunks = self.store.count().await?;
        let documents = self.documents().await?;

        Ok(json!({
            "total_documents": documents.len(),
            "total_chunks": total_chunks,
            "embedding_model": self.embedder.model_id(),
            "llm_model": self.llm.model_id(),
            "chunk_size": self.config.chunk_size,
            "chunk_overlap": self.config.chunk_overlap,
            "top_k": self.config.top_k,
            "max_context_chars": self.config.max_context_chars,
        }))
    }
}
