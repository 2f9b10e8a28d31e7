//! In-process doubles for the gateway traits

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use nexus_core::{
    EmbeddingProvider, Error, GenerationConfig, GenerationResult, LLMProvider, Metadata,
    MetadataValue, Result, RetrievedDocument, ServiceHealth,
};

pub fn doc(text: &str, filename: Option<&str>, page: Option<i64>, score: f32) -> RetrievedDocument {
    let mut metadata = Metadata::new();
    if let Some(filename) = filename {
        metadata.insert("filename".to_string(), MetadataValue::from(filename));
    }
    if let Some(page) = page {
        metadata.insert("page".to_string(), MetadataValue::from(page));
    }
    RetrievedDocument {
        text: text.to_string(),
        metadata,
        relevance_score: score,
    }
}

/// Returns the same vector for every input.
pub struct FixedEmbedder {
    vector: Vec<f32>,
    pub calls: AtomicUsize,
}

impl FixedEmbedder {
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            vector,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|_| self.vector.clone()).collect())
    }

    async fn health(&self) -> ServiceHealth {
        ServiceHealth::Ready
    }

    fn model_id(&self) -> &str {
        "fixed"
    }
}

/// Counts keyword occurrences, one dimension per keyword plus a bias term.
pub struct KeywordEmbedder {
    keywords: Vec<&'static str>,
}

impl KeywordEmbedder {
    pub fn new(keywords: &[&'static str]) -> Self {
        Self {
            keywords: keywords.to_vec(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                let mut vector: Vec<f32> = self
                    .keywords
                    .iter()
                    .map(|k| lower.matches(k).count() as f32)
                    .collect();
                vector.push(0.01);
                vector
            })
            .collect())
    }

    async fn health(&self) -> ServiceHealth {
        ServiceHealth::Ready
    }

    fn model_id(&self) -> &str {
        "keywords"
    }
}

/// Always fails, like an unreachable embedding service.
pub struct DownEmbedder;

#[async_trait]
impl EmbeddingProvider for DownEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(Error::EmbeddingUnavailable("connection refused".to_string()))
    }

    async fn health(&self) -> ServiceHealth {
        ServiceHealth::Unavailable("connection refused".to_string())
    }

    fn model_id(&self) -> &str {
        "down"
    }
}

/// Replies with a fixed text (or error) and records every prompt.
pub struct ScriptedLlm {
    reply: std::result::Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            reply: Err(reason.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedLlm {
    async fn generate(&self, prompt: &str) -> Result<GenerationResult> {
        self.generate_with_config(prompt, &GenerationConfig::default()).await
    }

    async fn generate_with_config(
        &self,
        prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<GenerationResult> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Ok(text) => Ok(GenerationResult {
                text: text.clone(),
                model_id: "scripted".to_string(),
                tokens_used: None,
            }),
            Err(reason) => Err(Error::GenerationFailed(reason.clone())),
        }
    }

    async fn health(&self) -> ServiceHealth {
        match &self.reply {
            Ok(_) => ServiceHealth::Ready,
            Err(reason) => ServiceHealth::Unavailable(reason.clone()),
        }
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}
