//! Grounded prompt construction, generation and confidence scoring

use std::sync::Arc;
use tracing::{debug, info};

use nexus_core::{
    AnswerResult, Error, GenerationConfig, LLMProvider, Language, Result, RetrievedDocument,
    SourceRef,
};

/// Phrases that signal the model could not answer from the context.
const UNCERTAINTY_PHRASES: [&str; 5] = [
    "i don't know",
    "not enough information",
    "cannot answer",
    "unclear",
    "insufficient data",
];

/// Characters of chunk text shown in a source preview.
const PREVIEW_CHARS: usize = 200;

/// Build the grounded prompt sent to the language model.
pub fn build_prompt(query: &str, context: &str, language: Language) -> String {
    let language_instruction = language
        .prompt_instruction()
        .map(|instruction| format!("\n\n{}", instruction))
        .unwrap_or_default();

    format!(
        "You are an expert academic AI assistant for a smart campus knowledge system.
Your role is to provide accurate, well-structured answers based on the provided context.

CONTEXT FROM DOCUMENTS:
{context}

USER QUESTION:
{query}

INSTRUCTIONS:
1. Answer the question using ONLY the information from the provided context
2. If the context doesn't contain enough information, clearly state that
3. Structure your answer clearly with proper formatting
4. Cite sources by mentioning the document names
5. Be concise but comprehensive
6. Use academic language appropriate for college students and faculty{language_instruction}

ANSWER:"
    )
}

/// Heuristic confidence in `[0, 1]` from retrieval quality and answer shape.
///
/// All adjustments go into one running value that is clamped once at the end.
pub fn confidence_score(answer: &str, docs: &[RetrievedDocument]) -> f32 {
    let mut confidence: f32 = 0.5;

    if !docs.is_empty() {
        confidence += match docs.len() {
            n if n >= 3 => 0.15,
            2 => 0.10,
            _ => 0.05,
        };
        let mean_relevance =
            docs.iter().map(|d| d.relevance_score).sum::<f32>() / docs.len() as f32;
        confidence += mean_relevance * 0.2;
    }

    let lower = answer.to_lowercase();
    if UNCERTAINTY_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        confidence -= 0.2;
    }
    if lower.contains("source") || lower.contains("document") {
        confidence += 0.05;
    }

    let words = answer.split_whitespace().count();
    if (50..=500).contains(&words) {
        confidence += 0.1;
    } else if words < 20 {
        confidence -= 0.1;
    }

    if confidence.is_nan() {
        return 0.0;
    }
    confidence.clamp(0.0, 1.0)
}

/// One source reference per document, in input order.
pub fn format_sources(docs: &[RetrievedDocument]) -> Vec<SourceRef> {
    docs.iter()
        .map(|doc| {
            let mut preview: String = doc.text.chars().take(PREVIEW_CHARS).collect();
            preview.push_str("...");
            SourceRef {
                filename: doc.filename().to_string(),
                page: doc.page(),
                chunk_text: preview,
                relevance_score: doc.relevance_score,
            }
        })
        .collect()
}

/// Asks the language model for an answer grounded in retrieved context.
pub struct AnswerComposer<L: ?Sized = dyn LLMProvider> {
    llm: Arc<L>,
    generation: Option<GenerationConfig>,
}

impl<L: LLMProvider + ?Sized> AnswerComposer<L> {
    pub fn new(llm: Arc<L>) -> Self {
        Self {
            llm,
            generation: None,
        }
    }

    /// Use an explicit generation configuration instead of the provider default
    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.generation = Some(config);
        self
    }

    /// Compose an answer for `query` from `context` and the documents it was built from.
    ///
    /// With no documents the model is not consulted: the answer says that nothing
    /// relevant was found, with zero confidence.
    pub async fn compose(
        &self,
        query: &str,
        context: &str,
        language: Language,
        docs: &[RetrievedDocument],
    ) -> Result<AnswerResult> {
        if docs.is_empty() {
            info!("no relevant documents, skipping generation");
            return Ok(AnswerResult {
                answer: language.no_knowledge_message().to_string(),
                sources: Vec::new(),
                confidence_score: 0.0,
                language,
            });
        }

        let prompt = build_prompt(query, context, language);
        debug!(prompt_chars = prompt.chars().count(), model = self.llm.model_id(), "generating answer");

        let generated = match &self.generation {
            Some(config) => self.llm.generate_with_config(&prompt, config).await,
            None => self.llm.generate(&prompt).await,
        }
        .map_err(|e| match e {
            Error::GenerationFailed(_) => e,
            other => Error::GenerationFailed(other.to_string()),
        })?;

        let answer = generated.text.trim().to_string();
        let confidence_score = confidence_score(&answer, docs);

        Ok(AnswerResult {
            answer,
            sources: format_sources(docs),
            confidence_score,
            language,
        })
    }
}
