//! Query-time retrieval and context windowing

use std::sync::Arc;
use tracing::debug;

use nexus_core::{
    EmbeddingProvider, Error, MetadataFilter, Result, RetrievedDocument, VectorStore,
};

/// Embeds a query and looks up its nearest chunks.
pub struct Retriever<E: ?Sized = dyn EmbeddingProvider, V: ?Sized = dyn VectorStore> {
    embedder: Arc<E>,
    store: Arc<V>,
}

impl<E, V> Retriever<E, V>
where
    E: EmbeddingProvider + ?Sized,
    V: VectorStore + ?Sized,
{
    pub fn new(embedder: Arc<E>, store: Arc<V>) -> Self {
        Self { embedder, store }
    }

    /// Retrieve up to `top_k` documents for `query`, best match first.
    ///
    /// An index with no matches yields an empty list, not an error.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<RetrievedDocument>> {
        if query.trim().is_empty() {
            return Err(Error::Validation("query must not be empty".to_string()));
        }
        if top_k == 0 {
            return Err(Error::Validation("top_k must be at least 1".to_string()));
        }

        let vector = self.embedder.embed(query).await?;
        let scored = self.store.query(&vector, top_k, filter).await?;
        debug!(top_k, matches = scored.len(), "retrieved documents");

        Ok(scored.into_iter().map(RetrievedDocument::from_scored).collect())
    }
}

/// Format one context block.
fn context_block(index: usize, doc: &RetrievedDocument) -> String {
    let page_info = match doc.page() {
        Some(page) if page != 0 => format!(" (Page {})", page),
        _ => String::new(),
    };
    format!(
        "[Source {}: {}{}]\n{}\n\n",
        index,
        doc.filename(),
        page_info,
        doc.text
    )
}

/// Concatenate documents into a context string of at most `max_chars` characters.
///
/// Blocks are never truncated: the first block that would overflow the budget
/// ends the context, and source numbering only counts included blocks.
pub fn build_context(docs: &[RetrievedDocument], max_chars: usize) -> String {
    let mut context = String::new();
    let mut length = 0;

    for (i, doc) in docs.iter().enumerate() {
        let block = context_block(i + 1, doc);
        let block_len = block.chars().count();
        if length + block_len > max_chars {
            break;
        }
        context.push_str(&block);
        length += block_len;
    }

    context
}
