//! Common types used across the Campus Nexus system

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::language::Language;

/// Metadata keys written at ingestion time.
pub mod keys {
    pub const FILENAME: &str = "filename";
    pub const FILE_TYPE: &str = "file_type";
    pub const PAGE: &str = "page";
    pub const TOTAL_PAGES: &str = "total_pages";
    pub const DOCUMENT_ID: &str = "document_id";
    pub const CHUNK_INDEX: &str = "chunk_index";
}

/// A scalar metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetadataValue::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Bool(b) => write!(f, "{}", b),
            MetadataValue::Integer(n) => write!(f, "{}", n),
            MetadataValue::Float(x) => write!(f, "{}", x),
            MetadataValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Integer(value)
    }
}

impl From<u32> for MetadataValue {
    fn from(value: u32) -> Self {
        MetadataValue::Integer(value as i64)
    }
}

impl From<usize> for MetadataValue {
    fn from(value: usize) -> Self {
        MetadataValue::Integer(value as i64)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

/// Free-form document attributes attached to an index entry.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Conjunction of `key == value` conditions over entry metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub conditions: BTreeMap<String, MetadataValue>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality condition
    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.conditions.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// True when every condition holds for `metadata`.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.conditions
            .iter()
            .all(|(key, expected)| metadata.get(key) == Some(expected))
    }

    /// Parse a `key=value` expression. Integers and booleans are typed, anything else is text.
    pub fn parse_condition(expr: &str) -> Option<(String, MetadataValue)> {
        let (key, raw) = expr.split_once('=')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        let raw = raw.trim();
        let value = if let Ok(n) = raw.parse::<i64>() {
            MetadataValue::Integer(n)
        } else if let Ok(b) = raw.parse::<bool>() {
            MetadataValue::Bool(b)
        } else {
            MetadataValue::Text(raw.to_string())
        };
        Some((key.to_string(), value))
    }
}

/// A bounded segment of a document's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source_id: String,
    pub sequence_index: usize,
    pub page: Option<u32>,
}

/// A chunk together with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

impl EmbeddedChunk {
    /// Turn the chunk into an index entry under the given id.
    pub fn into_entry(self, id: impl Into<String>, metadata: Metadata) -> IndexEntry {
        IndexEntry {
            id: id.into(),
            vector: self.vector,
            text: self.chunk.text,
            metadata,
        }
    }
}

/// An entry persisted by the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// An index entry together with its cosine distance to a query vector.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEntry {
    pub entry: IndexEntry,
    pub distance: f32,
}

impl ScoredEntry {
    pub fn similarity(&self) -> f32 {
        similarity_from_distance(self.distance)
    }
}

/// Convert a cosine distance into a similarity in `[0, 1]`.
///
/// Cosine distance lies in `[0, 2]` for arbitrary vectors, so the raw `1 - d`
/// can be negative; it is clamped rather than trusted.
pub fn similarity_from_distance(distance: f32) -> f32 {
    if distance.is_nan() {
        return 0.0;
    }
    (1.0 - distance).clamp(0.0, 1.0)
}

/// A passage returned for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub text: String,
    pub metadata: Metadata,
    pub relevance_score: f32,
}

impl RetrievedDocument {
    pub fn from_scored(scored: ScoredEntry) -> Self {
        let relevance_score = scored.similarity();
        Self {
            text: scored.entry.text,
            metadata: scored.entry.metadata,
            relevance_score,
        }
    }

    /// Source file name, `Unknown` when the entry carries none.
    pub fn filename(&self) -> &str {
        self.metadata
            .get(keys::FILENAME)
            .and_then(MetadataValue::as_str)
            .unwrap_or("Unknown")
    }

    /// Page or slide number, if any.
    pub fn page(&self) -> Option<i64> {
        self.metadata.get(keys::PAGE).and_then(MetadataValue::as_i64)
    }
}

/// Attribution for one retrieved passage in an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub filename: String,
    pub page: Option<i64>,
    pub chunk_text: String,
    pub relevance_score: f32,
}

/// A composed answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub confidence_score: f32,
    pub language: Language,
}

/// Readiness of a backing service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ServiceHealth {
    Ready,
    Unavailable(String),
}

impl ServiceHealth {
    pub fn is_ready(&self) -> bool {
        matches!(self, ServiceHealth::Ready)
    }
}

impl fmt::Display for ServiceHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceHealth::Ready => write!(f, "connected"),
            ServiceHealth::Unavailable(reason) => write!(f, "disconnected ({})", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with(metadata: Metadata) -> RetrievedDocument {
        RetrievedDocument {
            text: "text".to_string(),
            metadata,
            relevance_score: 0.5,
        }
    }

    #[test]
    fn test_similarity_is_clamped() {
        assert_eq!(similarity_from_distance(0.0), 1.0);
        assert_eq!(similarity_from_distance(1.0), 0.0);
        assert_eq!(similarity_from_distance(1.7), 0.0);
        assert_eq!(similarity_from_distance(-0.3), 1.0);
        assert_eq!(similarity_from_distance(f32::NAN), 0.0);
        assert!((similarity_from_distance(0.25) - 0.75).abs() < 1e-6);

        for i in -40..=80 {
            let d = i as f32 * 0.05;
            let s = similarity_from_distance(d);
            assert!((0.0..=1.0).contains(&s), "distance {} gave {}", d, s);
        }
    }

    #[test]
    fn test_filter_matches_all_conditions() {
        let mut metadata = Metadata::new();
        metadata.insert(keys::FILENAME.to_string(), "notes.pdf".into());
        metadata.insert(keys::PAGE.to_string(), 3i64.into());

        assert!(MetadataFilter::new().matches(&metadata));
        assert!(MetadataFilter::new().with("filename", "notes.pdf").matches(&metadata));
        assert!(
            MetadataFilter::new()
                .with("filename", "notes.pdf")
                .with("page", 3i64)
                .matches(&metadata)
        );
        assert!(!MetadataFilter::new().with("page", 4i64).matches(&metadata));
        assert!(!MetadataFilter::new().with("missing", "x").matches(&metadata));
    }

    #[test]
    fn test_parse_condition() {
        assert_eq!(
            MetadataFilter::parse_condition("page=3"),
            Some(("page".to_string(), MetadataValue::Integer(3)))
        );
        assert_eq!(
            MetadataFilter::parse_condition(" filename = notes.pdf "),
            Some(("filename".to_string(), MetadataValue::Text("notes.pdf".to_string())))
        );
        assert_eq!(
            MetadataFilter::parse_condition("approved=true"),
            Some(("approved".to_string(), MetadataValue::Bool(true)))
        );
        assert_eq!(MetadataFilter::parse_condition("no-equals"), None);
        assert_eq!(MetadataFilter::parse_condition("=value"), None);
    }

    #[test]
    fn test_retrieved_document_accessors() {
        let doc = doc_with(Metadata::new());
        assert_eq!(doc.filename(), "Unknown");
        assert_eq!(doc.page(), None);

        let mut metadata = Metadata::new();
        metadata.insert(keys::FILENAME.to_string(), "slides.pptx".into());
        metadata.insert(keys::PAGE.to_string(), 7u32.into());
        let doc = doc_with(metadata);
        assert_eq!(doc.filename(), "slides.pptx");
        assert_eq!(doc.page(), Some(7));
    }

    #[test]
    fn test_metadata_json_round_trip_keeps_types() {
        let json = r#"{"filename":"a.pdf","page":2,"score":0.5,"ok":true}"#;
        let metadata: Metadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata["filename"], MetadataValue::Text("a.pdf".into()));
        assert_eq!(metadata["page"], MetadataValue::Integer(2));
        assert_eq!(metadata["score"], MetadataValue::Float(0.5));
        assert_eq!(metadata["ok"], MetadataValue::Bool(true));
    }
}
