//! Boundary-aware text chunking

use nexus_core::{Chunk, Error, ExtractedDocument, RagConfig, Result};

/// Sentence-terminal markers, in the order they are tried.
const SENTENCE_ENDINGS: [&str; 6] = [". ", ".\n", "! ", "!\n", "? ", "?\n"];

/// How far either side of the raw cut a sentence boundary is searched for.
const BOUNDARY_WINDOW: usize = 100;

/// Splits text into overlapping chunks that prefer to end on sentence boundaries.
///
/// Lengths are counted in Unicode scalar values, never bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    /// Create a chunker; `chunk_overlap` must be smaller than `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Validation("chunk size must be positive".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::Validation(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into trimmed, non-empty pieces.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= self.chunk_size {
            if text.trim().is_empty() {
                return Vec::new();
            }
            return vec![text.to_string()];
        }

        self.spans(&chars)
            .into_iter()
            .filter_map(|(start, end)| {
                let piece: String = chars[start..end].iter().collect();
                let trimmed = piece.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .collect()
    }

    /// Chunk one piece of text belonging to `source_id`.
    pub fn chunk(&self, source_id: &str, text: &str, page: Option<u32>) -> Vec<Chunk> {
        self.split(text)
            .into_iter()
            .enumerate()
            .map(|(sequence_index, text)| Chunk {
                text,
                source_id: source_id.to_string(),
                sequence_index,
                page,
            })
            .collect()
    }

    /// Chunk every segment of an extracted document.
    ///
    /// Segments are chunked independently so that a chunk never spans two
    /// pages; sequence indices run continuously across the whole document.
    pub fn chunk_document(&self, source_id: &str, document: &ExtractedDocument) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for segment in &document.segments {
            for text in self.split(&segment.text) {
                chunks.push(Chunk {
                    text,
                    source_id: source_id.to_string(),
                    sequence_index: chunks.len(),
                    page: segment.page,
                });
            }
        }
        chunks
    }

    /// Character ranges of the raw (untrimmed) windows.
    fn spans(&self, chars: &[char]) -> Vec<(usize, usize)> {
        let len = chars.len();
        let mut spans = Vec::new();
        let mut start = 0;

        while start < len {
            let raw_end = start + self.chunk_size;
            let end = if raw_end < len {
                self.sentence_break(chars, start).unwrap_or(raw_end)
            } else {
                len
            };
            spans.push((start, end));

            if end >= len {
                break;
            }

            let next = end.saturating_sub(self.chunk_overlap);
            start = if next > start { next } else { end };
        }

        spans
    }

    /// Position just after the chosen sentence marker near the raw cut, if any.
    fn sentence_break(&self, chars: &[char], start: usize) -> Option<usize> {
        let raw_end = start + self.chunk_size;
        let search_start = raw_end.saturating_sub(BOUNDARY_WINDOW).max(start);
        let search_end = (raw_end + BOUNDARY_WINDOW).min(chars.len());
        let window = &chars[search_start..search_end];

        for ending in SENTENCE_ENDINGS {
            let marker: Vec<char> = ending.chars().collect();
            if let Some(pos) = rfind(window, &marker) {
                let actual = search_start + pos + marker.len();
                if actual > start {
                    return Some(actual);
                }
            }
        }
        None
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

fn rfind(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .rev()
        .find(|&i| haystack[i..i + needle.len()] == *needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_core::{ExtractedSegment, FileType};

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        assert!(matches!(TextChunker::new(100, 100), Err(Error::Validation(_))));
        assert!(matches!(TextChunker::new(100, 150), Err(Error::Validation(_))));
        assert!(matches!(TextChunker::new(0, 0), Err(Error::Validation(_))));
        assert!(TextChunker::new(100, 99).is_ok());
    }

    #[test]
    fn test_empty_text() {
        let chunker = TextChunker::default();
        assert!(chunker.split("").is_empty());
        assert!(chunker.split("   \n\t").is_empty());
    }

    #[test]
    fn test_short_text_is_returned_whole() {
        let chunker = TextChunker::new(50, 10).unwrap();
        for text in ["Hello world.", " padded text ", &"x".repeat(50)] {
            assert_eq!(chunker.split(text), vec![text.to_string()]);
        }
    }

    #[test]
    fn test_sentence_boundary_chunking() {
        let chunker = TextChunker::new(1000, 200).unwrap();
        let text = "A. B. C. ".repeat(150);
        let chunks = chunker.split(&text);

        assert!(chunks.len() >= 2);
        for chunk in &chunks[..chunks.len() - 1] {
            assert!(chunk.ends_with('.'), "chunk does not end on a sentence: {:?}", chunk);
        }
    }

    #[test]
    fn test_breaks_on_latest_marker_of_first_matching_kind() {
        let chunker = TextChunker::new(20, 5).unwrap();
        // '! ' is searched before '? ' even though the '?' sits later.
        let text = "aaaa! bbbbbbbb? cccccccccccccccccccc dddddddddd";
        let chunks = chunker.split(text);
        assert_eq!(chunks[0], "aaaa!");
    }

    #[test]
    fn test_hard_cut_without_markers() {
        let chunker = TextChunker::new(10, 3).unwrap();
        let text: String = ('a'..='z').collect();
        let spans = chunker.spans(&text.chars().collect::<Vec<_>>());
        assert_eq!(spans, vec![(0, 10), (7, 17), (14, 24), (21, 26)]);
    }

    #[test]
    fn test_spans_cover_the_text() {
        let chunker = TextChunker::new(40, 10).unwrap();
        let text = "First sentence here. Second one follows! Is this the third? \
                    Yes.\nAnother line without much punctuation at all and then more words "
            .repeat(7);
        let chars: Vec<char> = text.chars().collect();
        let spans = chunker.spans(&chars);

        assert_eq!(spans[0].0, 0);
        assert_eq!(spans.last().unwrap().1, chars.len());
        for pair in spans.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            assert!(next.0 > prev.0, "start did not advance");
            assert!(next.0 <= prev.1, "gap between {:?} and {:?}", prev, next);
        }
    }

    #[test]
    fn test_step_count_is_bounded() {
        let text = "word ".repeat(997);
        let len = text.chars().count();
        for (size, overlap) in [(100, 0), (100, 20), (100, 99), (37, 36), (500, 250)] {
            let chunker = TextChunker::new(size, overlap).unwrap();
            let spans = chunker.spans(&text.chars().collect::<Vec<_>>());
            assert!(
                spans.len() <= len / (size - overlap) + 1,
                "size {} overlap {} gave {} steps",
                size,
                overlap,
                spans.len()
            );
        }
    }

    #[test]
    fn test_terminates_when_markers_sit_at_the_start() {
        // A marker right after `start` makes every window tiny; the loop must still advance.
        let chunker = TextChunker::new(120, 110).unwrap();
        let text = "a. ".repeat(400);
        let spans = chunker.spans(&text.chars().collect::<Vec<_>>());
        assert!(spans.len() <= text.len());
        assert_eq!(spans.last().unwrap().1, text.chars().count());
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let chunker = TextChunker::new(10, 2).unwrap();
        let text = "नमस्ते".to_string();
        assert!(text.len() > 10);
        assert!(text.chars().count() <= 10);
        assert_eq!(chunker.split(&text), vec![text.clone()]);

        let long = "é".repeat(25);
        let chunks = chunker.split(&long);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    }

    #[test]
    fn test_deterministic() {
        let chunker = TextChunker::new(64, 16).unwrap();
        let text = "Deterministic output. Always the same! Really? Yes.\n".repeat(20);
        assert_eq!(chunker.split(&text), chunker.split(&text));
    }

    #[test]
    fn test_chunk_document_keeps_pages_and_sequence() {
        let chunker = TextChunker::new(30, 5).unwrap();
        let document = ExtractedDocument {
            filename: "notes.pdf".to_string(),
            file_type: FileType::Pdf,
            segments: vec![
                ExtractedSegment {
                    text: "Page one is short.".to_string(),
                    page: Some(1),
                },
                ExtractedSegment {
                    text: "   ".to_string(),
                    page: Some(2),
                },
                ExtractedSegment {
                    text: "Page three has a longer body. It needs two chunks at least.".to_string(),
                    page: Some(3),
                },
            ],
            total_pages: Some(3),
        };

        let chunks = chunker.chunk_document("doc-1", &document);
        assert!(chunks.len() >= 3);
        assert_eq!(chunks[0].page, Some(1));
        assert!(chunks[1..].iter().all(|c| c.page == Some(3)));
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.sequence_index, i);
            assert_eq!(chunk.source_id, "doc-1");
        }
    }
}
