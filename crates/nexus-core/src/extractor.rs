//! Document extractor trait and types

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{Error, Result};

/// Supported upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Docx,
    Pptx,
    Txt,
    Markdown,
    Html,
}

impl FileType {
    /// Canonical extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Docx => "docx",
            FileType::Pptx => "pptx",
            FileType::Txt => "txt",
            FileType::Markdown => "md",
            FileType::Html => "html",
        }
    }

    /// Get all supported file types
    pub fn all() -> Vec<FileType> {
        vec![
            FileType::Pdf,
            FileType::Docx,
            FileType::Pptx,
            FileType::Txt,
            FileType::Markdown,
            FileType::Html,
        ]
    }

    /// Parse from an extension, with or without the leading dot
    pub fn from_extension(ext: &str) -> Option<FileType> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "pdf" => Some(FileType::Pdf),
            "docx" => Some(FileType::Docx),
            "pptx" => Some(FileType::Pptx),
            "txt" => Some(FileType::Txt),
            "md" | "markdown" => Some(FileType::Markdown),
            "html" | "htm" => Some(FileType::Html),
            _ => None,
        }
    }

    /// Detect the type of a file from its extension.
    pub fn from_path(path: &Path) -> Result<FileType> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        Self::from_extension(ext).ok_or_else(|| {
            let supported: Vec<&str> = Self::all().iter().map(|t| t.extension()).collect();
            Error::Validation(format!(
                "Unsupported file type '{}'. Supported: {}",
                path.display(),
                supported.join(", ")
            ))
        })
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// One unit of extracted text: a page, a slide, or a whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedSegment {
    pub text: String,
    pub page: Option<u32>,
}

/// The text content of one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub filename: String,
    pub file_type: FileType,
    pub segments: Vec<ExtractedSegment>,
    pub total_pages: Option<u32>,
}

impl ExtractedDocument {
    /// Build a single-segment document from in-memory text
    pub fn from_text(filename: impl Into<String>, file_type: FileType, text: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            file_type,
            segments: vec![ExtractedSegment {
                text: text.into(),
                page: None,
            }],
            total_pages: None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.segments.iter().all(|s| s.text.trim().is_empty())
    }
}

/// Trait for per-format text extractors
///
/// Extraction is blocking file work; callers on an async runtime should run it
/// on a blocking thread. Failures are reported as `ExtractionFailed`.
pub trait DocumentExtractor: Send + Sync {
    /// The format this extractor reads
    fn file_type(&self) -> FileType;

    /// Extract the text of the file at `path`
    fn extract(&self, path: &Path) -> Result<ExtractedDocument>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_from_path() {
        assert_eq!(FileType::from_path(Path::new("notes.PDF")).unwrap(), FileType::Pdf);
        assert_eq!(FileType::from_path(Path::new("a/b/deck.pptx")).unwrap(), FileType::Pptx);
        assert_eq!(FileType::from_path(Path::new("readme.markdown")).unwrap(), FileType::Markdown);
        assert_eq!(FileType::from_path(Path::new("page.htm")).unwrap(), FileType::Html);
    }

    #[test]
    fn test_unsupported_file_type_is_validation_error() {
        let err = FileType::from_path(Path::new("archive.zip")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("pdf, docx, pptx, txt, md, html"));

        let err = FileType::from_path(Path::new("no_extension")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_blank_document() {
        let doc = ExtractedDocument::from_text("a.txt", FileType::Txt, "  \n ");
        assert!(doc.is_blank());
        let doc = ExtractedDocument::from_text("a.txt", FileType::Txt, "text");
        assert!(!doc.is_blank());
    }
}
