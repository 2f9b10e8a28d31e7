//! Document text extraction for Campus Nexus
//!
//! One [`DocumentExtractor`] per supported format. Paged formats (PDF, PPTX)
//! produce one segment per non-blank page or slide.

mod markup;
mod office;
mod pdf;
mod plain;


use std::path::Path;
use std::sync::Arc;

pub use markup::{HtmlExtractor, MarkdownExtractor, html_to_text, markdown_to_text};
pub use office::{DocxExtractor, PptxExtractor};
pub use pdf::PdfExtractor;
pub use plain::TextExtractor;

// Re-export core types for convenience
pub use nexus_core::{DocumentExtractor, Error, ExtractedDocument, ExtractedSegment, FileType, Result};

/// Extractors for every supported file type
pub fn default_extractors() -> Result<Vec<Arc<dyn DocumentExtractor>>> {
    Ok(vec![
        Arc::new(PdfExtractor),
        Arc::new(DocxExtractor::new()?),
        Arc::new(PptxExtractor::new()?),
        Arc::new(TextExtractor),
        Arc::new(MarkdownExtractor),
        Arc::new(HtmlExtractor),
    ])
}

/// Display name of an uploaded file
pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read a file, reporting failures as extraction errors
pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| Error::ExtractionFailed(format!("cannot read {}: {}", path.display(), e)))
}
