//! PDF documents, one segment per page

use lopdf::Document;
use std::path::Path;
use tracing::{debug, warn};

use nexus_core::{DocumentExtractor, Error, ExtractedDocument, ExtractedSegment, FileType, Result};

use crate::file_name;

pub struct PdfExtractor;

impl DocumentExtractor for PdfExtractor {
    fn file_type(&self) -> FileType {
        FileType::Pdf
    }

    fn extract(&self, path: &Path) -> Result<ExtractedDocument> {
        let filename = file_name(path);
        let document = Document::load(path)
            .map_err(|e| Error::ExtractionFailed(format!("cannot open PDF {}: {}", filename, e)))?;

        let pages = document.get_pages();
        let total_pages = pages.len() as u32;
        let mut segments = Vec::new();

        for &number in pages.keys() {
            match document.extract_text(&[number]) {
                Ok(text) if !text.trim().is_empty() => segments.push(ExtractedSegment {
                    text,
                    page: Some(number),
                }),
                Ok(_) => debug!(%filename, page = number, "skipping blank page"),
                Err(e) => warn!(%filename, page = number, error = %e, "cannot extract page text"),
            }
        }

        Ok(ExtractedDocument {
            filename,
            file_type: FileType::Pdf,
            segments,
            total_pages: Some(total_pages),
        })
    }
}
