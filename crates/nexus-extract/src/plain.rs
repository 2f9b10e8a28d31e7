//! Plain text files

use std::path::Path;

use nexus_core::{DocumentExtractor, ExtractedDocument, FileType, Result};

use crate::{file_name, read_file};

/// Reads `.txt` files; invalid UTF-8 sequences are replaced
pub struct TextExtractor;

impl DocumentExtractor for TextExtractor {
    fn file_type(&self) -> FileType {
        FileType::Txt
    }

    fn extract(&self, path: &Path) -> Result<ExtractedDocument> {
        let bytes = read_file(path)?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        Ok(ExtractedDocument::from_text(file_name(path), FileType::Txt, text))
    }
}
