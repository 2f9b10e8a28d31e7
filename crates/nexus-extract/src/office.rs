//! Office Open XML documents (DOCX, PPTX)

use regex::Regex;
use std::io::{Cursor, Read};
use std::path::Path;

use nexus_core::{DocumentExtractor, Error, ExtractedDocument, ExtractedSegment, FileType, Result};

use crate::{file_name, read_file};

const DOCX_BODY: &str = "word/document.xml";

/// Pulls run text out of WordprocessingML and DrawingML parts
struct XmlText {
    paragraph: Regex,
    run: Regex,
    entity: Regex,
}

impl XmlText {
    /// `prefix` is the element namespace: `w` for Word, `a` for slides
    fn new(prefix: &str) -> Result<Self> {
        let compile = |pattern: String| {
            Regex::new(&pattern).map_err(|e| Error::Configuration(format!("invalid pattern {}: {}", pattern, e)))
        };
        Ok(Self {
            paragraph: compile(format!(r"(?s)<{p}:p[ >].*?</{p}:p>", p = prefix))?,
            run: compile(format!(r"<{p}:t(?:\s[^>]*)?>([^<]*)</{p}:t>", p = prefix))?,
            entity: compile(r"&(#x[0-9a-fA-F]+|#[0-9]+|amp|lt|gt|quot|apos);".to_string())?,
        })
    }

    /// Text of each non-blank paragraph
    fn paragraphs(&self, xml: &str) -> Vec<String> {
        self.paragraph
            .find_iter(xml)
            .map(|paragraph| {
                let raw: String = self
                    .run
                    .captures_iter(paragraph.as_str())
                    .filter_map(|c| c.get(1))
                    .map(|m| m.as_str())
                    .collect();
                self.unescape(&raw)
            })
            .filter(|text| !text.trim().is_empty())
            .collect()
    }

    fn unescape(&self, text: &str) -> String {
        self.entity
            .replace_all(text, |caps: &regex::Captures| {
                let name = &caps[1];
                let decoded = match name {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    _ => name
                        .strip_prefix("#x")
                        .map(|hex| u32::from_str_radix(hex, 16))
                        .unwrap_or_else(|| name[1..].parse())
                        .ok()
                        .and_then(char::from_u32),
                };
                decoded.map(String::from).unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

fn open_archive(path: &Path) -> Result<zip::ZipArchive<Cursor<Vec<u8>>>> {
    zip::ZipArchive::new(Cursor::new(read_file(path)?)).map_err(|e| {
        Error::ExtractionFailed(format!("{} is not a valid Office document: {}", file_name(path), e))
    })
}

fn read_part(archive: &mut zip::ZipArchive<Cursor<Vec<u8>>>, name: &str) -> Result<String> {
    let mut part = archive
        .by_name(name)
        .map_err(|e| Error::ExtractionFailed(format!("missing part {}: {}", name, e)))?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| Error::ExtractionFailed(format!("cannot read part {}: {}", name, e)))?;
    Ok(xml)
}

/// Word documents; paragraphs are joined by blank lines
pub struct DocxExtractor {
    xml: XmlText,
}

impl DocxExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self { xml: XmlText::new("w")? })
    }
}

impl DocumentExtractor for DocxExtractor {
    fn file_type(&self) -> FileType {
        FileType::Docx
    }

    fn extract(&self, path: &Path) -> Result<ExtractedDocument> {
        let mut archive = open_archive(path)?;
        let body = read_part(&mut archive, DOCX_BODY)?;
        let text = self.xml.paragraphs(&body).join("\n\n");
        Ok(ExtractedDocument::from_text(file_name(path), FileType::Docx, text))
    }
}

/// PowerPoint decks; the slide number stands in for the page
pub struct PptxExtractor {
    xml: XmlText,
    slide_name: Regex,
}

impl PptxExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            xml: XmlText::new("a")?,
            slide_name: Regex::new(r"^ppt/slides/slide(\d+)\.xml$")
                .map_err(|e| Error::Configuration(e.to_string()))?,
        })
    }

    /// Slide part names in presentation order
    fn slides(&self, archive: &zip::ZipArchive<Cursor<Vec<u8>>>) -> Vec<(u32, String)> {
        let mut slides: Vec<(u32, String)> = archive
            .file_names()
            .filter_map(|name| {
                let number = self.slide_name.captures(name)?.get(1)?.as_str().parse().ok()?;
                Some((number, name.to_string()))
            })
            .collect();
        slides.sort();
        slides
    }
}

impl DocumentExtractor for PptxExtractor {
    fn file_type(&self) -> FileType {
        FileType::Pptx
    }

    fn extract(&self, path: &Path) -> Result<ExtractedDocument> {
        let mut archive = open_archive(path)?;
        let slides = self.slides(&archive);
        let total_pages = slides.len() as u32;

        let mut segments = Vec::new();
        for (number, name) in slides {
            let xml = read_part(&mut archive, &name)?;
            let text = self.xml.paragraphs(&xml).join("\n");
            if !text.trim().is_empty() {
                segments.push(ExtractedSegment {
                    text,
                    page: Some(number),
                });
            }
        }

        Ok(ExtractedDocument {
            filename: file_name(path),
            file_type: FileType::Pptx,
            segments,
            total_pages: Some(total_pages),
        })
    }
}
