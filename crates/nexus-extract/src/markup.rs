//! Markdown and HTML documents

use pulldown_cmark::{Event, Parser, TagEnd};
use scraper::Html;
use std::path::Path;

use nexus_core::{DocumentExtractor, ExtractedDocument, FileType, Result};

use crate::{file_name, read_file};

/// Elements whose text never reaches the reader
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Render markdown to plain text, one block per paragraph
pub fn markdown_to_text(markdown: &str) -> String {
    let mut text = String::with_capacity(markdown.len());

    for event in Parser::new(markdown) {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak => text.push('\n'),
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::CodeBlock) => text.push_str("\n\n"),
            Event::End(TagEnd::Item | TagEnd::TableRow | TagEnd::TableHead) => text.push('\n'),
            Event::End(TagEnd::TableCell) => text.push(' '),
            _ => {}
        }
    }

    tidy_blank_lines(&text)
}

/// Visible text of an HTML page, one line per text node
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut lines = Vec::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| HIDDEN_ELEMENTS.contains(&element.name()))
        });
        if hidden {
            continue;
        }
        let line = collapse_whitespace(text);
        if !line.is_empty() {
            lines.push(line);
        }
    }

    lines.join("\n")
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trim trailing spaces and squeeze runs of blank lines down to one
fn tidy_blank_lines(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut blank_run = 0;
    for line in input.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}

/// Reads `.md` files as rendered text
pub struct MarkdownExtractor;

impl DocumentExtractor for MarkdownExtractor {
    fn file_type(&self) -> FileType {
        FileType::Markdown
    }

    fn extract(&self, path: &Path) -> Result<ExtractedDocument> {
        let bytes = read_file(path)?;
        let text = markdown_to_text(&String::from_utf8_lossy(&bytes));
        Ok(ExtractedDocument::from_text(file_name(path), FileType::Markdown, text))
    }
}

/// Reads `.html` pages as visible text
pub struct HtmlExtractor;

impl DocumentExtractor for HtmlExtractor {
    fn file_type(&self) -> FileType {
        FileType::Html
    }

    fn extract(&self, path: &Path) -> Result<ExtractedDocument> {
        let bytes = read_file(path)?;
        let text = html_to_text(&String::from_utf8_lossy(&bytes));
        Ok(ExtractedDocument::from_text(file_name(path), FileType::Html, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_drops_syntax() {
        let text = markdown_to_text("# Hostel Rules\n\nCurfew is **11pm**.\n\n- No pets\n- No cooking\n");
        assert_eq!(text, "Hostel Rules\n\nCurfew is 11pm.\n\nNo pets\nNo cooking");
    }

    #[test]
    fn test_html_skips_scripts_and_styles() {
        let html = r#"<html><head><style>p { color: red; }</style></head>
            <body><h1>Library</h1><p>Open   from
            9am.</p><script>track();</script></body></html>"#;
        assert_eq!(html_to_text(html), "Library\nOpen from 9am.");
    }

    #[test]
    fn test_extractors_report_their_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guide.md");
        std::fs::write(&path, "Fees are due in *July*.").unwrap();

        let doc = MarkdownExtractor.extract(&path).unwrap();
        assert_eq!(doc.file_type, FileType::Markdown);
        assert_eq!(doc.segments[0].text, "Fees are due in July.");
        assert_eq!(HtmlExtractor.file_type(), FileType::Html);
    }
}
