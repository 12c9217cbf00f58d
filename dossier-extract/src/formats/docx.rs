use super::run_blocking;
use crate::error::{ExtractError, Result};
use crate::extractor::Extractor;
use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::Read;
use std::path::Path;

const DOCUMENT_PART: &str = "word/document.xml";

/// Raw text of the main document part of an Office Open XML word file.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxExtractor;

#[async_trait]
impl Extractor for DocxExtractor {
    async fn extract(&self, path: &Path) -> Result<Option<String>> {
        let path = path.to_path_buf();
        let text = run_blocking(move || read_docx(&path)).await?;
        Ok(Some(text))
    }

    fn name(&self) -> &str {
        "docx"
    }
}

fn read_docx(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(ExtractError::docx)?;
    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(ExtractError::docx)?;

    let mut xml = String::new();
    part.read_to_string(&mut xml)?;
    document_text(&xml)
}

/// Walk `document.xml`, keeping run text, tabs and breaks. Paragraphs are
/// separated by a blank line.
fn document_text(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event().map_err(ExtractError::docx)? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_run_text = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_run_text = false,
                b"w:p" => text.push_str("\n\n"),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_run_text => {
                text.push_str(&t.unescape().map_err(ExtractError::docx)?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}
