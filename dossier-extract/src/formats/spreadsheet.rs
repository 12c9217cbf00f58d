use super::run_blocking;
use crate::error::Result;
use crate::extractor::Extractor;
use async_trait::async_trait;
use calamine::{Data, Range, Reader, open_workbook_auto};
use std::path::Path;

/// Every worksheet rendered as delimited text, one row per line, with a blank
/// line after each sheet.
#[derive(Debug, Clone, Copy)]
pub struct SpreadsheetExtractor {
    delimiter: char,
}

impl SpreadsheetExtractor {
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }
}

impl Default for SpreadsheetExtractor {
    fn default() -> Self {
        Self::new(',')
    }
}

#[async_trait]
impl Extractor for SpreadsheetExtractor {
    async fn extract(&self, path: &Path) -> Result<Option<String>> {
        let path = path.to_path_buf();
        let delimiter = self.delimiter;
        let text = run_blocking(move || read_workbook(&path, delimiter)).await?;
        Ok(Some(text))
    }

    fn name(&self) -> &str {
        "calamine"
    }
}

fn read_workbook(path: &Path, delimiter: char) -> Result<String> {
    let mut workbook = open_workbook_auto(path)?;
    let mut text = String::new();

    for sheet in workbook.sheet_names() {
        let range = workbook.worksheet_range(&sheet)?;
        text.push_str(&render_range(&range, delimiter));
        text.push('\n');
    }

    Ok(text)
}

fn render_range(range: &Range<Data>, delimiter: char) -> String {
    range
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| quote_cell(render_cell(cell), delimiter))
                .collect::<Vec<_>>()
                .join(&delimiter.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(true) => "TRUE".to_string(),
        Data::Bool(false) => "FALSE".to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::Error(e) => e.to_string(),
    }
}

fn quote_cell(cell: String, delimiter: char) -> String {
    if cell.contains(delimiter) || cell.contains('"') || cell.contains('\n') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell
    }
}
