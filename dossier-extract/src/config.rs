//! Configuration for extraction providers

use serde::Deserialize;
use std::path::PathBuf;

/// Settings shared by the built-in extractors.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Tesseract language spec, `+`-joined
    pub ocr_languages: String,
    /// Tesseract executable, resolved through `PATH` when relative
    pub tesseract_command: PathBuf,
    /// Cell delimiter used when rendering spreadsheet rows
    pub sheet_delimiter: char,
}

impl ExtractConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the OCR language model list (builder style)
    pub fn with_ocr_languages<S: Into<String>>(self, languages: S) -> Self {
        Self {
            ocr_languages: languages.into(),
            ..self
        }
    }

    /// Point OCR at a specific tesseract binary (builder style)
    pub fn with_tesseract_command<P: Into<PathBuf>>(self, command: P) -> Self {
        Self {
            tesseract_command: command.into(),
            ..self
        }
    }

    /// Set the spreadsheet cell delimiter (builder style)
    pub fn with_sheet_delimiter(self, sheet_delimiter: char) -> Self {
        Self {
            sheet_delimiter,
            ..self
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            ocr_languages: "eng+tur".to_string(),
            tesseract_command: PathBuf::from("tesseract"),
            sheet_delimiter: ',',
        }
    }
}
