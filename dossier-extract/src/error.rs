//! Error types for the extraction system

use std::path::PathBuf;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Everything that can go wrong while turning one file into text.
///
/// The indexer never propagates these past the file boundary: a failed extraction
/// is logged and the file is catalogued without searchable text. The variants exist
/// so that the log line says *why* a file produced nothing.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// No extractor is registered for the detected format
    #[error("No extractor registered for {path}")]
    NoExtractor { path: PathBuf },

    /// The PDF decoder rejected the document
    #[error("PDF decoding failed: {message}")]
    Pdf { message: String },

    /// The DOCX container or its document part could not be read
    #[error("DOCX extraction failed: {source}")]
    Docx {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The legacy Word binary did not have the structure we expect
    #[error("Legacy DOC structure error: {message}")]
    LegacyDoc { message: String },

    /// The workbook could not be opened or a sheet could not be read
    #[error("Spreadsheet extraction failed: {source}")]
    Spreadsheet {
        #[from]
        source: calamine::Error,
    },

    /// The OCR engine could not be started or exited unsuccessfully
    #[error("OCR failed: {message}")]
    Ocr { message: String },

    /// IO errors while reading the source file
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Blocking extraction task failed or panicked
    #[error("Extraction task failed: {source}")]
    AsyncTask {
        #[from]
        source: tokio::task::JoinError,
    },
}

impl ExtractError {
    /// Wrap a DOCX-side error (zip container or XML parser).
    pub fn docx<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Docx {
            source: Box::new(source),
        }
    }

    pub fn legacy_doc<S: Into<String>>(message: S) -> Self {
        Self::LegacyDoc {
            message: message.into(),
        }
    }

    pub fn ocr<S: Into<String>>(message: S) -> Self {
        Self::Ocr {
            message: message.into(),
        }
    }
}
