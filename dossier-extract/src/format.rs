//! Format detection and the eligibility allow-list.
//!
//! Detection runs on the path alone (extension plus the MIME type guessed from it);
//! file contents are never sniffed. Variants are tried in a fixed precedence so that
//! a path maps to exactly one [`DocumentFormat`].

use serde::Serialize;
use std::path::Path;

/// MIME type recorded for eligible files whose type cannot be guessed.
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// Substrings of a MIME type that make a file eligible for cataloguing.
const ELIGIBLE_MIME_MARKERS: &[&str] = &["pdf", "word", "spreadsheet", "image"];

/// The extraction variant a file is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    LegacyDoc,
    Spreadsheet,
    /// Raster image, text recovered by OCR
    Image,
    /// CAD drawing, searchable only by its file name
    Cad,
    /// Allow-listed by MIME type but no extractor applies; catalogued without text
    Opaque,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
            DocumentFormat::LegacyDoc => "doc",
            DocumentFormat::Spreadsheet => "spreadsheet",
            DocumentFormat::Image => "image",
            DocumentFormat::Cad => "cad",
            DocumentFormat::Opaque => "opaque",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedFormat {
    pub format: DocumentFormat,
    /// MIME type to record as the file's `file_type`
    pub mime_type: String,
}

/// Lowercased extension without the leading dot.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Classify a path, or return `None` when it is not eligible at all.
///
/// Precedence: `.pdf`, `.docx`, `.doc`, `.xlsx`/`.xls`, CAD extensions, then an
/// `image/*` MIME type. CAD is checked before images because some MIME tables
/// register drawings under `image/vnd.*`, and drawings are never OCR'd.
pub fn detect(path: &Path) -> Option<DetectedFormat> {
    let mime = mime_guess::from_path(path).first();
    let mime_type = mime
        .as_ref()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| FALLBACK_MIME.to_string());

    let by_extension = match extension_of(path).as_deref() {
        Some("pdf") => Some(DocumentFormat::Pdf),
        Some("docx") => Some(DocumentFormat::Docx),
        Some("doc") => Some(DocumentFormat::LegacyDoc),
        Some("xlsx") | Some("xls") => Some(DocumentFormat::Spreadsheet),
        Some("dwg") | Some("dxf") => Some(DocumentFormat::Cad),
        _ => None,
    };

    let format = match by_extension {
        Some(format) => format,
        None if mime.is_some() && mime_type.starts_with("image/") => DocumentFormat::Image,
        None if mime.is_some() && is_eligible_mime(&mime_type) => DocumentFormat::Opaque,
        None => return None,
    };

    Some(DetectedFormat { format, mime_type })
}

fn is_eligible_mime(mime_type: &str) -> bool {
    ELIGIBLE_MIME_MARKERS
        .iter()
        .any(|marker| mime_type.contains(marker))
}
