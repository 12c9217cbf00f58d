//! Built-in extractors, one module per format.

mod cad;
mod docx;
mod image;
mod legacy_doc;
mod pdf;
mod spreadsheet;

pub use cad::CadExtractor;
pub use docx::DocxExtractor;
pub use image::{ImageExtractor, OcrEngine, TesseractOcr};
pub use legacy_doc::LegacyDocExtractor;
pub use pdf::PdfExtractor;
pub use spreadsheet::SpreadsheetExtractor;

use crate::error::Result;
use std::path::Path;

/// File name used in logs and as the searchable text of CAD drawings.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Run a parser on the blocking pool. A panic inside the parser surfaces as
/// [`crate::ExtractError::AsyncTask`] instead of unwinding into the caller.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExtractError;

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Path::new("/srv/docs/plan.dwg")), "plan.dwg");
        assert_eq!(display_name(Path::new("/")), "/");
    }

    #[tokio::test]
    async fn test_panicking_parser_is_contained() {
        let result: Result<()> = run_blocking(|| panic!("malformed xref table")).await;
        assert!(matches!(result, Err(ExtractError::AsyncTask { .. })));
    }
}
