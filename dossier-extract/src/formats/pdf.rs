use super::run_blocking;
use crate::error::{ExtractError, Result};
use crate::extractor::Extractor;
use async_trait::async_trait;
use std::path::Path;

/// Full-document text via `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

#[async_trait]
impl Extractor for PdfExtractor {
    async fn extract(&self, path: &Path) -> Result<Option<String>> {
        let bytes = tokio::fs::read(path).await?;
        let text = run_blocking(move || {
            pdf_extract::extract_text_from_mem(&bytes).map_err(|e| ExtractError::Pdf {
                message: e.to_string(),
            })
        })
        .await?;
        Ok(Some(text))
    }

    fn name(&self) -> &str {
        "pdf-extract"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_garbage_is_rejected() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.pdf");
        tokio::fs::write(&path, b"this is not a pdf").await?;

        assert!(PdfExtractor.extract(&path).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let result = PdfExtractor.extract(Path::new("/nonexistent/a.pdf")).await;
        assert!(matches!(result, Err(ExtractError::Io { .. })));
    }
}
