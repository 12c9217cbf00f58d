use crate::error::{ExtractError, Result};
use crate::extractor::Extractor;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;

/// Optical character recognition backend.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, path: &Path) -> Result<String>;

    fn name(&self) -> &str;
}

/// Runs the `tesseract` command line tool and reads the recognized text from stdout.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    command: PathBuf,
    languages: String,
}

impl TesseractOcr {
    pub fn new(command: impl Into<PathBuf>, languages: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            languages: languages.into(),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, path: &Path) -> Result<String> {
        let output = Command::new(&self.command)
            .arg(path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ExtractError::ocr(format!("failed to run {}: {e}", self.command.display()))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::ocr(format!(
                "{} exited with {}: {}",
                self.command.display(),
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

/// Scanned pages and photos, read through an [`OcrEngine`].
#[derive(Clone)]
pub struct ImageExtractor {
    engine: Arc<dyn OcrEngine>,
}

impl ImageExtractor {
    pub fn new(engine: Arc<dyn OcrEngine>) -> Self {
        Self { engine }
    }
}

impl std::fmt::Debug for ImageExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageExtractor")
            .field("engine", &self.engine.name())
            .finish()
    }
}

#[async_trait]
impl Extractor for ImageExtractor {
    async fn extract(&self, path: &Path) -> Result<Option<String>> {
        let text = self.engine.recognize(path).await?;
        if text.trim().is_empty() {
            tracing::debug!("No text recognized in {}", path.display());
            return Ok(None);
        }
        Ok(Some(text))
    }

    fn name(&self) -> &str {
        self.engine.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedOcr(&'static str);

    #[async_trait]
    impl OcrEngine for CannedOcr {
        async fn recognize(&self, _path: &Path) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    #[tokio::test]
    async fn test_recognized_text_is_returned() -> Result<()> {
        let extractor = ImageExtractor::new(Arc::new(CannedOcr("Lieferschein 4711\n")));
        let text = extractor.extract(Path::new("scan.png")).await?;
        assert_eq!(text.as_deref(), Some("Lieferschein 4711\n"));
        Ok(())
    }

    #[tokio::test]
    async fn test_blank_page_has_no_text() -> Result<()> {
        let extractor = ImageExtractor::new(Arc::new(CannedOcr(" \n\x0c")));
        assert!(extractor.extract(Path::new("blank.png")).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_binary_is_ocr_error() {
        let ocr = TesseractOcr::new("/nonexistent/bin/tesseract", "eng+tur");
        let result = ocr.recognize(Path::new("scan.png")).await;
        assert!(matches!(result, Err(ExtractError::Ocr { .. })));
    }
}
