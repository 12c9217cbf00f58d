//! Extractor trait and the per-format registry

use crate::config::ExtractConfig;
use crate::error::{ExtractError, Result};
use crate::format::DocumentFormat;
use crate::formats::{
    CadExtractor, DocxExtractor, ImageExtractor, LegacyDocExtractor, PdfExtractor,
    SpreadsheetExtractor, TesseractOcr,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Converts one file into plain text.
///
/// `Ok(None)` means the format was understood but carries no text (an empty
/// OCR page, for instance). Errors are for files that could not be read at all.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<Option<String>>;

    /// Short name used in log lines
    fn name(&self) -> &str;
}

/// Maps each [`DocumentFormat`] to the extractor that handles it.
///
/// [`ExtractorRegistry::standard`] wires the built-in extractors; tests and
/// embedders replace individual entries with [`ExtractorRegistry::register`].
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    extractors: HashMap<DocumentFormat, Arc<dyn Extractor>>,
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut formats: Vec<_> = self.extractors.keys().collect();
        formats.sort();
        f.debug_struct("ExtractorRegistry")
            .field("formats", &formats)
            .finish()
    }
}

impl ExtractorRegistry {
    /// An empty registry; every format is reported as having no extractor.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the built-in extractor for every text-bearing format.
    pub fn standard(config: &ExtractConfig) -> Self {
        let ocr = Arc::new(TesseractOcr::new(
            config.tesseract_command.clone(),
            config.ocr_languages.clone(),
        ));

        Self::empty()
            .register(DocumentFormat::Pdf, Arc::new(PdfExtractor))
            .register(DocumentFormat::Docx, Arc::new(DocxExtractor))
            .register(DocumentFormat::LegacyDoc, Arc::new(LegacyDocExtractor))
            .register(
                DocumentFormat::Spreadsheet,
                Arc::new(SpreadsheetExtractor::new(config.sheet_delimiter)),
            )
            .register(DocumentFormat::Image, Arc::new(ImageExtractor::new(ocr)))
            .register(DocumentFormat::Cad, Arc::new(CadExtractor))
    }

    /// Install (or replace) the extractor for a format.
    pub fn register(mut self, format: DocumentFormat, extractor: Arc<dyn Extractor>) -> Self {
        self.extractors.insert(format, extractor);
        self
    }

    pub fn get(&self, format: DocumentFormat) -> Option<&Arc<dyn Extractor>> {
        self.extractors.get(&format)
    }

    /// Formats that currently have an extractor, in precedence order.
    pub fn formats(&self) -> Vec<DocumentFormat> {
        let mut formats: Vec<_> = self.extractors.keys().copied().collect();
        formats.sort();
        formats
    }

    /// Run the extractor registered for `format`.
    ///
    /// Opaque files yield `Ok(None)` without touching the file.
    pub async fn extract(&self, format: DocumentFormat, path: &Path) -> Result<Option<String>> {
        if format == DocumentFormat::Opaque {
            return Ok(None);
        }

        let extractor = self.get(format).ok_or_else(|| ExtractError::NoExtractor {
            path: path.to_path_buf(),
        })?;

        tracing::debug!("Extracting {} with {}", path.display(), extractor.name());
        extractor.extract(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedText(&'static str);

    #[async_trait]
    impl Extractor for FixedText {
        async fn extract(&self, _path: &Path) -> Result<Option<String>> {
            Ok(Some(self.0.to_string()))
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn test_standard_registry_covers_text_formats() {
        let registry = ExtractorRegistry::standard(&ExtractConfig::default());
        assert_eq!(
            registry.formats(),
            vec![
                DocumentFormat::Pdf,
                DocumentFormat::Docx,
                DocumentFormat::LegacyDoc,
                DocumentFormat::Spreadsheet,
                DocumentFormat::Image,
                DocumentFormat::Cad,
            ]
        );
    }

    #[tokio::test]
    async fn test_register_overrides_builtin() -> Result<()> {
        let registry = ExtractorRegistry::standard(&ExtractConfig::default())
            .register(DocumentFormat::Pdf, Arc::new(FixedText("Invoice 2024")));

        let text = registry
            .extract(DocumentFormat::Pdf, Path::new("/nowhere/a.pdf"))
            .await?;
        assert_eq!(text.as_deref(), Some("Invoice 2024"));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_extractor_is_an_error() {
        let registry = ExtractorRegistry::empty();
        let result = registry
            .extract(DocumentFormat::Pdf, Path::new("/nowhere/a.pdf"))
            .await;
        assert!(matches!(result, Err(ExtractError::NoExtractor { .. })));
    }

    #[tokio::test]
    async fn test_opaque_files_have_no_text() -> Result<()> {
        let registry = ExtractorRegistry::empty();
        let text = registry
            .extract(DocumentFormat::Opaque, Path::new("/nowhere/template.dot"))
            .await?;
        assert!(text.is_none());
        Ok(())
    }
}
