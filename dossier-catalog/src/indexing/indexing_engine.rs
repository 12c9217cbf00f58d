//! Batch indexing: scan, classify, extract, upload and catalogue.
//!
//! ## Pipeline Flow
//!
//! ```text
//! Scanner → detect() → catalogued? ──yes──→ skipped
//!                          │no
//!                          ↓
//!                  ExtractorRegistry (CAD: file name)
//!                          ↓
//!                  ObjectStore::put_object (optional)
//!                          ↓
//!              CatalogStore::insert_if_absent
//! ```
//!
//! A file that fails at any step is logged and the batch moves on. Extraction and
//! upload failures still catalogue the file (without text, or local-only); only a
//! failed catalog write leaves it out, to be retried on the next run.

use crate::indexing::scanner::Scanner;
use crate::object_store::{ObjectStore, object_key};
use crate::storage::{CatalogStore, NewFile};
use anyhow::Result;
use dossier_extract::{
    DetectedFormat, DocumentFormat, ExtractConfig, ExtractorRegistry, detect, display_name,
};
use futures::StreamExt;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Configuration for the indexing engine
#[derive(Debug, Clone)]
pub struct IndexingEngineConfig {
    /// Directory tree to index
    pub root: PathBuf,
    /// Files extracted concurrently; 1 processes the tree sequentially
    pub max_workers: usize,
    /// Settings for the built-in extractors
    pub extract_config: ExtractConfig,
}

impl IndexingEngineConfig {
    /// Sequential indexing of `root` with the default extractors.
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            max_workers: 1,
            extract_config: ExtractConfig::default(),
        }
    }

    /// Set the number of files extracted at once (at least 1).
    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers.max(1);
        self
    }

    pub fn with_extract_config(mut self, config: ExtractConfig) -> Self {
        self.extract_config = config;
        self
    }
}

/// What happened to one scanned path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Not an eligible document type
    Ineligible,
    /// Already in the catalog; not re-extracted
    AlreadyIndexed,
    /// Newly catalogued
    Catalogued {
        searchable: bool,
        uploaded: bool,
        extraction_failed: bool,
    },
    /// The catalog write failed
    Failed,
}

/// Totals for one indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexingReport {
    /// Newly catalogued files
    pub processed: usize,
    /// Eligible files that were already catalogued
    pub skipped: usize,
    /// Files excluded by format detection
    pub ineligible: usize,
    /// Newly catalogued files that received a search entry
    pub searchable: usize,
    /// Newly catalogued files stored in the object store
    pub uploaded: usize,
    /// Newly catalogued files whose extraction failed
    pub extraction_failures: usize,
    /// Files left out because the catalog write failed
    pub failed: usize,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl IndexingReport {
    fn record(&mut self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Ineligible => self.ineligible += 1,
            FileOutcome::AlreadyIndexed => self.skipped += 1,
            FileOutcome::Failed => self.failed += 1,
            FileOutcome::Catalogued {
                searchable,
                uploaded,
                extraction_failed,
            } => {
                self.processed += 1;
                self.searchable += usize::from(*searchable);
                self.uploaded += usize::from(*uploaded);
                self.extraction_failures += usize::from(*extraction_failed);
            }
        }
    }
}

/// Drives a scan of the configured root into a catalog.
///
/// The catalog, extractor registry and object store are all injected; the engine
/// keeps no state between runs beyond what it wrote to the catalog.
pub struct IndexingEngine {
    config: IndexingEngineConfig,
    catalog: Arc<dyn CatalogStore>,
    extractors: ExtractorRegistry,
    object_store: Option<Arc<dyn ObjectStore>>,
}

impl std::fmt::Debug for IndexingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexingEngine")
            .field("config", &self.config)
            .field("extractors", &self.extractors)
            .field("object_store", &self.object_store.as_ref().map(|s| s.bucket().to_string()))
            .finish_non_exhaustive()
    }
}

impl IndexingEngine {
    /// Engine with the standard extractors and no object store.
    pub fn new(config: IndexingEngineConfig, catalog: Arc<dyn CatalogStore>) -> Self {
        let extractors = ExtractorRegistry::standard(&config.extract_config);
        Self {
            config,
            catalog,
            extractors,
            object_store: None,
        }
    }

    /// Replace the extractor registry.
    pub fn with_extractors(mut self, extractors: ExtractorRegistry) -> Self {
        self.extractors = extractors;
        self
    }

    /// Upload newly catalogued files to `store` before recording them.
    pub fn with_object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.object_store = Some(store);
        self
    }

    pub fn config(&self) -> &IndexingEngineConfig {
        &self.config
    }

    /// Index every file under the configured root.
    pub async fn run(&self) -> Result<IndexingReport> {
        let started = Instant::now();
        let scanner = Scanner::new(&self.config.root);
        info!("Scanning {}", scanner.root().display());

        let mut report = IndexingReport::default();
        if self.config.max_workers <= 1 {
            for path in scanner.files() {
                let outcome = self.index_file_under(scanner.root(), &path).await;
                report.record(&outcome);
            }
        } else {
            let root = scanner.root();
            let mut outcomes = futures::stream::iter(scanner.files())
                .map(|path| async move { self.index_file_under(root, &path).await })
                .buffer_unordered(self.config.max_workers);
            while let Some(outcome) = outcomes.next().await {
                report.record(&outcome);
            }
        }

        report.elapsed = started.elapsed();
        info!(
            "Indexing complete! Processed: {}, Already Indexed: {} ({} searchable, {} failed) in {:.1?}",
            report.processed, report.skipped, report.searchable, report.failed, report.elapsed
        );
        Ok(report)
    }

    /// Index one file, keyed for upload relative to the configured root.
    pub async fn index_file(&self, path: &Path) -> FileOutcome {
        let root = Scanner::new(&self.config.root).root().to_path_buf();
        self.index_file_under(&root, path).await
    }

    async fn index_file_under(&self, root: &Path, path: &Path) -> FileOutcome {
        let Some(detected) = detect(path) else {
            debug!("Not an indexable document: {}", path.display());
            return FileOutcome::Ineligible;
        };

        let original_path = path.to_string_lossy().into_owned();
        match self.catalog.contains(&original_path).await {
            Ok(true) => {
                debug!("Already indexed: {}", original_path);
                return FileOutcome::AlreadyIndexed;
            }
            Ok(false) => {}
            // the insert below is authoritative, so a failed lookup is not fatal
            Err(e) => warn!("Catalog lookup failed for {}: {:#}", original_path, e),
        }

        let name = display_name(path);
        info!("Processing: {}", name);

        let (text, extraction_failed) = self.extract(&detected, path, &name).await;
        let processed_path = self.upload(root, path, &detected.mime_type, &name).await;

        let file = NewFile {
            original_path,
            processed_path,
            file_type: detected.mime_type,
        };
        let searchable = text.as_deref().is_some_and(|t| !t.trim().is_empty());

        match self.catalog.insert_if_absent(&file, text.as_deref()).await {
            Ok(Some(_)) => FileOutcome::Catalogued {
                searchable,
                uploaded: file.processed_path.is_some(),
                extraction_failed,
            },
            Ok(None) => {
                debug!("Catalogued concurrently: {}", file.original_path);
                FileOutcome::AlreadyIndexed
            }
            Err(e) => {
                error!("Failed to catalogue {}: {:#}", name, e);
                FileOutcome::Failed
            }
        }
    }

    /// Returns the text (if any) and whether extraction failed.
    async fn extract(
        &self,
        detected: &DetectedFormat,
        path: &Path,
        name: &str,
    ) -> (Option<String>, bool) {
        if detected.format == DocumentFormat::Cad {
            return (Some(name.to_string()), false);
        }

        match self.extractors.extract(detected.format, path).await {
            Ok(text) => (text, false),
            Err(e) => {
                warn!("Error processing {}: {}", name, e);
                (None, true)
            }
        }
    }

    /// Returns the object key when the upload succeeded.
    async fn upload(
        &self,
        root: &Path,
        path: &Path,
        mime_type: &str,
        name: &str,
    ) -> Option<String> {
        let store = self.object_store.as_ref()?;
        let key = object_key(root, path);

        match store.put_object(&key, path, mime_type).await {
            Ok(()) => {
                debug!("Uploaded {} as {}/{}", name, store.bucket(), key);
                Some(key)
            }
            Err(e) => {
                warn!("Upload of {} failed, keeping it local-only: {}", name, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::sqlite_store::SqliteCatalog;
    use async_trait::async_trait;
    use dossier_extract::{ExtractError, Extractor};
    use tempfile::tempdir;
    use tracing_test::traced_test;

    struct FixedText(&'static str);

    #[async_trait]
    impl Extractor for FixedText {
        async fn extract(&self, _path: &Path) -> dossier_extract::Result<Option<String>> {
            Ok(Some(self.0.to_string()))
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct Failing;

    #[async_trait]
    impl Extractor for Failing {
        async fn extract(&self, _path: &Path) -> dossier_extract::Result<Option<String>> {
            Err(ExtractError::ocr("tesseract exited with 1"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn test_registry() -> ExtractorRegistry {
        ExtractorRegistry::empty()
            .register(DocumentFormat::Pdf, Arc::new(FixedText("Invoice 2024")))
            .register(DocumentFormat::Image, Arc::new(Failing))
    }

    async fn engine_for(root: &Path) -> Result<(IndexingEngine, Arc<SqliteCatalog>)> {
        let catalog = Arc::new(SqliteCatalog::open_memory().await?);
        let config = IndexingEngineConfig::new(root.to_path_buf());
        let engine = IndexingEngine::new(config, catalog.clone())
            .with_extractors(test_registry());
        Ok((engine, catalog))
    }

    #[test]
    fn test_config_builders() {
        let config = IndexingEngineConfig::new(PathBuf::from("/srv"))
            .with_max_workers(0)
            .with_extract_config(ExtractConfig::default().with_ocr_languages("deu"));
        assert_eq!(config.max_workers, 1);
        assert_eq!(config.extract_config.ocr_languages, "deu");
    }

    #[tokio::test]
    async fn test_run_counts_outcomes() -> Result<()> {
        let temp_dir = tempdir()?;
        let root = temp_dir.path();
        tokio::fs::write(root.join("a.pdf"), b"%PDF").await?;
        tokio::fs::write(root.join("plan.dwg"), b"AC1032").await?;
        tokio::fs::write(root.join("notes.txt"), b"plain").await?;

        let (engine, catalog) = engine_for(root).await?;
        let report = engine.run().await?;

        assert_eq!(report.processed, 2);
        assert_eq!(report.searchable, 2);
        assert_eq!(report.ineligible, 1);
        assert_eq!(report.skipped, 0);
        assert_eq!(catalog.counts().await?.total_files, 2);
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn test_extraction_failure_is_catalogued_without_text() -> Result<()> {
        let temp_dir = tempdir()?;
        let root = temp_dir.path();
        let scan = root.join("scan.png");
        tokio::fs::write(&scan, b"\x89PNG").await?;

        let (engine, catalog) = engine_for(root).await?;
        let outcome = engine.index_file(&scan).await;

        assert_eq!(
            outcome,
            FileOutcome::Catalogued {
                searchable: false,
                uploaded: false,
                extraction_failed: true
            }
        );
        let record = catalog
            .get_file(&scan.to_string_lossy())
            .await?
            .expect("record");
        assert_eq!(record.file_type, "image/png");
        assert!(catalog.get_entry(record.id).await?.is_none());
        assert!(logs_contain("scan.png"));
        assert!(logs_contain("tesseract exited with 1"));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_extractor_counts_as_failure() -> Result<()> {
        let temp_dir = tempdir()?;
        let root = temp_dir.path();
        let doc = root.join("letter.docx");
        tokio::fs::write(&doc, b"PK").await?;

        let (engine, _catalog) = engine_for(root).await?;
        assert_eq!(
            engine.index_file(&doc).await,
            FileOutcome::Catalogued {
                searchable: false,
                uploaded: false,
                extraction_failed: true
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_workers_match_sequential() -> Result<()> {
        let temp_dir = tempdir()?;
        let root = temp_dir.path();
        for i in 0..12 {
            tokio::fs::write(root.join(format!("doc{i}.pdf")), b"%PDF").await?;
        }

        let catalog = Arc::new(SqliteCatalog::open_memory().await?);
        let engine = IndexingEngine::new(
            IndexingEngineConfig::new(root.to_path_buf()).with_max_workers(4),
            catalog.clone(),
        )
        .with_extractors(test_registry());

        let first = engine.run().await?;
        assert_eq!(first.processed, 12);
        let second = engine.run().await?;
        assert_eq!(second.processed, 0);
        assert_eq!(second.skipped, 12);
        Ok(())
    }
}
