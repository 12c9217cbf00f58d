//! Storage layer for the document catalog
//!
//! The catalog is two tables: `files`, one row per distinct original path, and the
//! FTS5 `search_index`, holding at most one text entry per file. Both are
//! append-only; nothing here updates or deletes a row.
//!
//! The indexer writes through [`CatalogStore::insert_if_absent`]; the query engine
//! and resolver only read. [`sqlite_store::SqliteCatalog`] is the concrete store.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;

pub mod sqlite_store;

/// Database ID of a catalogued file.
pub type FileId = i64;

/// One catalogued file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub id: FileId,
    /// Absolute path at indexing time; the catalog-wide dedupe key
    pub original_path: String,
    /// Object-store key when the file was uploaded, `None` for local-only files
    pub processed_path: Option<String>,
    /// MIME type, or `application/octet-stream` when it could not be guessed
    pub file_type: String,
    pub processed_at: NaiveDateTime,
}

impl FileRecord {
    pub fn is_remote(&self) -> bool {
        self.processed_path.is_some()
    }
}

/// A file about to be catalogued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFile {
    pub original_path: String,
    pub processed_path: Option<String>,
    pub file_type: String,
}

impl NewFile {
    pub fn new(original_path: impl Into<String>, file_type: impl Into<String>) -> Self {
        Self {
            original_path: original_path.into(),
            processed_path: None,
            file_type: file_type.into(),
        }
    }

    pub fn with_processed_path(mut self, key: impl Into<String>) -> Self {
        self.processed_path = Some(key.into());
        self
    }
}

/// The searchable text of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchEntry {
    pub file_id: FileId,
    pub content: String,
}

/// Highlighting applied to search snippets.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct SnippetConfig {
    pub open_marker: String,
    pub close_marker: String,
    pub ellipsis: String,
    /// Context window in tokens; FTS5 accepts 1 to 64
    pub tokens: u8,
}

impl Default for SnippetConfig {
    fn default() -> Self {
        Self {
            open_marker: "<b>".to_string(),
            close_marker: "</b>".to_string(),
            ellipsis: "...".to_string(),
            tokens: 15,
        }
    }
}

impl SnippetConfig {
    pub fn with_markers(mut self, open: impl Into<String>, close: impl Into<String>) -> Self {
        self.open_marker = open.into();
        self.close_marker = close.into();
        self
    }

    pub fn with_ellipsis(mut self, ellipsis: impl Into<String>) -> Self {
        self.ellipsis = ellipsis.into();
        self
    }

    pub fn with_tokens(mut self, tokens: u8) -> Self {
        self.tokens = tokens.clamp(1, 64);
        self
    }
}

/// A full-text match as stored, before any presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRow {
    pub original_path: String,
    pub snippet: String,
}

/// Aggregate counts over the whole catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogCounts {
    pub total_files: usize,
    pub searchable_files: usize,
    pub remote_files: usize,
    /// `(mime type, file count)`, most common first
    pub file_types: Vec<(String, usize)>,
    pub database_size_bytes: Option<u64>,
}

/// Persisted catalog operations.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Record a file unless its `original_path` is already catalogued.
    ///
    /// When a row is created and `content` has non-whitespace text, the search entry
    /// is written in the same transaction. Returns the new id, or `None` when the path
    /// was already present (in which case nothing is written).
    async fn insert_if_absent(&self, file: &NewFile, content: Option<&str>)
    -> Result<Option<FileId>>;

    async fn contains(&self, original_path: &str) -> Result<bool>;

    async fn get_file(&self, original_path: &str) -> Result<Option<FileRecord>>;

    async fn get_entry(&self, file_id: FileId) -> Result<Option<SearchEntry>>;

    /// Indexed text of a catalogued path
    async fn content(&self, original_path: &str) -> Result<Option<String>>;

    /// Run an FTS5 match expression, best matches first.
    async fn search(
        &self,
        match_expression: &str,
        snippet: &SnippetConfig,
        limit: usize,
    ) -> Result<Vec<SearchRow>>;

    async fn counts(&self) -> Result<CatalogCounts>;
}
