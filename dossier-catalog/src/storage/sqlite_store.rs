//! SQLite implementation of [`CatalogStore`]
//!
//! ## Schema
//!
//! ```sql
//! CREATE TABLE files (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     original_path TEXT UNIQUE NOT NULL,
//!     processed_path TEXT NULL,          -- object-store key
//!     file_type TEXT NOT NULL,
//!     processed_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
//! );
//!
//! CREATE VIRTUAL TABLE search_index USING fts5(
//!     file_id UNINDEXED,
//!     content,
//!     tokenize='trigram'
//! );
//! ```
//!
//! The trigram tokenizer makes every substring of three or more characters
//! matchable, which is what lets a phrase query find words inside compound
//! words and part numbers.
//!
//! The writer opens the database in WAL mode so that readers opened with
//! [`SqliteCatalog::open_read_only`] keep a consistent view while indexing runs.

use super::{
    CatalogCounts, CatalogStore, FileId, FileRecord, NewFile, SearchEntry, SearchRow, SnippetConfig,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

const READ_POOL_SIZE: u32 = 8;

/// The document catalog in a SQLite database.
#[derive(Clone, Debug)]
pub struct SqliteCatalog {
    /// `None` for in-memory catalogs
    db_path: Option<PathBuf>,
    pool: SqlitePool,
}

impl SqliteCatalog {
    /// Open (creating if needed) the catalog for writing.
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(db_path)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .busy_timeout(Duration::from_secs(5))
                .create_if_missing(true),
        )
        .await
        .with_context(|| format!("opening catalog {}", db_path.display()))?;

        Self::create_tables(&pool).await?;
        Ok(Self {
            db_path: Some(db_path.to_path_buf()),
            pool,
        })
    }

    /// Open an existing catalog for the read path.
    ///
    /// Fails when the file does not exist; the schema is not created.
    pub async fn open_read_only(db_path: &Path) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(READ_POOL_SIZE)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(db_path)
                    .read_only(true)
                    .create_if_missing(false)
                    .busy_timeout(Duration::from_secs(5)),
            )
            .await
            .with_context(|| format!("opening catalog {} read-only", db_path.display()))?;

        // a readable file that is not a catalog is as unusable as a missing one
        sqlx::query("SELECT 1 FROM files LIMIT 1")
            .fetch_optional(&pool)
            .await
            .with_context(|| format!("{} is not a document catalog", db_path.display()))?;

        Ok(Self {
            db_path: Some(db_path.to_path_buf()),
            pool,
        })
    }

    /// In-memory catalog for tests.
    pub async fn open_memory() -> Result<Self> {
        // every connection to :memory: is its own database, so keep exactly one alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?)
            .await?;
        Self::create_tables(&pool).await?;
        Ok(Self {
            db_path: None,
            pool,
        })
    }

    async fn create_tables(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                original_path TEXT UNIQUE NOT NULL,
                processed_path TEXT,
                file_type TEXT NOT NULL,
                processed_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE IF NOT EXISTS search_index USING fts5(
                file_id UNINDEXED,
                content,
                tokenize='trigram'
            )
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Get the underlying SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn file_from_row(row: &SqliteRow) -> Result<FileRecord> {
        Ok(FileRecord {
            id: row.try_get("id")?,
            original_path: row.try_get("original_path")?,
            processed_path: row.try_get("processed_path")?,
            file_type: row.try_get("file_type")?,
            processed_at: row.try_get::<NaiveDateTime, _>("processed_at")?,
        })
    }

    async fn count(&self, sql: &str) -> Result<usize> {
        let n: i64 = sqlx::query_scalar(sql).fetch_one(&self.pool).await?;
        Ok(n as usize)
    }

    async fn database_size(&self) -> Result<u64> {
        let page_size: i64 = sqlx::query_scalar("PRAGMA page_size")
            .fetch_one(&self.pool)
            .await?;
        let page_count: i64 = sqlx::query_scalar("PRAGMA page_count")
            .fetch_one(&self.pool)
            .await?;
        Ok((page_size * page_count) as u64)
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalog {
    async fn insert_if_absent(
        &self,
        file: &NewFile,
        content: Option<&str>,
    ) -> Result<Option<FileId>> {
        let mut tx = self.pool.begin().await?;

        let id: Option<FileId> = sqlx::query_scalar(
            r#"
            INSERT INTO files (original_path, processed_path, file_type)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(original_path) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&file.original_path)
        .bind(&file.processed_path)
        .bind(&file.file_type)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(id) = id else {
            debug!("{} already catalogued", file.original_path);
            tx.rollback().await?;
            return Ok(None);
        };

        if let Some(text) = content.filter(|text| !text.trim().is_empty()) {
            sqlx::query("INSERT INTO search_index (file_id, content) VALUES (?1, ?2)")
                .bind(id)
                .bind(text)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(Some(id))
    }

    async fn contains(&self, original_path: &str) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM files WHERE original_path = ?1")
            .bind(original_path)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn get_file(&self, original_path: &str) -> Result<Option<FileRecord>> {
        let row = sqlx::query(
            "SELECT id, original_path, processed_path, file_type, processed_at
             FROM files WHERE original_path = ?1",
        )
        .bind(original_path)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::file_from_row).transpose()
    }

    async fn get_entry(&self, file_id: FileId) -> Result<Option<SearchEntry>> {
        let content: Option<String> =
            sqlx::query_scalar("SELECT content FROM search_index WHERE file_id = ?1")
                .bind(file_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(content.map(|content| SearchEntry { file_id, content }))
    }

    async fn content(&self, original_path: &str) -> Result<Option<String>> {
        let content = sqlx::query_scalar(
            r#"
            SELECT search_index.content
            FROM search_index
            JOIN files ON search_index.file_id = files.id
            WHERE files.original_path = ?1
            "#,
        )
        .bind(original_path)
        .fetch_optional(&self.pool)
        .await?;
        Ok(content)
    }

    async fn search(
        &self,
        match_expression: &str,
        snippet: &SnippetConfig,
        limit: usize,
    ) -> Result<Vec<SearchRow>> {
        let rows = sqlx::query(
            r#"
            SELECT files.original_path AS original_path,
                   snippet(search_index, 1, ?1, ?2, ?3, ?4) AS snippet
            FROM search_index
            JOIN files ON search_index.file_id = files.id
            WHERE search_index MATCH ?5
            ORDER BY rank
            LIMIT ?6
            "#,
        )
        .bind(&snippet.open_marker)
        .bind(&snippet.close_marker)
        .bind(&snippet.ellipsis)
        .bind(i64::from(snippet.tokens))
        .bind(match_expression)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(SearchRow {
                    original_path: row.try_get("original_path")?,
                    snippet: row.try_get("snippet")?,
                })
            })
            .collect()
    }

    async fn counts(&self) -> Result<CatalogCounts> {
        let type_rows = sqlx::query(
            "SELECT file_type, COUNT(*) AS n FROM files
             GROUP BY file_type ORDER BY n DESC, file_type",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut file_types = Vec::with_capacity(type_rows.len());
        for row in &type_rows {
            let n: i64 = row.try_get("n")?;
            file_types.push((row.try_get("file_type")?, n as usize));
        }

        Ok(CatalogCounts {
            total_files: self.count("SELECT COUNT(*) FROM files").await?,
            searchable_files: self.count("SELECT COUNT(*) FROM search_index").await?,
            remote_files: self
                .count("SELECT COUNT(*) FROM files WHERE processed_path IS NOT NULL")
                .await?,
            file_types,
            database_size_bytes: self.database_size().await.ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn pdf(path: &str) -> NewFile {
        NewFile::new(path, "application/pdf")
    }

    #[tokio::test]
    async fn test_insert_if_absent_creates_record_and_entry() -> Result<()> {
        let catalog = SqliteCatalog::open_memory().await?;

        let id = catalog
            .insert_if_absent(&pdf("/docs/a.pdf"), Some("Invoice 2024 total"))
            .await?
            .expect("new row");

        let record = catalog.get_file("/docs/a.pdf").await?.expect("record");
        assert_eq!(record.id, id);
        assert_eq!(record.file_type, "application/pdf");
        assert!(!record.is_remote());

        let entry = catalog.get_entry(id).await?.expect("entry");
        assert_eq!(entry.content, "Invoice 2024 total");
        Ok(())
    }

    #[tokio::test]
    async fn test_second_insert_is_a_no_op() -> Result<()> {
        let catalog = SqliteCatalog::open_memory().await?;

        assert!(
            catalog
                .insert_if_absent(&pdf("/docs/a.pdf"), Some("first"))
                .await?
                .is_some()
        );
        assert!(
            catalog
                .insert_if_absent(&pdf("/docs/a.pdf"), Some("second"))
                .await?
                .is_none()
        );

        assert_eq!(catalog.content("/docs/a.pdf").await?.as_deref(), Some("first"));
        let counts = catalog.counts().await?;
        assert_eq!(counts.total_files, 1);
        assert_eq!(counts.searchable_files, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_blank_text_creates_no_entry() -> Result<()> {
        let catalog = SqliteCatalog::open_memory().await?;

        let id = catalog
            .insert_if_absent(&pdf("/docs/scan.pdf"), Some("  \n\t "))
            .await?
            .expect("new row");
        assert!(catalog.get_entry(id).await?.is_none());

        let id = catalog
            .insert_if_absent(&NewFile::new("/docs/template.dot", "application/msword"), None)
            .await?
            .expect("new row");
        assert!(catalog.get_entry(id).await?.is_none());
        assert!(catalog.contains("/docs/template.dot").await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_processed_path_is_kept() -> Result<()> {
        let catalog = SqliteCatalog::open_memory().await?;
        let file = pdf("/docs/a.pdf").with_processed_path("projects/a.pdf");
        catalog.insert_if_absent(&file, None).await?;

        let record = catalog.get_file("/docs/a.pdf").await?.expect("record");
        assert_eq!(record.processed_path.as_deref(), Some("projects/a.pdf"));
        assert!(record.is_remote());
        Ok(())
    }

    #[tokio::test]
    async fn test_trigram_phrase_search_with_snippet() -> Result<()> {
        let catalog = SqliteCatalog::open_memory().await?;
        catalog
            .insert_if_absent(&pdf("/docs/a.pdf"), Some("Invoice 2024 for Müller GmbH"))
            .await?;
        catalog
            .insert_if_absent(&pdf("/docs/b.pdf"), Some("Delivery note"))
            .await?;

        let rows = catalog
            .search("\"voice\"", &SnippetConfig::default(), 50)
            .await?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].original_path, "/docs/a.pdf");
        assert!(rows[0].snippet.contains("<b>"));

        let rows = catalog.search("\"xyz\"", &SnippetConfig::default(), 50).await?;
        assert!(rows.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_search_limit() -> Result<()> {
        let catalog = SqliteCatalog::open_memory().await?;
        for i in 0..5 {
            catalog
                .insert_if_absent(&pdf(&format!("/docs/{i}.pdf")), Some("common words"))
                .await?;
        }
        let rows = catalog
            .search("\"common\"", &SnippetConfig::default(), 3)
            .await?;
        assert_eq!(rows.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_counts_by_type_and_residency() -> Result<()> {
        let catalog = SqliteCatalog::open_memory().await?;
        catalog
            .insert_if_absent(&pdf("/a.pdf").with_processed_path("a.pdf"), Some("x y z"))
            .await?;
        catalog.insert_if_absent(&pdf("/b.pdf"), None).await?;
        catalog
            .insert_if_absent(&NewFile::new("/c.png", "image/png"), None)
            .await?;

        let counts = catalog.counts().await?;
        assert_eq!(counts.total_files, 3);
        assert_eq!(counts.searchable_files, 1);
        assert_eq!(counts.remote_files, 1);
        assert_eq!(
            counts.file_types,
            vec![
                ("application/pdf".to_string(), 2),
                ("image/png".to_string(), 1)
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_read_only_sees_writer_and_rejects_writes() -> Result<()> {
        let dir = tempdir()?;
        let db_path = dir.path().join("data").join("index.db");

        let writer = SqliteCatalog::open(&db_path).await?;
        writer
            .insert_if_absent(&pdf("/docs/a.pdf"), Some("Angebot"))
            .await?;

        let reader = SqliteCatalog::open_read_only(&db_path).await?;
        assert_eq!(reader.content("/docs/a.pdf").await?.as_deref(), Some("Angebot"));
        assert!(
            reader
                .insert_if_absent(&pdf("/docs/b.pdf"), Some("x"))
                .await
                .is_err()
        );

        // rows committed after the reader opened are visible to it
        writer.insert_if_absent(&pdf("/docs/c.pdf"), None).await?;
        assert!(reader.contains("/docs/c.pdf").await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_read_only_requires_existing_catalog() -> Result<()> {
        let dir = tempdir()?;
        assert!(
            SqliteCatalog::open_read_only(&dir.path().join("missing.db"))
                .await
                .is_err()
        );

        let stray = dir.path().join("stray.db");
        tokio::fs::write(&stray, b"").await?;
        assert!(SqliteCatalog::open_read_only(&stray).await.is_err());
        Ok(())
    }
}
