//! Catalog statistics for the `stats` command

use crate::storage::CatalogStore;
use anyhow::Result;
use serde::Serialize;
use std::path::Path;

/// Snapshot of what the catalog holds.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogStatistics {
    /// Catalog file, `None` for in-memory catalogs
    pub database_path: Option<String>,
    pub total_files: usize,
    /// Files with a search entry
    pub searchable_files: usize,
    /// Files stored in the object store
    pub remote_files: usize,
    pub local_only_files: usize,
    /// Files per MIME type, most common first
    pub file_types: Vec<FileTypeCount>,
    /// Database size in bytes, WAL included
    pub database_size_bytes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileTypeCount {
    pub file_type: String,
    pub count: usize,
}

pub struct StatusApi;

impl StatusApi {
    /// Collect statistics from `catalog`, sizing the files at `database_path` when given.
    pub async fn get_catalog_statistics(
        catalog: &dyn CatalogStore,
        database_path: Option<&Path>,
    ) -> Result<CatalogStatistics> {
        let counts = catalog.counts().await?;

        let database_size_bytes = database_path
            .and_then(Self::database_file_size)
            .or(counts.database_size_bytes);

        Ok(CatalogStatistics {
            database_path: database_path.map(|p| p.display().to_string()),
            total_files: counts.total_files,
            searchable_files: counts.searchable_files,
            remote_files: counts.remote_files,
            local_only_files: counts.total_files.saturating_sub(counts.remote_files),
            file_types: counts
                .file_types
                .into_iter()
                .map(|(file_type, count)| FileTypeCount { file_type, count })
                .collect(),
            database_size_bytes,
        })
    }

    /// Main database file plus its write-ahead log, if present.
    fn database_file_size(path: &Path) -> Option<u64> {
        let main = std::fs::metadata(path).ok()?.len();
        let mut wal = path.as_os_str().to_owned();
        wal.push("-wal");
        let wal = std::fs::metadata(&wal).map(|m| m.len()).unwrap_or(0);
        Some(main + wal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{NewFile, sqlite_store::SqliteCatalog};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_statistics_of_memory_catalog() -> Result<()> {
        let catalog = SqliteCatalog::open_memory().await?;
        catalog
            .insert_if_absent(
                &NewFile::new("/a.pdf", "application/pdf").with_processed_path("a.pdf"),
                Some("text"),
            )
            .await?;
        catalog
            .insert_if_absent(&NewFile::new("/b.dwg", "application/octet-stream"), Some("b.dwg"))
            .await?;
        catalog
            .insert_if_absent(&NewFile::new("/c.pdf", "application/pdf"), None)
            .await?;

        let stats = StatusApi::get_catalog_statistics(&catalog, None).await?;
        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.searchable_files, 2);
        assert_eq!(stats.remote_files, 1);
        assert_eq!(stats.local_only_files, 2);
        assert_eq!(
            stats.file_types[0],
            FileTypeCount {
                file_type: "application/pdf".to_string(),
                count: 2
            }
        );
        assert!(stats.database_path.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_statistics_size_file_backed_catalog() -> Result<()> {
        let temp_dir = tempdir()?;
        let db_path = temp_dir.path().join("index.db");
        let catalog = SqliteCatalog::open(&db_path).await?;

        let stats = StatusApi::get_catalog_statistics(&catalog, catalog.db_path()).await?;
        assert!(stats.database_size_bytes.is_some_and(|size| size > 0));
        assert_eq!(stats.total_files, 0);
        Ok(())
    }
}
