//! The read path: search, preview, browse and fetch
//!
//! [`ReadService`] bundles the operations a front end needs. When the catalog
//! cannot be opened at startup the service still comes up: search answers with no
//! results, previews are empty and files are served from local disk only.

use crate::config::CatalogConfig;
use crate::indexing::scanner::{TreeEntry, list_directory};
use crate::object_store::{self, ObjectStore};
use crate::retrieval::query::{QueryEngine, SearchHit};
use crate::retrieval::resolver::{FileStream, Resolution, ResolveError, Resolver};
use crate::status::{CatalogStatistics, StatusApi};
use crate::storage::CatalogStore;
use crate::storage::sqlite_store::SqliteCatalog;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Preview text for catalogued files that have no search entry.
pub const NO_INDEXED_CONTENT: &str = "No indexed content found.";

pub struct ReadService {
    catalog: Option<Arc<dyn CatalogStore>>,
    database_path: Option<PathBuf>,
    query: Option<QueryEngine>,
    resolver: Resolver,
    root_dir: PathBuf,
}

impl std::fmt::Debug for ReadService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadService")
            .field("available", &self.is_available())
            .field("database_path", &self.database_path)
            .field("resolver", &self.resolver)
            .field("root_dir", &self.root_dir)
            .finish()
    }
}

impl ReadService {
    /// Open the configured catalog read-only, degrading if that fails.
    pub async fn open(config: &CatalogConfig) -> Self {
        let catalog: Option<Arc<dyn CatalogStore>> =
            match SqliteCatalog::open_read_only(&config.database_path).await {
                Ok(catalog) => {
                    info!("Connected to catalog at {}", config.database_path.display());
                    Some(Arc::new(catalog))
                }
                Err(e) => {
                    error!("Catalog unavailable, serving degraded responses: {:#}", e);
                    None
                }
            };

        let mut service = Self::new(config, catalog, object_store::connect(&config.object_store));
        if service.catalog.is_some() {
            service.database_path = Some(config.database_path.clone());
        }
        service
    }

    /// Assemble a service from already-constructed parts.
    pub fn new(
        config: &CatalogConfig,
        catalog: Option<Arc<dyn CatalogStore>>,
        object_store: Option<Arc<dyn ObjectStore>>,
    ) -> Self {
        let query = catalog.as_ref().map(|catalog| {
            QueryEngine::new(catalog.clone())
                .with_snippet_config(config.snippet.clone())
                .with_limit(config.search_limit)
        });
        let resolver = Resolver::new(catalog.clone(), object_store)
            .with_url_ttl(config.object_store.url_ttl());

        Self {
            catalog,
            database_path: None,
            query,
            resolver,
            root_dir: config.root_dir.clone(),
        }
    }

    /// Whether a catalog backs this service.
    pub fn is_available(&self) -> bool {
        self.catalog.is_some()
    }

    /// Search results, or none when the catalog is unavailable or the query fails.
    pub async fn search(&self, query: &str) -> Vec<SearchHit> {
        let Some(engine) = &self.query else {
            return Vec::new();
        };
        match engine.search(query).await {
            Ok(hits) => hits,
            Err(e) => {
                error!("Search for {:?} failed: {:#}", query, e);
                Vec::new()
            }
        }
    }

    /// Indexed text for `path`, [`NO_INDEXED_CONTENT`] when there is none, or an
    /// empty string when the catalog is unavailable or cannot be read.
    pub async fn content(&self, path: &str) -> String {
        let Some(engine) = &self.query else {
            return String::new();
        };
        match engine.content(path).await {
            Ok(Some(content)) => content,
            Ok(None) => NO_INDEXED_CONTENT.to_string(),
            Err(e) => {
                error!("Reading indexed content of {} failed: {:#}", path, e);
                String::new()
            }
        }
    }

    /// Children of `path`, or of the configured root when `path` is `None`.
    pub async fn tree(&self, path: Option<&Path>) -> Vec<TreeEntry> {
        list_directory(path.unwrap_or(&self.root_dir)).await
    }

    pub async fn resolve(&self, path: &str) -> Result<Resolution, ResolveError> {
        self.resolver.resolve(path).await
    }

    /// Open a file for streaming.
    pub async fn file(&self, path: &str) -> Result<FileStream, ResolveError> {
        self.resolver.open(path).await
    }

    /// Catalog statistics, or `None` when the catalog is unavailable.
    pub async fn stats(&self) -> Result<Option<CatalogStatistics>> {
        match &self.catalog {
            Some(catalog) => Ok(Some(
                StatusApi::get_catalog_statistics(catalog.as_ref(), self.database_path.as_deref())
                    .await?,
            )),
            None => Ok(None),
        }
    }
}
