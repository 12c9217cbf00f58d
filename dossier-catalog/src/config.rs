//! Catalog configuration
//!
//! Values are layered: defaults, then an optional TOML file, then environment
//! variables. The CLI applies its own flags on top of the result.
//!
//! ```toml
//! root_dir = "/srv/archive"
//! database_path = "data/index.db"
//!
//! [snippet]
//! open_marker = "<mark>"
//! close_marker = "</mark>"
//!
//! [object_store]
//! enabled = true
//! endpoint = "http://seaweedfs:8333"
//! bucket = "archive"
//! ```

use crate::storage::SnippetConfig;
use anyhow::{Context, Result};
use dossier_extract::ExtractConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ROOT_DIR: &str = "./documents_to_scan";
pub const DEFAULT_DATABASE_PATH: &str = "data/index.db";
pub const DEFAULT_SEARCH_LIMIT: usize = 50;

/// Top-level settings shared by the indexer and the read path.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Directory tree that is scanned and browsed
    pub root_dir: PathBuf,
    /// SQLite catalog file
    pub database_path: PathBuf,
    /// Maximum number of search results
    pub search_limit: usize,
    /// Concurrent extractions while indexing; 1 means sequential
    pub max_workers: usize,
    pub snippet: SnippetConfig,
    pub extract: ExtractConfig,
    pub object_store: ObjectStoreConfig,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from(DEFAULT_ROOT_DIR),
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            search_limit: DEFAULT_SEARCH_LIMIT,
            max_workers: 1,
            snippet: SnippetConfig::default(),
            extract: ExtractConfig::default(),
            object_store: ObjectStoreConfig::default(),
        }
    }
}

/// Connection settings for the S3-compatible object store.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObjectStoreConfig {
    /// Off unless a config file or `S3_ENDPOINT` turns it on
    pub enabled: bool,
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Lifetime of presigned retrieval URLs
    pub url_ttl_secs: u64,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "http://localhost:8333".to_string(),
            bucket: "archive".to_string(),
            region: "us-east-1".to_string(),
            access_key_id: "any".to_string(),
            secret_access_key: "any".to_string(),
            url_ttl_secs: 3600,
        }
    }
}

impl ObjectStoreConfig {
    pub fn url_ttl(&self) -> Duration {
        Duration::from_secs(self.url_ttl_secs)
    }
}

impl CatalogConfig {
    /// Defaults, overlaid with `path` when given, then with the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content)?;
        config.snippet = config.snippet.clone().with_tokens(config.snippet.tokens);
        Ok(config)
    }

    /// Apply `ROOT_DIR`, `DOSSIER_DB`, `S3_*` and `AWS_*` overrides read through `lookup`.
    ///
    /// Setting `S3_ENDPOINT` enables the object store.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = lookup("ROOT_DIR") {
            self.root_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("DOSSIER_DB") {
            self.database_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("S3_ENDPOINT") {
            self.object_store.endpoint = v;
            self.object_store.enabled = true;
        }
        if let Some(v) = lookup("S3_BUCKET") {
            self.object_store.bucket = v;
        }
        if let Some(v) = lookup("S3_REGION") {
            self.object_store.region = v;
        }
        if let Some(v) = lookup("AWS_ACCESS_KEY_ID") {
            self.object_store.access_key_id = v;
        }
        if let Some(v) = lookup("AWS_SECRET_ACCESS_KEY") {
            self.object_store.secret_access_key = v;
        }
        self
    }

    pub fn with_root_dir(mut self, root: impl Into<PathBuf>) -> Self {
        self.root_dir = root.into();
        self
    }

    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = CatalogConfig::default();
        assert_eq!(config.root_dir, PathBuf::from("./documents_to_scan"));
        assert_eq!(config.database_path, PathBuf::from("data/index.db"));
        assert_eq!(config.search_limit, 50);
        assert_eq!(config.snippet, SnippetConfig::default());
        assert_eq!(config.extract.ocr_languages, "eng+tur");
        assert!(!config.object_store.enabled);
        assert_eq!(config.object_store.url_ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_partial_toml() -> Result<()> {
        let config = CatalogConfig::from_toml(
            r#"
            root_dir = "/srv/archive"

            [snippet]
            open_marker = "<mark>"
            close_marker = "</mark>"

            [object_store]
            bucket = "scans"
            "#,
        )?;

        assert_eq!(config.root_dir, PathBuf::from("/srv/archive"));
        assert_eq!(config.database_path, PathBuf::from("data/index.db"));
        assert_eq!(config.snippet.open_marker, "<mark>");
        assert_eq!(config.snippet.tokens, 15);
        assert_eq!(config.object_store.bucket, "scans");
        assert_eq!(config.object_store.region, "us-east-1");
        Ok(())
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("ROOT_DIR", "/mnt/share"),
            ("S3_ENDPOINT", "http://seaweed:8333"),
            ("S3_BUCKET", ""),
            ("AWS_ACCESS_KEY_ID", "AKID"),
        ]
        .into_iter()
        .collect();

        let config = CatalogConfig::default()
            .with_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.root_dir, PathBuf::from("/mnt/share"));
        assert!(config.object_store.enabled);
        assert_eq!(config.object_store.endpoint, "http://seaweed:8333");
        // empty values are ignored
        assert_eq!(config.object_store.bucket, "archive");
        assert_eq!(config.object_store.access_key_id, "AKID");
    }

    #[test]
    fn test_snippet_tokens_are_clamped() -> Result<()> {
        let config = CatalogConfig::from_toml("[snippet]\ntokens = 0")?;
        assert_eq!(config.snippet.tokens, 1);
        let config = CatalogConfig::from_toml("[snippet]\ntokens = 200")?;
        assert_eq!(config.snippet.tokens, 64);
        let config = CatalogConfig::from_toml("[snippet]\ntokens = 30")?;
        assert_eq!(config.snippet.tokens, 30);
        Ok(())
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        assert!(CatalogConfig::from_toml("search_limit = \"many\"").is_err());
    }
}
