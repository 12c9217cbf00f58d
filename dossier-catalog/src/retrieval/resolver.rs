//! Map a catalogued path to retrievable bytes.
//!
//! Resolution is a small state machine:
//!
//! ```text
//! LookupKey ──key──→ TryRemote ──ok──→ Done
//!     │                  │err (warn)
//!     │no key            ↓
//!     └────────────→ FallbackLocal ──ok──→ Done
//!                        │err
//!                        ↓
//!                      Failed  (ResolveError::NotFound)
//! ```
//!
//! A remote failure is never returned to the caller; it only shows up as a warning
//! and a local fallback. The same machine backs both [`Resolver::resolve`], which
//! hands out a location, and [`Resolver::open`], which streams the bytes.

use crate::object_store::{ByteStream, ObjectStore, ObjectStoreError, file_chunks};
use crate::storage::CatalogStore;
use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

const DEFAULT_URL_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("File not found or inaccessible: {path}")]
    NotFound { path: String },
}

/// Where a file can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum Resolution {
    /// Presigned object-store URL, valid for the resolver's TTL
    Remote { key: String, url: String },
    Local { path: PathBuf },
}

/// Which tier served a [`FileStream`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum Origin {
    Remote { key: String },
    Local { path: PathBuf },
}

/// An opened file.
pub struct FileStream {
    pub origin: Origin,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: ByteStream,
}

impl std::fmt::Debug for FileStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStream")
            .field("origin", &self.origin)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

impl FileStream {
    /// Drain the body into memory.
    pub async fn into_bytes(mut self) -> std::io::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        while let Some(chunk) = self.body.next().await {
            bytes.extend_from_slice(&chunk?);
        }
        Ok(bytes)
    }
}

#[derive(Debug)]
enum ResolveState<T> {
    LookupKey,
    TryRemote { key: String },
    FallbackLocal,
    Done(T),
    Failed,
}

/// What the machine produces once a tier answers.
#[async_trait]
trait Target: Send + Sync {
    type Output: Send;

    async fn remote(
        &self,
        store: &dyn ObjectStore,
        key: &str,
    ) -> Result<Self::Output, ObjectStoreError>;

    async fn local(&self, path: &Path) -> std::io::Result<Self::Output>;
}

struct MintLocation {
    url_ttl: Duration,
}

#[async_trait]
impl Target for MintLocation {
    type Output = Resolution;

    async fn remote(
        &self,
        store: &dyn ObjectStore,
        key: &str,
    ) -> Result<Resolution, ObjectStoreError> {
        let url = store.presign_get(key, self.url_ttl).await?;
        Ok(Resolution::Remote {
            key: key.to_string(),
            url,
        })
    }

    async fn local(&self, path: &Path) -> std::io::Result<Resolution> {
        open_local_file(path).await?;
        Ok(Resolution::Local {
            path: path.to_path_buf(),
        })
    }
}

struct OpenStream;

#[async_trait]
impl Target for OpenStream {
    type Output = FileStream;

    async fn remote(
        &self,
        store: &dyn ObjectStore,
        key: &str,
    ) -> Result<FileStream, ObjectStoreError> {
        let object = store.get_object(key).await?;
        Ok(FileStream {
            origin: Origin::Remote {
                key: key.to_string(),
            },
            content_type: object.content_type,
            content_length: object.content_length,
            body: object.body,
        })
    }

    async fn local(&self, path: &Path) -> std::io::Result<FileStream> {
        let (file, len) = open_local_file(path).await?;
        let body = file_chunks(file);

        Ok(FileStream {
            origin: Origin::Local {
                path: path.to_path_buf(),
            },
            content_type: dossier_extract::detect(path).map(|d| d.mime_type),
            content_length: Some(len),
            body,
        })
    }
}

/// Open a regular file for reading, returning it with its length.
async fn open_local_file(path: &Path) -> std::io::Result<(tokio::fs::File, u64)> {
    let file = tokio::fs::File::open(path).await?;
    let metadata = file.metadata().await?;
    if !metadata.is_file() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "not a regular file",
        ));
    }
    Ok((file, metadata.len()))
}

/// Resolves catalogued paths against the object store, falling back to local disk.
///
/// Both collaborators are optional: without a catalog every lookup goes straight to
/// the local file, and without an object store remote keys are ignored.
#[derive(Clone)]
pub struct Resolver {
    catalog: Option<Arc<dyn CatalogStore>>,
    object_store: Option<Arc<dyn ObjectStore>>,
    url_ttl: Duration,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("has_catalog", &self.catalog.is_some())
            .field("object_store", &self.object_store.as_ref().map(|s| s.bucket().to_string()))
            .field("url_ttl", &self.url_ttl)
            .finish()
    }
}

impl Resolver {
    pub fn new(
        catalog: Option<Arc<dyn CatalogStore>>,
        object_store: Option<Arc<dyn ObjectStore>>,
    ) -> Self {
        Self {
            catalog,
            object_store,
            url_ttl: DEFAULT_URL_TTL,
        }
    }

    pub fn with_url_ttl(mut self, ttl: Duration) -> Self {
        self.url_ttl = ttl;
        self
    }

    /// Where `original_path` can be fetched: a presigned URL or the local path.
    pub async fn resolve(&self, original_path: &str) -> Result<Resolution, ResolveError> {
        self.run(
            original_path,
            &MintLocation {
                url_ttl: self.url_ttl,
            },
        )
        .await
    }

    /// Open `original_path` for streaming, from the object store when possible.
    pub async fn open(&self, original_path: &str) -> Result<FileStream, ResolveError> {
        self.run(original_path, &OpenStream).await
    }

    async fn run<T: Target>(
        &self,
        original_path: &str,
        target: &T,
    ) -> Result<T::Output, ResolveError> {
        let mut state = ResolveState::LookupKey;
        loop {
            state = match state {
                ResolveState::LookupKey => self.lookup_key(original_path).await,
                ResolveState::TryRemote { key } => self.try_remote(&key, target).await,
                ResolveState::FallbackLocal => match target.local(Path::new(original_path)).await {
                    Ok(output) => ResolveState::Done(output),
                    Err(e) => {
                        debug!("Local copy of {} unavailable: {}", original_path, e);
                        ResolveState::Failed
                    }
                },
                ResolveState::Done(output) => return Ok(output),
                ResolveState::Failed => {
                    return Err(ResolveError::NotFound {
                        path: original_path.to_string(),
                    });
                }
            };
        }
    }

    async fn lookup_key<O>(&self, original_path: &str) -> ResolveState<O> {
        let Some(catalog) = &self.catalog else {
            return ResolveState::FallbackLocal;
        };

        match catalog.get_file(original_path).await {
            Ok(Some(record)) => match record.processed_path {
                Some(key) if self.object_store.is_some() => ResolveState::TryRemote { key },
                _ => ResolveState::FallbackLocal,
            },
            Ok(None) => ResolveState::FallbackLocal,
            Err(e) => {
                error!("Catalog lookup failed for {}: {:#}", original_path, e);
                ResolveState::FallbackLocal
            }
        }
    }

    async fn try_remote<T: Target>(&self, key: &str, target: &T) -> ResolveState<T::Output> {
        let Some(store) = &self.object_store else {
            return ResolveState::FallbackLocal;
        };

        match target.remote(store.as_ref(), key).await {
            Ok(output) => ResolveState::Done(output),
            Err(e) => {
                warn!(
                    "Object store fetch failed for key {}, falling back to local file: {}",
                    key, e
                );
                ResolveState::FallbackLocal
            }
        }
    }
}
