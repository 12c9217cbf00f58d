//! Remote object storage for catalogued files
//!
//! Files uploaded while indexing are addressed by a key derived from their path
//! under the scan root; that key is what a [`crate::storage::FileRecord`] keeps in
//! `processed_path`. Every call is a single attempt; callers decide what a failure
//! means (the indexer records the file as local-only, the resolver falls back to
//! the local copy).

use crate::config::ObjectStoreConfig;
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

pub mod s3;
pub mod sigv4;

pub use s3::S3ObjectStore;

/// Body of a file, delivered in chunks.
pub type ByteStream = BoxStream<'static, std::io::Result<Vec<u8>>>;

const FILE_CHUNK_SIZE: usize = 64 * 1024;

/// Read `file` to the end in fixed-size chunks.
pub fn file_chunks(file: tokio::fs::File) -> ByteStream {
    futures::stream::try_unfold(file, |mut file| async move {
        let mut buf = vec![0u8; FILE_CHUNK_SIZE];
        let n = file.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok::<_, std::io::Error>(Some((buf, file)))
    })
    .boxed()
}

#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    /// Transport-level failure talking to the store
    #[error("Object store request failed: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    /// The store answered with a non-success status
    #[error("Object store returned {status} for key {key}")]
    Status { key: String, status: u16 },

    /// Endpoint or credentials cannot be used to build requests
    #[error("Object store configuration error: {message}")]
    Config { message: String },

    /// Reading the local file to upload failed
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

/// A fetched object.
pub struct RemoteObject {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: ByteStream,
}

impl std::fmt::Debug for RemoteObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteObject")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn bucket(&self) -> &str;

    /// A URL that allows anyone holding it to GET `key` until it expires.
    async fn presign_get(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, ObjectStoreError>;

    async fn get_object(&self, key: &str) -> Result<RemoteObject, ObjectStoreError>;

    async fn put_object(
        &self,
        key: &str,
        source: &Path,
        content_type: &str,
    ) -> Result<(), ObjectStoreError>;
}

/// The configured object store, or `None` when it is disabled or unusable.
pub fn connect(config: &ObjectStoreConfig) -> Option<Arc<dyn ObjectStore>> {
    if !config.enabled {
        return None;
    }
    match S3ObjectStore::from_config(config) {
        Ok(store) => {
            info!("Using object store {} bucket {}", config.endpoint, config.bucket);
            Some(Arc::new(store))
        }
        Err(e) => {
            warn!("Object store disabled: {}", e);
            None
        }
    }
}

/// Object key for `path` under `root`: the relative path joined with `/`.
///
/// Paths outside `root` fall back to their file name.
pub fn object_key(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) => relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => dossier_extract::display_name(path),
    }
}
