//! S3-compatible object store over plain HTTP
//!
//! Requests use path-style addressing (`{endpoint}/{bucket}/{key}`), which is what
//! self-hosted stores such as SeaweedFS and MinIO expect, and are authorized with
//! SigV4 presigned query strings, so GET and PUT share one signing path.

use super::sigv4::{Credentials, PresignRequest, presign_query, uri_encode};
use super::{ObjectStore, ObjectStoreError, RemoteObject, file_chunks};
use crate::config::ObjectStoreConfig;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client, Url};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Lifetime of the URLs this client signs for its own GET/PUT calls.
const REQUEST_URL_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    endpoint: Url,
    bucket: String,
    region: String,
    credentials: Credentials,
}

impl S3ObjectStore {
    pub fn new(
        endpoint: &str,
        bucket: impl Into<String>,
        region: impl Into<String>,
        credentials: Credentials,
    ) -> Result<Self, ObjectStoreError> {
        let endpoint = Url::parse(endpoint).map_err(|e| ObjectStoreError::Config {
            message: format!("invalid endpoint {endpoint}: {e}"),
        })?;
        if endpoint.host_str().is_none() {
            return Err(ObjectStoreError::Config {
                message: format!("endpoint {endpoint} has no host"),
            });
        }

        Ok(Self {
            client: Client::new(),
            endpoint,
            bucket: bucket.into(),
            region: region.into(),
            credentials,
        })
    }

    pub fn from_config(config: &ObjectStoreConfig) -> Result<Self, ObjectStoreError> {
        Self::new(
            &config.endpoint,
            config.bucket.clone(),
            config.region.clone(),
            Credentials {
                access_key_id: config.access_key_id.clone(),
                secret_access_key: config.secret_access_key.clone(),
            },
        )
    }

    /// `Host` header value the HTTP client will send for this endpoint.
    fn host(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    fn canonical_uri(&self, key: &str) -> String {
        let base = self.endpoint.path().trim_end_matches('/');
        format!(
            "{base}/{}/{}",
            uri_encode(&self.bucket, false),
            uri_encode(key, true)
        )
    }

    pub(crate) fn presigned_url(&self, method: &str, key: &str, expires_in: Duration) -> String {
        let canonical_uri = self.canonical_uri(key);
        let host = self.host();
        let query = presign_query(
            &PresignRequest {
                method,
                host: &host,
                canonical_uri: &canonical_uri,
                region: &self.region,
                service: "s3",
                timestamp: chrono::Utc::now(),
                expires_in,
            },
            &self.credentials,
        );
        format!(
            "{}://{host}{canonical_uri}?{query}",
            self.endpoint.scheme()
        )
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn presign_get(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, ObjectStoreError> {
        Ok(self.presigned_url("GET", key, expires_in))
    }

    async fn get_object(&self, key: &str) -> Result<RemoteObject, ObjectStoreError> {
        let url = self.presigned_url("GET", key, REQUEST_URL_TTL);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ObjectStoreError::Status {
                key: key.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_length = response.content_length();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(std::io::Error::other))
            .boxed();

        Ok(RemoteObject {
            content_type,
            content_length,
            body,
        })
    }

    async fn put_object(
        &self,
        key: &str,
        source: &Path,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let file = tokio::fs::File::open(source).await?;
        let len = file.metadata().await?.len();
        debug!("Uploading {} bytes to {}/{}", len, self.bucket, key);

        // S3 rejects chunked uploads, so the length is sent up front
        let url = self.presigned_url("PUT", key, REQUEST_URL_TTL);
        let response = self
            .client
            .put(url)
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, len)
            .body(Body::wrap_stream(file_chunks(file)))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ObjectStoreError::Status {
                key: key.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
