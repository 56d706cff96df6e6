//! Object storage access for documents uploaded through presigned URLs.

use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::{Error as ObjectStoreError, ObjectStoreExt};
use std::time::Duration;
use thiserror::Error;
use time::OffsetDateTime;

/// Prefix under which presigned uploads are stored.
pub const UPLOAD_PREFIX: &str = "uploads";

/// Errors surfaced by the object storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend could not be configured.
    #[error("Storage configuration error: {0}")]
    Config(String),
    /// Requested object does not exist.
    #[error("Stored document not found: {0}")]
    NotFound(String),
    /// Any other backend failure.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Interface implemented by object storage backends.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Public URL of an object.
    fn public_url(&self, key: &str) -> String;

    /// Fetch an object's full contents.
    async fn get(&self, key: &str) -> Result<Bytes, StorageError>;

    /// Delete an object.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Presigned URL a client can `PUT` an object to.
    async fn presigned_upload_url(&self, key: &str, ttl: Duration)
    -> Result<String, StorageError>;

    /// Presigned URL a third party can `GET` an object from.
    async fn presigned_download_url(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<String, StorageError>;
}

/// S3 (or S3-compatible) storage backed by `object_store`.
pub struct S3ObjectStorage {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint_url: Option<String>,
}

impl S3ObjectStorage {
    /// Build a store for `bucket`; credentials come from the standard AWS environment variables.
    pub fn new(
        bucket: impl Into<String>,
        region: impl Into<String>,
        endpoint_url: Option<String>,
    ) -> Result<Self, StorageError> {
        let bucket = bucket.into();
        let region = region.into();
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());
        if let Some(endpoint) = &endpoint_url {
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(endpoint.starts_with("http://"));
        }
        let store = builder
            .build()
            .map_err(|error| StorageError::Config(error.to_string()))?;

        Ok(Self {
            store,
            bucket,
            region,
            endpoint_url,
        })
    }

    async fn signed(
        &self,
        method: Method,
        key: &str,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        let location = Path::from(key);
        let url = self
            .store
            .signed_url(method, &location, ttl)
            .await
            .map_err(|error| StorageError::Backend(error.to_string()))?;
        Ok(url.to_string())
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    fn public_url(&self, key: &str) -> String {
        public_url(&self.bucket, &self.region, self.endpoint_url.as_deref(), key)
    }

    async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        let location = Path::from(key);
        let result = self.store.get(&location).await.map_err(|error| match error {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => StorageError::Backend(other.to_string()),
        })?;
        let bytes = result
            .bytes()
            .await
            .map_err(|error| StorageError::Backend(error.to_string()))?;
        tracing::debug!(bucket = %self.bucket, key, bytes = bytes.len(), "Downloaded stored document");
        Ok(bytes)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let location = Path::from(key);
        self.store
            .delete(&location)
            .await
            .map_err(|error| StorageError::Backend(error.to_string()))?;
        tracing::info!(bucket = %self.bucket, key, "Deleted stored document");
        Ok(())
    }

    async fn presigned_upload_url(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        self.signed(Method::PUT, key, ttl).await
    }

    async fn presigned_download_url(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        self.signed(Method::GET, key, ttl).await
    }
}

/// Public URL of an object: virtual-hosted AWS style, or path style under a custom endpoint.
pub fn public_url(bucket: &str, region: &str, endpoint_url: Option<&str>, key: &str) -> String {
    match endpoint_url {
        Some(endpoint) => format!("{}/{bucket}/{key}", endpoint.trim_end_matches('/')),
        None => format!("https://{bucket}.s3.{region}.amazonaws.com/{key}"),
    }
}

/// Replace every character outside `[a-zA-Z0-9.-]` with `_`.
pub fn sanitize_file_name(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Storage key for a new upload: `uploads/{unix_millis}-{sanitized name}`.
pub fn upload_key(file_name: &str, unix_millis: i128) -> String {
    format!(
        "{UPLOAD_PREFIX}/{unix_millis}-{}",
        sanitize_file_name(file_name)
    )
}

/// Milliseconds since the Unix epoch.
pub fn unix_millis() -> i128 {
    OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000
}
