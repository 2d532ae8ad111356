//! Remote object store access for vendor data feeds (S3 compatible).

use bytes::Bytes;
use chrono::{DateTime, Utc};
use object_store::{aws::AmazonS3Builder, memory::InMemory, path::Path, ObjectStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

use dmis_common::{DmisError, DmisResult};

/// Configuration for the remote store connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteStoreConfig {
    /// Custom endpoint URL (None for AWS S3 proper)
    pub endpoint: Option<String>,
    /// Bucket name
    pub bucket: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// AWS region
    pub region: String,
    /// Allow HTTP (for local MinIO)
    pub allow_http: bool,
}

impl Default for RemoteStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            bucket: "tw-dmis".to_string(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            region: "us-east-1".to_string(),
            allow_http: false,
        }
    }
}

/// Reference to one object in the remote store.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteObjectRef {
    /// Full object key within the bucket
    pub key: String,
    /// Last-modified timestamp reported by the store
    pub last_modified: DateTime<Utc>,
}

impl RemoteObjectRef {
    /// Final path segment of the key.
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

/// Remote store client for vendor feed data.
pub struct RemoteStore {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl RemoteStore {
    /// Create a new client from config.
    pub fn new(config: &RemoteStoreConfig) -> DmisResult<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&config.bucket)
            .with_access_key_id(&config.access_key_id)
            .with_secret_access_key(&config.secret_access_key)
            .with_region(&config.region);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint);
        }
        if config.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = builder.build().map_err(|e| {
            DmisError::RemoteStoreError(format!("Failed to create S3 client: {}", e))
        })?;

        Ok(Self {
            store: Arc::new(store),
            bucket: config.bucket.clone(),
        })
    }

    /// Create a client backed by an in-memory store.
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            bucket: "memory".to_string(),
        }
    }

    /// Write bytes to a key. Feeds are read-only for the services; this
    /// backs tests and local seeding.
    pub async fn put(&self, key: &str, data: Bytes) -> DmisResult<()> {
        let location = Path::from(key);

        self.store
            .put(&location, data.into())
            .await
            .map_err(|e| DmisError::RemoteStoreError(format!("Failed to write {}: {}", key, e)))?;

        Ok(())
    }

    /// Read a whole object.
    #[instrument(skip(self), fields(bucket = %self.bucket, key = %key))]
    pub async fn get(&self, key: &str) -> DmisResult<Bytes> {
        let location = Path::from(key);

        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| DmisError::RemoteStoreError(format!("Failed to read {}: {}", key, e)))?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| DmisError::RemoteStoreError(format!("Failed to read bytes: {}", e)))?;

        debug!(size = bytes.len(), "Read object");
        Ok(bytes)
    }

    /// List objects under a directory prefix.
    ///
    /// Prefixes match whole path segments; narrowing by file-name prefix
    /// within a directory is the caller's job.
    pub async fn list(&self, dir: &str) -> DmisResult<Vec<RemoteObjectRef>> {
        use futures::TryStreamExt;

        let prefix = Path::from(dir);
        let mut objects = Vec::new();

        let mut stream = self.store.list(Some(&prefix));
        while let Some(meta) = stream
            .try_next()
            .await
            .map_err(|e| DmisError::RemoteStoreError(format!("List failed: {}", e)))?
        {
            objects.push(RemoteObjectRef {
                key: meta.location.to_string(),
                last_modified: meta.last_modified,
            });
        }

        debug!(count = objects.len(), prefix = %dir, "Listed objects");
        Ok(objects)
    }
}
