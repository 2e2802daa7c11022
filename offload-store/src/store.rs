//! [`ContentStore`]: one bucket of blobs behind an [`ObjectStoreClient`].

use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use crate::client::{Metadata, ObjectStoreClient, ObjectStoreError};
use crate::error::{io_err, provider_err, StoreError};

/// Pre-authorized, time-limited URL for one stored object.
///
/// This is the only thing handed across the process boundary; bucket and key
/// stay inside the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RetrievalHandle(String);

impl RetrievalHandle {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The URL without its query string, which carries the signature.
    pub fn without_query(&self) -> &str {
        self.0.split_once('?').map_or(self.0.as_str(), |(base, _)| base)
    }
}

impl fmt::Display for RetrievalHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an object lives, for provider APIs that take bucket + key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLocation {
    pub bucket: String,
    pub key: String,
}

pub struct ContentStore<C> {
    client: C,
    bucket: String,
    presign_ttl: Duration,
}

impl<C: ObjectStoreClient> ContentStore<C> {
    pub fn new(client: C, bucket: impl Into<String>, presign_ttl: Duration) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            presign_ttl,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn location(&self, key: &str) -> StorageLocation {
        StorageLocation {
            bucket: self.bucket.clone(),
            key: key.to_string(),
        }
    }

    /// Whether `bucket` exists. Not-found, forbidden and moved-permanently
    /// all count as "absent"; any other failure is returned.
    pub fn exists(&self, bucket: &str) -> Result<bool, StoreError> {
        match self.client.head_bucket(bucket) {
            Ok(()) => Ok(true),
            Err(
                ObjectStoreError::NotFound
                | ObjectStoreError::Forbidden
                | ObjectStoreError::MovedPermanently,
            ) => Ok(false),
            Err(e) => Err(provider_err("head-bucket", bucket, e)),
        }
    }

    /// Create this store's bucket when [`exists`](Self::exists) says it is
    /// absent. A concurrent creator makes this fail; it is not retried.
    pub fn ensure_container(&self) -> Result<(), StoreError> {
        if self.exists(&self.bucket)? {
            return Ok(());
        }
        tracing::info!(bucket = %self.bucket, "creating bucket");
        self.client
            .create_bucket(&self.bucket)
            .map_err(|e| provider_err("create-bucket", &self.bucket, e))
    }

    /// Metadata of `key`, or `None` when the object (or bucket) is absent.
    pub fn get_metadata(&self, key: &str) -> Result<Option<Metadata>, StoreError> {
        match self.client.head_object(&self.bucket, key) {
            Ok(metadata) => Ok(Some(metadata)),
            Err(ObjectStoreError::NotFound) => Ok(None),
            Err(e) => Err(provider_err("head-object", self.target(key), e)),
        }
    }

    /// Upload `body` under `key` and return a fresh retrieval handle.
    pub fn put(
        &self,
        key: &str,
        body: &[u8],
        metadata: &Metadata,
    ) -> Result<RetrievalHandle, StoreError> {
        self.ensure_container()?;
        self.client
            .put_object(&self.bucket, key, body, metadata)
            .map_err(|e| provider_err("put-object", self.target(key), e))?;
        tracing::debug!(key, bytes = body.len(), "uploaded object");
        self.retrieval_handle(key)
    }

    /// Presign a handle for an object already in the store.
    pub fn retrieval_handle(&self, key: &str) -> Result<RetrievalHandle, StoreError> {
        self.client
            .presign_get(&self.bucket, key, self.presign_ttl)
            .map(RetrievalHandle)
            .map_err(|e| provider_err("presign", self.target(key), e))
    }

    /// Download `handle` into a new temporary file. The caller owns the file.
    pub fn get(&self, handle: &RetrievalHandle) -> Result<PathBuf, StoreError> {
        let mut tmp = tempfile::Builder::new()
            .prefix("offload-")
            .tempfile()
            .map_err(|e| io_err(std::env::temp_dir(), e))?;
        let bytes = self
            .client
            .download(handle.as_str(), tmp.as_file_mut())
            .map_err(|e| provider_err("download", handle.without_query(), e))?;
        tmp.as_file_mut()
            .flush()
            .map_err(|e| io_err(tmp.path(), e))?;

        let path = tmp
            .into_temp_path()
            .keep()
            .map_err(|e| io_err(e.path.to_path_buf(), e.error))?;
        tracing::debug!(path = %path.display(), bytes, "downloaded object");
        Ok(path)
    }

    fn target(&self, key: &str) -> String {
        format!("{}/{}", self.bucket, key)
    }
}
