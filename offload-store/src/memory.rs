//! In-process [`ObjectStoreClient`] used by tests and dry runs.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::client::{Metadata, ObjectStoreClient, ObjectStoreError};

const HANDLE_SCHEME: &str = "memory://";

#[derive(Debug, Default)]
struct State {
    buckets: BTreeSet<String>,
    denied: BTreeSet<String>,
    moved: BTreeSet<String>,
    objects: BTreeMap<(String, String), (Vec<u8>, Metadata)>,
    puts: usize,
}

/// Buckets and objects held in a mutex-guarded map.
///
/// Handles look like `memory://<bucket>/<key>` and never expire.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    state: Mutex<State>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store with `bucket` already present.
    pub fn with_bucket(bucket: &str) -> Self {
        let store = Self::new();
        store.lock().buckets.insert(bucket.to_string());
        store
    }

    /// Make every call against `bucket` answer [`ObjectStoreError::Forbidden`].
    pub fn deny_access(&self, bucket: &str) {
        self.lock().denied.insert(bucket.to_string());
    }

    /// Make every call against `bucket` answer
    /// [`ObjectStoreError::MovedPermanently`], as for a bucket in another region.
    pub fn move_bucket(&self, bucket: &str) {
        self.lock().moved.insert(bucket.to_string());
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.lock().buckets.contains(bucket)
    }

    /// Stored bytes and metadata of an object.
    pub fn object(&self, bucket: &str, key: &str) -> Option<(Vec<u8>, Metadata)> {
        self.lock()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Number of successful `put_object` calls so far.
    pub fn put_count(&self) -> usize {
        self.lock().puts
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means a test panicked mid-call; the map is still usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl State {
    fn check(&self, bucket: &str) -> Result<(), ObjectStoreError> {
        if self.denied.contains(bucket) {
            return Err(ObjectStoreError::Forbidden);
        }
        if self.moved.contains(bucket) {
            return Err(ObjectStoreError::MovedPermanently);
        }
        if !self.buckets.contains(bucket) {
            return Err(ObjectStoreError::NotFound);
        }
        Ok(())
    }
}

impl ObjectStoreClient for MemoryObjectStore {
    fn head_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError> {
        self.lock().check(bucket)
    }

    fn create_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError> {
        let mut state = self.lock();
        if state.denied.contains(bucket) {
            return Err(ObjectStoreError::Forbidden);
        }
        if !state.buckets.insert(bucket.to_string()) {
            return Err(ObjectStoreError::Status {
                status: 409,
                code: Some("BucketAlreadyOwnedByYou".to_string()),
                message: format!("bucket {bucket} already exists"),
            });
        }
        Ok(())
    }

    fn head_object(&self, bucket: &str, key: &str) -> Result<Metadata, ObjectStoreError> {
        let state = self.lock();
        state.check(bucket)?;
        state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|(_, metadata)| metadata.clone())
            .ok_or(ObjectStoreError::NotFound)
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        metadata: &Metadata,
    ) -> Result<(), ObjectStoreError> {
        let mut state = self.lock();
        state.check(bucket)?;
        state.objects.insert(
            (bucket.to_string(), key.to_string()),
            (body.to_vec(), metadata.clone()),
        );
        state.puts += 1;
        Ok(())
    }

    fn presign_get(&self, bucket: &str, key: &str, _ttl: Duration) -> Result<String, ObjectStoreError> {
        self.lock().check(bucket)?;
        Ok(format!("{HANDLE_SCHEME}{bucket}/{key}"))
    }

    fn download(&self, handle: &str, sink: &mut dyn Write) -> Result<u64, ObjectStoreError> {
        let (bucket, key) = handle
            .strip_prefix(HANDLE_SCHEME)
            .and_then(|rest| rest.split_once('/'))
            .ok_or_else(|| ObjectStoreError::InvalidRequest(format!("not a memory handle: {handle}")))?;
        let body = {
            let state = self.lock();
            state.check(bucket)?;
            state
                .objects
                .get(&(bucket.to_string(), key.to_string()))
                .map(|(body, _)| body.clone())
                .ok_or(ObjectStoreError::NotFound)?
        };
        sink.write_all(&body)?;
        Ok(body.len() as u64)
    }
}
