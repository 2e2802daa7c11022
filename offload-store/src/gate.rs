//! Checksum-gated uploads.
//!
//! ## Protocol
//!
//! 1. Hash the artifact locally (caller supplies the [`ContentAddress`]).
//! 2. Read the remote object's metadata.
//! 3. Compare the `checksum` entry with the local address; skip if equal.
//! 4. Upload with the address attached as the `checksum` entry.

use std::path::Path;

use offload_core::error::spec_io_err;
use offload_core::ContentAddress;

use crate::client::{Metadata, ObjectStoreClient};
use crate::error::StoreError;
use crate::store::{ContentStore, RetrievalHandle};

/// Metadata entry holding an object's content address.
pub const CHECKSUM_METADATA_KEY: &str = "checksum";

/// Outcome of a gated upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Content differed (or was absent) and has been uploaded.
    Uploaded { handle: RetrievalHandle },
    /// Remote checksum already matches; nothing was sent.
    Unchanged,
}

impl TransferOutcome {
    pub fn uploaded(&self) -> bool {
        matches!(self, TransferOutcome::Uploaded { .. })
    }
}

pub struct TransferGate<'a, C> {
    store: &'a ContentStore<C>,
}

impl<'a, C: ObjectStoreClient> TransferGate<'a, C> {
    pub fn new(store: &'a ContentStore<C>) -> Self {
        Self { store }
    }

    /// Whether `key` is missing or carries a different checksum than `address`.
    pub fn needs_upload(&self, key: &str, address: &ContentAddress) -> Result<bool, StoreError> {
        let stored = self.store.get_metadata(key)?;
        let matches = stored
            .as_ref()
            .and_then(|metadata| metadata.get(CHECKSUM_METADATA_KEY))
            .is_some_and(|checksum| checksum == address.as_str());
        Ok(!matches)
    }

    /// Upload `body` under `key` unless the stored checksum equals `address`.
    pub fn upload_if_changed(
        &self,
        key: &str,
        address: &ContentAddress,
        body: &[u8],
    ) -> Result<TransferOutcome, StoreError> {
        if !self.needs_upload(key, address)? {
            tracing::debug!(key, checksum = %address, "unchanged, skipping upload");
            return Ok(TransferOutcome::Unchanged);
        }

        self.upload(key, address, body)
    }

    /// As [`upload_if_changed`](Self::upload_if_changed), reading the file
    /// only when an upload is actually needed.
    pub fn upload_file_if_changed(
        &self,
        key: &str,
        address: &ContentAddress,
        path: &Path,
    ) -> Result<TransferOutcome, StoreError> {
        if !self.needs_upload(key, address)? {
            tracing::debug!(key, checksum = %address, "unchanged, skipping upload");
            return Ok(TransferOutcome::Unchanged);
        }
        let body = std::fs::read(path).map_err(|e| spec_io_err(path, e))?;
        self.upload(key, address, &body)
    }

    fn upload(
        &self,
        key: &str,
        address: &ContentAddress,
        body: &[u8],
    ) -> Result<TransferOutcome, StoreError> {
        let mut metadata = Metadata::new();
        metadata.insert(CHECKSUM_METADATA_KEY.to_string(), address.to_string());
        let handle = self.store.put(key, body, &metadata)?;
        tracing::info!(key, checksum = %address, "uploaded");
        Ok(TransferOutcome::Uploaded { handle })
    }
}
