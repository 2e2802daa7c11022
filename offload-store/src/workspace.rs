//! Ship a working directory to the store and fetch it back on the other side.

use std::path::Path;

use offload_archive::UnpackSummary;
use offload_core::ContentAddress;

use crate::client::ObjectStoreClient;
use crate::error::StoreError;
use crate::gate::{TransferGate, TransferOutcome};
use crate::store::{ContentStore, RetrievalHandle};

/// Suffix of shipped workspace archives.
const ARCHIVE_SUFFIX: &str = ".tar.zst";

/// Result of [`ship_directory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippedWorkspace {
    pub key: String,
    pub checksum: ContentAddress,
    /// Fresh handle, issued whether or not an upload happened.
    pub handle: RetrievalHandle,
    pub uploaded: bool,
}

/// `<prefix>/<name>.tar.zst`, with stray slashes trimmed from `prefix`.
pub fn workspace_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{name}{ARCHIVE_SUFFIX}")
    } else {
        format!("{prefix}/{name}{ARCHIVE_SUFFIX}")
    }
}

/// Pack `dir` and upload it under `key` unless the stored checksum matches.
pub fn ship_directory<C: ObjectStoreClient>(
    store: &ContentStore<C>,
    dir: &Path,
    key: &str,
) -> Result<ShippedWorkspace, StoreError> {
    let bytes = offload_archive::pack(dir)?;
    let checksum = ContentAddress::of_bytes(&bytes);

    let outcome = TransferGate::new(store).upload_if_changed(key, &checksum, &bytes)?;
    let uploaded = outcome.uploaded();
    let handle = match outcome {
        TransferOutcome::Uploaded { handle } => handle,
        TransferOutcome::Unchanged => store.retrieval_handle(key)?,
    };

    tracing::info!(dir = %dir.display(), key, uploaded, bytes = bytes.len(), "shipped workspace");
    Ok(ShippedWorkspace {
        key: key.to_string(),
        checksum,
        handle,
        uploaded,
    })
}

/// Download `handle` and unpack it into `dest`. The temporary download is
/// removed afterwards, even when unpacking fails.
pub fn fetch_directory<C: ObjectStoreClient>(
    store: &ContentStore<C>,
    handle: &RetrievalHandle,
    dest: &Path,
) -> Result<UnpackSummary, StoreError> {
    let archive = store.get(handle)?;
    let result = offload_archive::unpack_file(&archive, dest);
    if let Err(e) = std::fs::remove_file(&archive) {
        tracing::warn!(path = %archive.display(), "failed to remove download: {e}");
    }
    let summary = result?;
    if summary.skipped > 0 {
        tracing::warn!(skipped = summary.skipped, "some archive entries were skipped");
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_key_joins_prefix() {
        assert_eq!(workspace_key("workspaces/", "app"), "workspaces/app.tar.zst");
        assert_eq!(workspace_key("", "app"), "app.tar.zst");
    }
}
