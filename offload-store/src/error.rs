//! Error types for offload-store.

use std::path::PathBuf;

use thiserror::Error;

use offload_archive::ArchiveError;
use offload_core::SpecError;

use crate::client::ObjectStoreError;

/// All errors that can arise from content-store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The object store rejected or failed an operation. `source` keeps the
    /// classified kind and HTTP status for callers to inspect.
    #[error("object store {operation} {target} failed: {source}")]
    Provider {
        operation: &'static str,
        target: String,
        #[source]
        source: ObjectStoreError,
    },

    /// Local I/O failure, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Includes the missing-artifact case.
    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error("invalid store configuration: {0}")]
    Config(String),
}

impl StoreError {
    /// The classified object-store failure, if this is one.
    pub fn provider_error(&self) -> Option<&ObjectStoreError> {
        match self {
            StoreError::Provider { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`StoreError::Provider`].
pub(crate) fn provider_err(
    operation: &'static str,
    target: impl Into<String>,
    source: ObjectStoreError,
) -> StoreError {
    StoreError::Provider {
        operation,
        target: target.into(),
        source,
    }
}
