//! Error types for offload-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading or saving the YAML configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure, with the path it concerned.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`: cannot locate `~/.offload/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// No config file at the expected path.
    #[error("config not found at {path}; run `offload init` first")]
    ConfigNotFound { path: PathBuf },

    /// The file exists and `init` was not forced.
    #[error("config already exists at {path}")]
    AlreadyExists { path: PathBuf },
}

/// Errors from building a [`crate::DesiredFunctionSpec`].
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("memory {value} MB is outside {min}..={max} MB")]
    MemoryOutOfRange { value: u32, min: u32, max: u32 },

    #[error("ephemeral storage {value} MB is outside {min}..={max} MB")]
    StorageOutOfRange { value: u32, min: u32, max: u32 },

    #[error("execution role ARN must not be empty")]
    EmptyRole,

    #[error("code reference is empty")]
    EmptyCodeReference,

    /// The deployable artifact the function config points at does not exist locally.
    /// Signals a packaging/build defect, never a remote condition.
    #[error("deployable artifact missing at {path}")]
    MissingArtifact { path: PathBuf },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn config_io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}

pub fn spec_io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SpecError {
    if source.kind() == std::io::ErrorKind::NotFound {
        return SpecError::MissingArtifact { path: path.into() };
    }
    SpecError::Io {
        path: path.into(),
        source,
    }
}
