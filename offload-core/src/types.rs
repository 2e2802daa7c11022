//! Domain types for function reconciliation.
//!
//! `DesiredFunctionSpec` is what the caller declares; `RemoteFunctionState`
//! is what the provider reports; `ReconciliationPlan` is the diff between them.

use std::fmt;
use std::io::Read;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{spec_io_err, SpecError};
use crate::naming;

/// Memory bounds accepted by the provider, in MB.
pub const MEMORY_MB_RANGE: RangeInclusive<u32> = 128..=10_240;

/// Ephemeral storage bounds accepted by the provider, in MB.
pub const EPHEMERAL_STORAGE_MB_RANGE: RangeInclusive<u32> = 512..=10_240;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Name of the remote function resource.
///
/// Always produced by [`naming::derive_function_name`] for desired specs;
/// `From` impls exist for provider responses and tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionName(pub String);

impl fmt::Display for FunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for FunctionName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for FunctionName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl AsRef<str> for FunctionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lower-case hex SHA-256 over an artifact's bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentAddress(String);

impl ContentAddress {
    /// Wrap an already-computed digest string.
    pub fn new(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut h = Sha256::new();
        h.update(bytes);
        Self(hex::encode(h.finalize()))
    }

    /// Stream a file through SHA-256 without loading it whole.
    pub fn of_file(path: &Path) -> Result<Self, SpecError> {
        let mut file = std::fs::File::open(path).map_err(|e| spec_io_err(path, e))?;
        let mut h = Sha256::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = file.read(&mut buf).map_err(|e| spec_io_err(path, e))?;
            if n == 0 {
                break;
            }
            h.update(&buf[..n]);
        }
        Ok(Self(hex::encode(h.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Desired state
// ---------------------------------------------------------------------------

/// The three configuration fields reconciled on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionConfiguration {
    pub memory_mb: u32,
    pub role_arn: String,
    pub ephemeral_storage_mb: u32,
}

/// A zip-style deployable staged through the content store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagedArchive {
    pub content_hash: ContentAddress,
    /// Local artifact to upload when the remote checksum differs.
    pub path: PathBuf,
    /// Remote slot key in the content store.
    pub key: String,
    pub runtime: String,
    pub handler: String,
}

impl PackagedArchive {
    /// Build from a local artifact, hashing its current bytes.
    ///
    /// Returns [`SpecError::MissingArtifact`] if the file does not exist.
    pub fn from_file(
        path: impl Into<PathBuf>,
        key: impl Into<String>,
        runtime: impl Into<String>,
        handler: impl Into<String>,
    ) -> Result<Self, SpecError> {
        let path = path.into();
        let content_hash = ContentAddress::of_file(&path)?;
        Ok(Self {
            content_hash,
            path,
            key: key.into(),
            runtime: runtime.into(),
            handler: handler.into(),
        })
    }
}

/// Where the function's code comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeReference {
    ContainerImage { uri: String },
    PackagedArchive(PackagedArchive),
}

impl CodeReference {
    /// Identity used for name derivation: tag-free image repository, or the
    /// archive's remote slot key.
    pub fn normalized_identity(&self) -> String {
        match self {
            CodeReference::ContainerImage { uri } => naming::normalize_image(uri),
            CodeReference::PackagedArchive(archive) => naming::normalize_key(&archive.key),
        }
    }
}

/// Immutable desired specification of the remote function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DesiredFunctionSpec {
    name: FunctionName,
    configuration: FunctionConfiguration,
    code: CodeReference,
}

impl DesiredFunctionSpec {
    /// Validate bounds and derive the function name from `code`.
    pub fn new(configuration: FunctionConfiguration, code: CodeReference) -> Result<Self, SpecError> {
        if !MEMORY_MB_RANGE.contains(&configuration.memory_mb) {
            return Err(SpecError::MemoryOutOfRange {
                value: configuration.memory_mb,
                min: *MEMORY_MB_RANGE.start(),
                max: *MEMORY_MB_RANGE.end(),
            });
        }
        if !EPHEMERAL_STORAGE_MB_RANGE.contains(&configuration.ephemeral_storage_mb) {
            return Err(SpecError::StorageOutOfRange {
                value: configuration.ephemeral_storage_mb,
                min: *EPHEMERAL_STORAGE_MB_RANGE.start(),
                max: *EPHEMERAL_STORAGE_MB_RANGE.end(),
            });
        }
        if configuration.role_arn.trim().is_empty() {
            return Err(SpecError::EmptyRole);
        }
        if code.normalized_identity().is_empty() {
            return Err(SpecError::EmptyCodeReference);
        }
        let name = naming::derive_function_name(&code);
        Ok(Self {
            name,
            configuration,
            code,
        })
    }

    pub fn name(&self) -> &FunctionName {
        &self.name
    }

    pub fn configuration(&self) -> &FunctionConfiguration {
        &self.configuration
    }

    pub fn code(&self) -> &CodeReference {
        &self.code
    }
}

// ---------------------------------------------------------------------------
// Remote state
// ---------------------------------------------------------------------------

/// Provider `State` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionState {
    Pending,
    Active,
    Inactive,
    Failed,
}

/// Provider `LastUpdateStatus` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LastUpdateStatus {
    Successful,
    InProgress,
    Failed,
}

/// Folded lifecycle view of a remote function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionStatus {
    Creating,
    Active,
    Updating,
    Failed,
}

impl fmt::Display for FunctionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionStatus::Creating => write!(f, "creating"),
            FunctionStatus::Active => write!(f, "active"),
            FunctionStatus::Updating => write!(f, "updating"),
            FunctionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Code as reported by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemoteCode {
    pub image_uri: Option<String>,
    pub code_sha256: Option<String>,
}

/// Snapshot fetched fresh on every reconciliation; never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteFunctionState {
    pub configuration: FunctionConfiguration,
    pub code: RemoteCode,
    pub state: FunctionState,
    pub last_update: LastUpdateStatus,
    /// Provider-supplied explanation for a failed state or update.
    pub reason: Option<String>,
}

impl RemoteFunctionState {
    pub fn status(&self) -> FunctionStatus {
        if self.state == FunctionState::Failed || self.last_update == LastUpdateStatus::Failed {
            return FunctionStatus::Failed;
        }
        match (self.state, self.last_update) {
            (FunctionState::Pending | FunctionState::Inactive, _) => FunctionStatus::Creating,
            (_, LastUpdateStatus::InProgress) => FunctionStatus::Updating,
            _ => FunctionStatus::Active,
        }
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// What a reconciliation must do. `needs_create` excludes the other flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationPlan {
    needs_create: bool,
    needs_config_update: bool,
    needs_code_update: bool,
}

impl ReconciliationPlan {
    pub fn create() -> Self {
        Self {
            needs_create: true,
            needs_config_update: false,
            needs_code_update: false,
        }
    }

    pub fn update(needs_config_update: bool, needs_code_update: bool) -> Self {
        Self {
            needs_create: false,
            needs_config_update,
            needs_code_update,
        }
    }

    pub fn needs_create(&self) -> bool {
        self.needs_create
    }

    pub fn needs_config_update(&self) -> bool {
        self.needs_config_update
    }

    pub fn needs_code_update(&self) -> bool {
        self.needs_code_update
    }

    /// No remote mutating call is required.
    pub fn is_noop(&self) -> bool {
        !self.needs_create && !self.needs_config_update && !self.needs_code_update
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
