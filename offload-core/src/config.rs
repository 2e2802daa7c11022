//! YAML configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.offload/
//!   config.yaml   (mode 0600, written by `offload init`)
//! ```
//!
//! # API pattern
//!
//! Every function touching the home directory has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{config_io_err, ConfigError, SpecError};
use crate::types::{CodeReference, DesiredFunctionSpec, FunctionConfiguration, PackagedArchive};

/// Default lifetime of presigned retrieval handles: ten minutes.
pub const DEFAULT_PRESIGN_TTL_SECS: u64 = 600;

/// Template written by `offload init`. Must stay parseable by [`load_from`].
pub const CONFIG_TEMPLATE: &str = r#"# offload configuration
store:
  endpoint: https://s3.us-east-1.amazonaws.com
  region: us-east-1
  bucket: offload-artifacts
  # access_key_id / secret_access_key fall back to AWS_* environment variables.
  presign_ttl_secs: 600
  workspace_prefix: workspaces

provider:
  endpoint: https://lambda.us-east-1.amazonaws.com
  region: us-east-1
  # Status codes that mean "no function service here" rather than "function missing".
  offline_status_codes: [501]

convergence:
  initial_delay_ms: 500
  max_delay_ms: 5000

function:
  memory_mb: 1024
  ephemeral_storage_mb: 1024
  role_arn: arn:aws:iam::123456789012:role/offload-execution
  code:
    image:
      uri: 123456789012.dkr.ecr.us-east-1.amazonaws.com/offload-runner:latest
"#;

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffloadConfig {
    pub store: StoreConfig,
    pub provider: ProviderConfig,
    #[serde(default)]
    pub convergence: ConvergenceConfig,
    pub function: FunctionConfig,
}

/// Object-store connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
    #[serde(default = "default_presign_ttl_secs")]
    pub presign_ttl_secs: u64,
    /// Key prefix for shipped working directories.
    #[serde(default = "default_workspace_prefix")]
    pub workspace_prefix: String,
}

/// Function-service connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub endpoint: String,
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    #[serde(default = "default_offline_status_codes")]
    pub offline_status_codes: Vec<u16>,
}

/// Backoff for convergence polling. There is deliberately no timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceConfig {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Desired function, as written by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionConfig {
    pub memory_mb: u32,
    pub ephemeral_storage_mb: u32,
    pub role_arn: String,
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub code: CodeConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeConfig {
    Image {
        uri: String,
    },
    Archive {
        /// Relative paths resolve against the config file's directory.
        path: PathBuf,
        key: String,
        runtime: String,
        handler: String,
    },
}

impl FunctionConfig {
    /// Build the validated desired spec. Archive artifacts are hashed here,
    /// so a missing artifact surfaces as [`SpecError::MissingArtifact`].
    pub fn to_spec(&self, base_dir: &Path) -> Result<DesiredFunctionSpec, SpecError> {
        let code = match &self.code {
            CodeConfig::Image { uri } => CodeReference::ContainerImage { uri: uri.clone() },
            CodeConfig::Archive {
                path,
                key,
                runtime,
                handler,
            } => CodeReference::PackagedArchive(PackagedArchive::from_file(
                base_dir.join(path),
                key.clone(),
                runtime.clone(),
                handler.clone(),
            )?),
        };
        DesiredFunctionSpec::new(
            FunctionConfiguration {
                memory_mb: self.memory_mb,
                role_arn: self.role_arn.clone(),
                ephemeral_storage_mb: self.ephemeral_storage_mb,
            },
            code,
        )
    }
}

/// Static access key pair plus optional session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl StoreConfig {
    pub fn credentials(&self) -> Option<Credentials> {
        resolve_credentials_with(
            self.access_key_id.as_deref(),
            self.secret_access_key.as_deref(),
            None,
            |k| std::env::var(k).ok(),
        )
    }
}

impl ProviderConfig {
    pub fn credentials(&self) -> Option<Credentials> {
        resolve_credentials_with(
            self.access_key_id.as_deref(),
            self.secret_access_key.as_deref(),
            self.session_token.as_deref(),
            |k| std::env::var(k).ok(),
        )
    }
}

/// Explicit values win; otherwise fall back to `AWS_*` variables via `env`.
/// Returns `None` when either half of the key pair is missing.
pub fn resolve_credentials_with(
    access_key_id: Option<&str>,
    secret_access_key: Option<&str>,
    session_token: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Option<Credentials> {
    let explicit = access_key_id.is_some() && secret_access_key.is_some();
    let (key, secret, token) = if explicit {
        (
            access_key_id.map(str::to_owned),
            secret_access_key.map(str::to_owned),
            session_token.map(str::to_owned),
        )
    } else {
        (
            env("AWS_ACCESS_KEY_ID"),
            env("AWS_SECRET_ACCESS_KEY"),
            env("AWS_SESSION_TOKEN"),
        )
    };
    Some(Credentials {
        access_key_id: key.filter(|k| !k.is_empty())?,
        secret_access_key: secret.filter(|s| !s.is_empty())?,
        session_token: token.filter(|t| !t.is_empty()),
    })
}

fn default_presign_ttl_secs() -> u64 {
    DEFAULT_PRESIGN_TTL_SECS
}

fn default_workspace_prefix() -> String {
    "workspaces".to_string()
}

fn default_offline_status_codes() -> Vec<u16> {
    vec![501]
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    5_000
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// `<home>/.offload/config.yaml`: pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".offload").join("config.yaml")
}

/// Load and parse a config file at an explicit path.
pub fn load_from(path: &Path) -> Result<OffloadConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| config_io_err(path, e))?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load `<home>/.offload/config.yaml`.
pub fn load_at(home: &Path) -> Result<OffloadConfig, ConfigError> {
    load_from(&config_path_at(home))
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<OffloadConfig, ConfigError> {
    load_at(&home()?)
}

/// Atomically save the config: `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, config: &OffloadConfig) -> Result<(), ConfigError> {
    let yaml = serde_yaml::to_string(config)?;
    write_atomic(&config_path_at(home), &yaml)
}

/// Write [`CONFIG_TEMPLATE`] to `<home>/.offload/config.yaml`.
///
/// Refuses to replace an existing file unless `force` is set.
pub fn init_at(home: &Path, force: bool) -> Result<PathBuf, ConfigError> {
    init_to(&config_path_at(home), force)
}

/// Write [`CONFIG_TEMPLATE`] to an explicit path (`--config`).
pub fn init_to(path: &Path, force: bool) -> Result<PathBuf, ConfigError> {
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }
    write_atomic(path, CONFIG_TEMPLATE)?;
    Ok(path.to_path_buf())
}

/// `init_at` convenience wrapper.
pub fn init(force: bool) -> Result<PathBuf, ConfigError> {
    init_at(&home()?, force)
}

/// Home directory from `dirs::home_dir()`.
pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

fn write_atomic(path: &Path, contents: &str) -> Result<(), ConfigError> {
    let Some(dir) = path.parent() else {
        return Err(config_io_err(
            path,
            std::io::Error::other("invalid config path"),
        ));
    };
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| config_io_err(dir, e))?;
        set_permissions(dir, 0o700)?;
    }
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, contents).map_err(|e| config_io_err(&tmp, e))?;
    set_permissions(&tmp, 0o600)?;
    std::fs::rename(&tmp, path).map_err(|e| config_io_err(path, e))?;
    Ok(())
}

#[cfg(unix)]
fn set_permissions(path: &Path, mode: u32) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .map_err(|e| config_io_err(path, e))
}
#[cfg(not(unix))]
fn set_permissions(_path: &Path, _mode: u32) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
