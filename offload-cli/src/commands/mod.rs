//! Subcommands, one module each, plus the config plumbing they share.

pub mod fetch;
pub mod init;
pub mod pack;
pub mod plan;
pub mod resolve;
pub mod ship;
pub mod unpack;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use offload_core::{config, DesiredFunctionSpec, OffloadConfig};
use offload_reconcile::{ConvergencePolicy, FunctionReconciler, LambdaProvider};
use offload_store::{ContentStore, S3Client};

/// A parsed config and the directory its relative paths resolve against.
pub struct Loaded {
    pub config: OffloadConfig,
    pub base_dir: PathBuf,
}

impl Loaded {
    pub fn desired_spec(&self) -> Result<DesiredFunctionSpec> {
        self.config
            .function
            .to_spec(&self.base_dir)
            .context("invalid function section in config")
    }
}

/// `--config` if given, else `~/.offload/config.yaml`.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(config::config_path_at(
            &config::home().context("could not determine home directory")?,
        )),
    }
}

pub fn load_config(explicit: Option<&Path>) -> Result<Loaded> {
    let path = config_path(explicit)?;
    let config = config::load_from(&path)?;
    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok(Loaded { config, base_dir })
}

pub fn content_store(config: &OffloadConfig) -> Result<ContentStore<S3Client>> {
    let client = S3Client::from_config(&config.store).context("failed to set up object store client")?;
    Ok(ContentStore::new(
        client,
        config.store.bucket.clone(),
        Duration::from_secs(config.store.presign_ttl_secs),
    ))
}

pub fn reconciler(config: &OffloadConfig) -> Result<FunctionReconciler<LambdaProvider, S3Client>> {
    let provider =
        LambdaProvider::from_config(&config.provider).context("failed to set up function provider")?;
    Ok(FunctionReconciler::new(
        provider,
        content_store(config)?,
        ConvergencePolicy::from(&config.convergence),
    ))
}
