//! `offload ship <dir> [--key <key>]`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use offload_store::{ship_directory, workspace_key};

use super::{content_store, load_config};

/// Arguments for `offload ship`.
#[derive(Args, Debug)]
pub struct ShipArgs {
    /// Working directory to ship.
    pub dir: PathBuf,

    /// Object key; defaults to `<workspace_prefix>/<dir name>.tar.zst`.
    #[arg(long)]
    pub key: Option<String>,
}

impl ShipArgs {
    pub fn run(self, config_path: Option<&Path>) -> Result<()> {
        let loaded = load_config(config_path)?;
        let key = match self.key {
            Some(key) => key,
            None => {
                let dir = self
                    .dir
                    .canonicalize()
                    .with_context(|| format!("cannot resolve path '{}'", self.dir.display()))?;
                let name = dir
                    .file_name()
                    .and_then(|n| n.to_str())
                    .context("directory has no usable name; pass --key")?;
                workspace_key(&loaded.config.store.workspace_prefix, name)
            }
        };

        let store = content_store(&loaded.config)?;
        let shipped = ship_directory(&store, &self.dir, &key)
            .with_context(|| format!("failed to ship '{}'", self.dir.display()))?;

        let verb = if shipped.uploaded { "uploaded" } else { "unchanged" };
        eprintln!("✓ {} ({verb}, checksum {})", shipped.key, shipped.checksum);
        println!("{}", shipped.handle);
        Ok(())
    }
}
