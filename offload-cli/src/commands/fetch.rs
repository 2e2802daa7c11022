//! `offload fetch <handle> <dest>`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use offload_store::{fetch_directory, RetrievalHandle};

use super::{content_store, load_config};

/// Arguments for `offload fetch`.
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Retrieval handle printed by `offload ship`.
    pub handle: String,

    /// Directory to extract into.
    pub dest: PathBuf,
}

impl FetchArgs {
    pub fn run(self, config_path: Option<&Path>) -> Result<()> {
        let loaded = load_config(config_path)?;
        let store = content_store(&loaded.config)?;
        let summary = fetch_directory(&store, &RetrievalHandle::new(self.handle), &self.dest)
            .with_context(|| format!("failed to fetch into '{}'", self.dest.display()))?;

        println!(
            "✓ Fetched {} files into '{}'",
            summary.files,
            self.dest.display()
        );
        Ok(())
    }
}
