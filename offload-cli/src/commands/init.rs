//! `offload init [--force]`

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use offload_core::config;

/// Write a template config file.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Replace an existing config file.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self, config_path: Option<&Path>) -> Result<()> {
        let path = match config_path {
            Some(path) => config::init_to(path, self.force),
            None => config::init(self.force),
        }
        .context("failed to write config")?;

        println!("✓ Wrote {}", path.display());
        println!("  Edit the store, provider and function sections, then run `offload plan`.");
        Ok(())
    }
}
