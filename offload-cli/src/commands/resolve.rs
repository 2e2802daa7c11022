//! `offload resolve`: reconcile, wait for convergence, print the name.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use super::{load_config, reconciler};

/// Arguments for `offload resolve`.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Emit `{"name": ...}` instead of the bare name.
    #[arg(long)]
    pub json: bool,
}

impl ResolveArgs {
    pub fn run(self, config_path: Option<&Path>) -> Result<()> {
        let loaded = load_config(config_path)?;
        let spec = loaded.desired_spec()?;
        let derived = spec.name().clone();

        let name = reconciler(&loaded.config)?
            .resolve(spec)
            .with_context(|| format!("failed to resolve function '{derived}'"))?;

        if self.json {
            println!("{}", serde_json::json!({ "name": name }));
        } else {
            println!("{name}");
        }
        Ok(())
    }
}
