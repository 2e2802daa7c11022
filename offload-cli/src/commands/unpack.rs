//! `offload unpack <file> <dest>`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

/// Arguments for `offload unpack`.
#[derive(Args, Debug)]
pub struct UnpackArgs {
    /// Archive produced by `offload pack`.
    pub archive: PathBuf,

    /// Directory to extract into; created if missing.
    pub dest: PathBuf,
}

impl UnpackArgs {
    pub fn run(self) -> Result<()> {
        let summary = offload_archive::unpack_file(&self.archive, &self.dest)
            .with_context(|| format!("failed to unpack '{}'", self.archive.display()))?;

        println!(
            "✓ Unpacked {} files, {} directories into '{}'",
            summary.files,
            summary.directories,
            self.dest.display()
        );
        if summary.skipped > 0 {
            println!(
                "{}",
                format!("  {} unreadable or unsafe entries skipped", summary.skipped).yellow()
            );
        }
        Ok(())
    }
}
