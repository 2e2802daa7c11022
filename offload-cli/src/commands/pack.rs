//! `offload pack <dir> -o <file>`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use offload_core::ContentAddress;

/// Arguments for `offload pack`.
#[derive(Args, Debug)]
pub struct PackArgs {
    /// Directory to pack.
    pub dir: PathBuf,

    /// Archive file to write.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: PathBuf,
}

impl PackArgs {
    pub fn run(self) -> Result<()> {
        let bytes = offload_archive::pack_to_file(&self.dir, &self.output)
            .with_context(|| format!("failed to pack '{}'", self.dir.display()))?;
        let checksum = ContentAddress::of_file(&self.output)
            .with_context(|| format!("failed to hash '{}'", self.output.display()))?;

        println!(
            "✓ Packed '{}' → '{}' ({bytes} bytes)",
            self.dir.display(),
            self.output.display()
        );
        println!("  checksum: {checksum}");
        Ok(())
    }
}
