//! Offload: keep a remote function in sync and ship work to it.
//!
//! # Usage
//!
//! ```text
//! offload init [--force]
//! offload plan [--json]
//! offload resolve [--json]
//! offload pack <dir> -o <file>
//! offload unpack <file> <dest>
//! offload ship <dir> [--key <key>]
//! offload fetch <handle> <dest>
//! ```
//!
//! Every command accepts `--config <path>` (default `~/.offload/config.yaml`)
//! and `-v` / `-vv` for more log output on stderr.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{
    fetch::FetchArgs, init::InitArgs, pack::PackArgs, plan::PlanArgs, resolve::ResolveArgs,
    ship::ShipArgs, unpack::UnpackArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "offload",
    version,
    about = "Reconcile a remote function and ship working directories to it",
    long_about = None,
)]
struct Cli {
    /// Config file to use instead of ~/.offload/config.yaml.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a template config file.
    Init(InitArgs),

    /// Show what `resolve` would do, without changing anything.
    Plan(PlanArgs),

    /// Create or update the function until it is ready, then print its name.
    Resolve(ResolveArgs),

    /// Pack a directory into a compressed archive.
    Pack(PackArgs),

    /// Extract an archive into a directory.
    Unpack(UnpackArgs),

    /// Pack a directory and upload it unless unchanged; print a retrieval handle.
    Ship(ShipArgs),

    /// Download a retrieval handle and extract it.
    Fetch(FetchArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Init(args) => args.run(config),
        Commands::Plan(args) => args.run(config),
        Commands::Resolve(args) => args.run(config),
        Commands::Pack(args) => args.run(),
        Commands::Unpack(args) => args.run(),
        Commands::Ship(args) => args.run(config),
        Commands::Fetch(args) => args.run(config),
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
