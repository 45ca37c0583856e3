//! CLI argument definitions.
//!
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// mcgov - Provision and tear down a Vultr game server.
#[derive(Debug, Parser)]
#[command(name = "mcgov")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Settings file, overlaid by the process environment
    #[arg(long, global = true, default_value = ".env", env = "MCGOV_ENV_FILE")]
    pub env_file: PathBuf,

    /// Lock file shared by concurrent invocations [default: <tmp>/mcgov.lock]
    #[arg(long, global = true, env = "MCGOV_LOCK_FILE")]
    pub lock_file: Option<PathBuf>,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print the rolling routine log after the run
    #[arg(long, global = true)]
    pub transcript: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// The lock file to use, falling back to one in the temp directory.
    pub fn lock_file(&self) -> PathBuf {
        self.lock_file
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("mcgov.lock"))
    }
}

/// Available subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Create (or reuse) the server and mount its world volume
    Provision,

    /// Delete the server, keeping the world volume
    Decommission,
}
