//! Command dispatching.
//!
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::path::{Path, PathBuf};

use tracing::info;

use crate::cli::args::{Cli, Commands};
use crate::config::GovernorConfig;
use crate::error::Result;
use crate::governor::Governor;
use crate::routine::{FileLock, ProgressSink};

use super::decommission::DecommissionCommand;
use super::provision::ProvisionCommand;

/// Trait for command implementations.
pub trait Command {
    /// Execute the command, reporting progress to `sink`.
    fn execute(&self, sink: &mut dyn ProgressSink) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    pub success: bool,

    /// Process exit status (0 for success, non-zero for failure).
    pub exit_code: u8,
}

impl CommandResult {
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    pub fn failure(exit_code: u8) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    env_file: PathBuf,
    lock_file: PathBuf,
}

impl CommandDispatcher {
    pub fn new(env_file: PathBuf, lock_file: PathBuf) -> Self {
        Self {
            env_file,
            lock_file,
        }
    }

    pub fn env_file(&self) -> &Path {
        &self.env_file
    }

    pub fn lock_file(&self) -> &Path {
        &self.lock_file
    }

    /// Resolve settings, take the lock file, wire up the real cloud and
    /// SSH, and run the requested command.
    ///
    /// Fails with [`GovernorError::Busy`](crate::GovernorError::Busy) when
    /// another invocation holds the lock file.
    pub fn dispatch(&self, cli: &Cli, sink: &mut dyn ProgressSink) -> Result<CommandResult> {
        let config = GovernorConfig::load(&self.env_file)?;
        info!(
            "Using API key {} against {}",
            config.masked_api_key(),
            config.api_url
        );

        let mut lock = FileLock::open(&self.lock_file)?;
        lock.run_exclusive(|| {
            let governor = Governor::from_config(config)?;
            Self::dispatch_with(&governor, cli.command, sink)
        })
    }

    /// Run `command` against an already built governor.
    pub fn dispatch_with(
        governor: &Governor,
        command: Commands,
        sink: &mut dyn ProgressSink,
    ) -> Result<CommandResult> {
        match command {
            Commands::Provision => ProvisionCommand::new(governor).execute(sink),
            Commands::Decommission => DecommissionCommand::new(governor).execute(sink),
        }
    }
}
