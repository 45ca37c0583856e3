//! Remote shell access to provisioned instances.
//!
//! - [`SshKey`] - a validated private key on disk
//! - [`ShellConnector`] - opens a [`RemoteShell`] to a host
//! - [`OpenSshConnector`] - drives the system `ssh` client
//! - [`MockConnector`] - scripted fake for tests

pub mod mock;
pub mod ssh;

use std::path::{Path, PathBuf};

use crate::error::{GovernorError, Result};

pub use mock::MockConnector;
pub use ssh::OpenSshConnector;

/// A private key that was readable and looked like a key when loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshKey {
    path: PathBuf,
}

impl SshKey {
    /// Load and sanity-check the key at `path`.
    ///
    /// Failure here is a precondition problem, never a transient one.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| GovernorError::KeyUnavailable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if !content.contains("PRIVATE KEY") {
            return Err(GovernorError::KeyUnavailable {
                path: path.to_path_buf(),
                message: "file does not contain a private key".to_string(),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// An open shell session on a remote host.
pub trait RemoteShell: Send {
    /// Run `command` and return its standard output.
    fn run(&mut self, command: &str) -> Result<String>;

    fn host(&self) -> &str;
}

/// Opens shell sessions.
pub trait ShellConnector: Send + Sync {
    /// Connect as `user` to `host`.
    ///
    /// A host that is not reachable yet yields
    /// [`GovernorError::ShellConnect`]; callers may retry that. Any other
    /// error is final.
    fn connect(&self, user: &str, host: &str, key: &SshKey) -> Result<Box<dyn RemoteShell>>;
}
