//! Error types for governor operations.
//!
//! This module defines [`GovernorError`], the error type shared by the
//! routine engine, the cloud client, the remote shell, and the workflows,
//! plus a [`Result`] alias.
//!
//! # Error Handling Strategy
//!
//! - Transient conditions (instance still booting, SSH not up yet) never
//!   surface here; polling steps retry them internally
//! - [`GovernorError::AttemptsExhausted`] ends a polling step that gave up
//! - Everything else is terminal for the step that hit it

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for governor operations.
#[derive(Debug, Error)]
pub enum GovernorError {
    /// A required setting is absent.
    #[error("Missing required setting: {key}")]
    ConfigMissing { key: String },

    /// A setting is present but cannot be used.
    #[error("Invalid setting {key}: {message}")]
    ConfigInvalid { key: String, message: String },

    /// The cloud API answered with a non-success status.
    #[error("Cloud API call '{operation}' failed with HTTP {status}: {message}")]
    Api {
        operation: String,
        status: u16,
        message: String,
    },

    /// The cloud API could not be reached or returned an unreadable body.
    #[error("Cloud API call '{operation}' failed: {message}")]
    Transport { operation: String, message: String },

    /// The SSH private key could not be loaded.
    #[error("SSH key at {path} is unusable: {message}")]
    KeyUnavailable { path: PathBuf, message: String },

    /// Could not open a remote shell to the host.
    #[error("SSH connection to {host} failed: {message}")]
    ShellConnect { host: String, message: String },

    /// A command run over the remote shell failed.
    #[error("Remote command '{command}' failed: {message}")]
    ShellCommand { command: String, message: String },

    /// A polling step hit its attempt ceiling.
    #[error("Max attempts reached for '{action}' after {attempts} attempts: {last_error}")]
    AttemptsExhausted {
        action: String,
        attempts: u32,
        last_error: String,
    },

    /// A step ran before an earlier step recorded what it needs.
    #[error("Step '{step}' requires {field}, which has not been discovered yet")]
    MissingState { step: String, field: String },

    /// Another workflow holds the run lock.
    #[error("Another workflow is already running")]
    Busy,

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GovernorError {
    /// Whether this error means the run was rejected before starting.
    pub fn is_busy(&self) -> bool {
        matches!(self, GovernorError::Busy)
    }
}

/// Result type alias for governor operations.
pub type Result<T> = std::result::Result<T, GovernorError>;
