//! mcgov - Provision and tear down a Vultr-hosted game server.
//!
//! Provisioning ensures a labeled instance and a labeled block storage
//! volume exist, waits until the instance answers over SSH, then attaches
//! and mounts the volume. Decommissioning deletes the instance and keeps the
//! volume, so world data survives between sessions.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`cloud`] - Cloud API abstraction, Vultr client, and in-memory fake
//! - [`config`] - Settings resolution from `.env` and the environment
//! - [`error`] - Error types and result aliases
//! - [`governor`] - Locked entry points for the workflows
//! - [`remote`] - SSH key loading and remote shell execution
//! - [`routine`] - Step executor, attempt counting, progress, run lock
//! - [`workflows`] - The provisioning and decommissioning steps
//!
//! # Example
//!
//! ```
//! use mcgov::routine::{ProgressSink, RoutineLog};
//!
//! let mut log = RoutineLog::with_capacity(2);
//! log.info("Creating new instance");
//! assert_eq!(log.render(), "OK > Creating new instance\n> ");
//! ```
//!
//! For full workflow runs against the fakes, see the integration tests.

pub mod cli;
pub mod cloud;
pub mod config;
pub mod error;
pub mod governor;
pub mod remote;
pub mod routine;
pub mod workflows;

pub use error::{GovernorError, Result};
pub use governor::{DecommissionReport, Governor, ProvisionReport};
