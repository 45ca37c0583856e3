//! Command-line interface for mcgov.
//!
//! # Architecture
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations
//! - [`sink`] - Progress output for the terminal

pub mod args;
pub mod commands;
pub mod sink;

pub use args::{Cli, Commands};
pub use commands::{Command, CommandDispatcher, CommandResult};
pub use sink::TerminalSink;
