//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait and is routed to by
//! [`CommandDispatcher`].

pub mod decommission;
pub mod dispatcher;
pub mod provision;

pub use dispatcher::{Command, CommandDispatcher, CommandResult};
