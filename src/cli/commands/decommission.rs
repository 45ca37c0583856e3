//! Decommission command implementation.
//!
//! The `mcgov decommission` command deletes the server.

use crate::error::Result;
use crate::governor::Governor;
use crate::routine::ProgressSink;

use super::dispatcher::{Command, CommandResult};

pub struct DecommissionCommand<'a> {
    governor: &'a Governor,
}

impl<'a> DecommissionCommand<'a> {
    pub fn new(governor: &'a Governor) -> Self {
        Self { governor }
    }
}

impl Command for DecommissionCommand<'_> {
    fn execute(&self, sink: &mut dyn ProgressSink) -> Result<CommandResult> {
        let report = self.governor.decommission(sink)?;
        let label = &self.governor.config().instance_label;
        match report.deleted {
            Some(id) => sink.info(&format!("Server '{}' ({}) removed", label, id)),
            None => sink.info(&format!("Server '{}' was not running", label)),
        }
        Ok(CommandResult::success())
    }
}
