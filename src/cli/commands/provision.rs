//! Provision command implementation.
//!
//! The `mcgov provision` command brings the server up.

use crate::error::Result;
use crate::governor::Governor;
use crate::routine::ProgressSink;

use super::dispatcher::{Command, CommandResult};

pub struct ProvisionCommand<'a> {
    governor: &'a Governor,
}

impl<'a> ProvisionCommand<'a> {
    pub fn new(governor: &'a Governor) -> Self {
        Self { governor }
    }
}

impl Command for ProvisionCommand<'_> {
    fn execute(&self, sink: &mut dyn ProgressSink) -> Result<CommandResult> {
        let report = self.governor.provision(sink)?;
        sink.info(&format!(
            "Server '{}' ready at {}",
            self.governor.config().instance_label,
            report.address
        ));
        Ok(CommandResult::success())
    }
}
