//! The provisioning and decommissioning workflows.
//!
//! Both are fixed sequences of [`Step`](crate::routine::Step) variants
//! driven by a [`Routine`](crate::routine::Routine):
//!
//! - [`provision`] - ensure instance and volume exist, wait for SSH,
//!   attach and mount the volume
//! - [`decommission`] - delete the instance, keep the volume

pub mod decommission;
pub mod provision;

pub use decommission::{DecommissionContext, DecommissionStep};
pub use provision::{ProvisionContext, ProvisionStep};

use crate::error::{GovernorError, Result};
use crate::routine::ProgressSink;

/// Report `message` at error level and hand back `err`.
fn fail<T>(sink: &mut dyn ProgressSink, message: &str, err: GovernorError) -> Result<T> {
    sink.error(message);
    Err(err)
}

/// Fetch a value an earlier step should have discovered, reporting an
/// error to `sink` when it is missing.
fn require<'a>(
    sink: &mut dyn ProgressSink,
    value: Option<&'a str>,
    step: &str,
    field: &str,
) -> Result<&'a str> {
    match value {
        Some(value) => Ok(value),
        None => missing(sink, step, field),
    }
}

/// Report and build a [`GovernorError::MissingState`].
fn missing<T>(sink: &mut dyn ProgressSink, step: &str, field: &str) -> Result<T> {
    fail(
        sink,
        &format!("Cannot run {}: {} is not known yet", step, field),
        GovernorError::MissingState {
            step: step.to_string(),
            field: field.to_string(),
        },
    )
}

/// Write a discovered value unless one is already recorded.
fn record_once(slot: &mut Option<String>, value: &str, field: &str) {
    match slot {
        Some(existing) if existing != value => {
            tracing::warn!(
                "Ignoring {} {}: already recorded {}",
                field,
                value,
                existing
            );
        }
        Some(_) => {}
        None => *slot = Some(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routine::{ProgressLevel, RecordingSink};

    #[test]
    fn record_once_keeps_first_value() {
        let mut slot = None;
        record_once(&mut slot, "i-1", "instance id");
        record_once(&mut slot, "i-2", "instance id");
        assert_eq!(slot.as_deref(), Some("i-1"));
    }

    #[test]
    fn require_reports_missing_field() {
        let mut sink = RecordingSink::new();
        let err = require(&mut sink, None, "attach-block-storage", "a volume id").unwrap_err();
        assert!(err.to_string().contains("attach-block-storage"));
        assert!(err.to_string().contains("a volume id"));
        assert_eq!(
            sink.messages(ProgressLevel::Error),
            vec!["Cannot run attach-block-storage: a volume id is not known yet"]
        );
    }

    #[test]
    fn require_passes_known_value_silently() {
        let mut sink = RecordingSink::new();
        assert_eq!(require(&mut sink, Some("v-1"), "mount-volume", "x").unwrap(), "v-1");
        assert!(sink.events().is_empty());
    }

    #[test]
    fn fail_reports_error_level() {
        let mut sink = RecordingSink::new();
        let result: Result<()> = fail(&mut sink, "Error deleting instance", GovernorError::Busy);
        assert!(result.is_err());
        assert_eq!(sink.messages(ProgressLevel::Error), vec!["Error deleting instance"]);
    }
}
