//! Terminal progress output.

use console::{style, Term};
use tracing::debug;

use crate::routine::{ProgressLevel, ProgressSink, RoutineLog};

/// Prints progress lines as they arrive and keeps a [`RoutineLog`] of the
/// most recent ones.
///
/// Info lines go to stdout and are suppressed in quiet mode. Error lines
/// always go to stderr. Every line is also mirrored to tracing at debug
/// level.
pub struct TerminalSink {
    quiet: bool,
    out: Term,
    err: Term,
    log: RoutineLog,
}

impl TerminalSink {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            out: Term::stdout(),
            err: Term::stderr(),
            log: RoutineLog::new(),
        }
    }

    /// The rolling log of recent lines.
    pub fn log(&self) -> &RoutineLog {
        &self.log
    }
}

impl ProgressSink for TerminalSink {
    fn report(&mut self, level: ProgressLevel, message: &str) {
        debug!("[{}] {}", level, message);
        self.log.report(level, message);

        // Terminal write errors are ignored.
        let _ = match level {
            ProgressLevel::Info if self.quiet => Ok(()),
            ProgressLevel::Info => self
                .out
                .write_line(&format!("{} {}", style("OK").green(), message)),
            ProgressLevel::Error => self
                .err
                .write_line(&format!("{} {}", style("ERROR").red().bold(), message)),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_sink_still_keeps_log() {
        let mut sink = TerminalSink::new(true);
        sink.info("Creating new instance");
        sink.error("Error occurred while creating instance");

        let lines: Vec<&str> = sink.log().lines().collect();
        assert_eq!(
            lines,
            vec![
                "OK > Creating new instance",
                "ERROR > Error occurred while creating instance"
            ]
        );
    }
}
