//! Progress reporting from running workflows.
//!
//! Steps report through a [`ProgressSink`]. The engine makes no assumption
//! about what the sink does with a message; it may log it, buffer it, or
//! forward it to a chat message.

use std::collections::VecDeque;
use std::fmt;

/// Severity of a progress message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressLevel {
    Info,
    Error,
}

impl fmt::Display for ProgressLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProgressLevel::Info => "INFO",
            ProgressLevel::Error => "ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Receives progress messages synchronously, in step-execution order.
pub trait ProgressSink {
    /// Accept one message.
    fn report(&mut self, level: ProgressLevel, message: &str);

    /// Shorthand for an [`ProgressLevel::Info`] message.
    fn info(&mut self, message: &str) {
        self.report(ProgressLevel::Info, message);
    }

    /// Shorthand for an [`ProgressLevel::Error`] message.
    fn error(&mut self, message: &str) {
        self.report(ProgressLevel::Error, message);
    }
}

impl<F> ProgressSink for F
where
    F: FnMut(ProgressLevel, &str),
{
    fn report(&mut self, level: ProgressLevel, message: &str) {
        self(level, message)
    }
}

/// A sink that records every event, for tests and transcripts.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Vec<(ProgressLevel, String)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events in the order they arrived.
    pub fn events(&self) -> &[(ProgressLevel, String)] {
        &self.events
    }

    /// Messages reported at `level`.
    pub fn messages(&self, level: ProgressLevel) -> Vec<&str> {
        self.events
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.as_str())
            .collect()
    }

    /// Whether any message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.events.iter().any(|(_, m)| m.contains(needle))
    }
}

impl ProgressSink for RecordingSink {
    fn report(&mut self, level: ProgressLevel, message: &str) {
        self.events.push((level, message.to_string()));
    }
}

/// Number of lines kept by [`RoutineLog`] by default.
pub const ROUTINE_LOG_SIZE: usize = 10;

/// Rolling view over the most recent progress lines.
///
/// Lines are prefixed with `OK > ` or `ERROR > ` and the oldest line drops
/// off once the log is full. [`RoutineLog::render`] pads the view with
/// empty `> ` rows so it keeps a constant height while a run progresses.
///
/// # Example
///
/// ```
/// use mcgov::routine::{ProgressSink, RoutineLog};
///
/// let mut log = RoutineLog::with_capacity(3);
/// log.info("Creating new instance");
/// log.error("Error occurred while creating instance");
///
/// assert_eq!(
///     log.render(),
///     "OK > Creating new instance\nERROR > Error occurred while creating instance\n> "
/// );
/// ```
#[derive(Debug, Clone)]
pub struct RoutineLog {
    capacity: usize,
    lines: VecDeque<String>,
}

impl RoutineLog {
    pub fn new() -> Self {
        Self::with_capacity(ROUTINE_LOG_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            lines: VecDeque::with_capacity(capacity),
        }
    }

    /// Lines currently held, oldest first.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Render the log padded to its capacity.
    pub fn render(&self) -> String {
        let padding = self.capacity.saturating_sub(self.lines.len());
        self.lines
            .iter()
            .cloned()
            .chain(std::iter::repeat_n("> ".to_string(), padding))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for RoutineLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for RoutineLog {
    fn report(&mut self, level: ProgressLevel, message: &str) {
        if self.capacity == 0 {
            return;
        }
        let prefix = match level {
            ProgressLevel::Info => "OK",
            ProgressLevel::Error => "ERROR",
        };
        self.lines.push_back(format!("{} > {}", prefix, message));
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }
}
