//! The routine engine.
//!
//! - [`Step`] / [`Routine`] - step-at-a-time workflow execution
//! - [`AttemptCounter`] - per-action retry tallies for polling steps
//! - [`PollPolicy`] - interval and ceiling for one polling step
//! - [`ProgressSink`] - where steps report what they are doing
//! - [`RunLock`] - at most one workflow per process

pub mod attempts;
pub mod executor;
pub mod lock;
pub mod progress;

use std::time::Duration;

pub use attempts::AttemptCounter;
pub use executor::{Routine, Step};
pub use lock::{FileLock, RunGuard, RunLock};
pub use progress::{ProgressLevel, ProgressSink, RecordingSink, RoutineLog, ROUTINE_LOG_SIZE};

/// How a polling step retries: sleep `interval` between attempts and give
/// up once `max_attempts` attempts have failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Same ceiling, no sleeping. Handy for tests and fakes.
    pub const fn immediate(max_attempts: u32) -> Self {
        Self::new(Duration::ZERO, max_attempts)
    }

    /// Sleep out the interval unless it is zero.
    pub fn pause(&self) {
        if !self.interval.is_zero() {
            std::thread::sleep(self.interval);
        }
    }
}
