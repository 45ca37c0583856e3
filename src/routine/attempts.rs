//! Keyed attempt tracking for polling steps.

use std::collections::HashMap;

/// Counts failed attempts per named action.
///
/// Unseen actions read as zero. A counter lives inside one workflow
/// context, so counts never leak between runs.
///
/// # Example
///
/// ```
/// use mcgov::routine::AttemptCounter;
///
/// let mut attempts = AttemptCounter::new();
/// assert_eq!(attempts.get("await_shell"), 0);
///
/// attempts.increment("await_shell");
/// assert_eq!(attempts.get("await_shell"), 1);
///
/// attempts.reset("await_shell");
/// assert_eq!(attempts.get("await_shell"), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AttemptCounter {
    attempts: HashMap<String, u32>,
}

impl AttemptCounter {
    /// Create an empty counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current count for `action`.
    pub fn get(&self, action: &str) -> u32 {
        self.attempts.get(action).copied().unwrap_or(0)
    }

    /// Add one to `action` and return the new count.
    pub fn increment(&mut self, action: &str) -> u32 {
        let count = self.attempts.entry(action.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Force `action` back to zero.
    pub fn reset(&mut self, action: &str) {
        self.attempts.insert(action.to_string(), 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_action_reads_zero() {
        let attempts = AttemptCounter::new();
        assert_eq!(attempts.get("wait_for_instance"), 0);
    }

    #[test]
    fn increment_then_get() {
        let mut attempts = AttemptCounter::new();
        assert_eq!(attempts.increment("wait_for_instance"), 1);
        assert_eq!(attempts.get("wait_for_instance"), 1);
        attempts.increment("wait_for_instance");
        assert_eq!(attempts.get("wait_for_instance"), 2);
    }

    #[test]
    fn reset_returns_to_zero() {
        let mut attempts = AttemptCounter::new();
        attempts.increment("await_shell");
        attempts.increment("await_shell");
        attempts.reset("await_shell");
        assert_eq!(attempts.get("await_shell"), 0);
    }

    #[test]
    fn reset_of_unseen_action_is_zero() {
        let mut attempts = AttemptCounter::new();
        attempts.reset("never_seen");
        assert_eq!(attempts.get("never_seen"), 0);
    }

    #[test]
    fn actions_do_not_interfere() {
        let mut attempts = AttemptCounter::new();
        attempts.increment("wait_for_instance");
        attempts.increment("wait_for_instance");
        attempts.increment("await_shell");

        assert_eq!(attempts.get("wait_for_instance"), 2);
        assert_eq!(attempts.get("await_shell"), 1);

        attempts.reset("wait_for_instance");
        assert_eq!(attempts.get("wait_for_instance"), 0);
        assert_eq!(attempts.get("await_shell"), 1);
    }
}
