//! Step-at-a-time workflow driver.
//!
//! A [`Routine`] owns a workflow context and the step queued to run next.
//! Each [`Routine::advance`] runs exactly one step, which hands back the
//! step to queue after it (or `None` once the workflow is done).

use std::fmt::Debug;

use tracing::debug;

use crate::error::Result;

use super::progress::ProgressSink;

/// One named unit of workflow logic.
///
/// Workflows implement this on an enum of their step identifiers, so the
/// "next step" is plain data rather than a function pointer.
pub trait Step: Copy + Debug {
    /// Data shared by every step of the workflow.
    type Context;

    /// Name used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Run the step, returning the step to queue next.
    ///
    /// Returning `Ok(None)` finishes the workflow. A step that fails should
    /// report an error-level message to `sink` before returning `Err`.
    fn execute(
        &self,
        context: &mut Self::Context,
        sink: &mut dyn ProgressSink,
    ) -> Result<Option<Self>>;
}

/// Drives a workflow one step at a time.
///
/// # Example
///
/// ```
/// use mcgov::routine::{ProgressSink, RecordingSink, Routine, Step};
///
/// #[derive(Debug, Clone, Copy)]
/// enum Count {
///     Tick,
/// }
///
/// impl Step for Count {
///     type Context = u32;
///
///     fn name(&self) -> &'static str {
///         "tick"
///     }
///
///     fn execute(&self, ctx: &mut u32, sink: &mut dyn ProgressSink) -> mcgov::Result<Option<Self>> {
///         *ctx += 1;
///         sink.info(&format!("tick {}", ctx));
///         Ok(if *ctx < 3 { Some(Count::Tick) } else { None })
///     }
/// }
///
/// let mut sink = RecordingSink::new();
/// let mut routine = Routine::new(Count::Tick, 0, &mut sink);
/// routine.run().unwrap();
/// assert!(routine.finished());
/// assert_eq!(*routine.context(), 3);
/// ```
pub struct Routine<'s, S: Step> {
    queued: Option<S>,
    context: S::Context,
    sink: &'s mut dyn ProgressSink,
}

impl<'s, S: Step> Routine<'s, S> {
    /// Create a routine queued at `entry` with a starting context.
    pub fn new(entry: S, context: S::Context, sink: &'s mut dyn ProgressSink) -> Self {
        Self {
            queued: Some(entry),
            context,
            sink,
        }
    }

    /// Whether no step remains queued.
    pub fn finished(&self) -> bool {
        self.queued.is_none()
    }

    /// The step that the next [`advance`](Self::advance) will run.
    pub fn queued(&self) -> Option<S> {
        self.queued
    }

    pub fn context(&self) -> &S::Context {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut S::Context {
        &mut self.context
    }

    /// Consume the routine, keeping the context it accumulated.
    pub fn into_context(self) -> S::Context {
        self.context
    }

    /// Run the queued step once.
    ///
    /// On error the queued step stays in place, so the routine must not be
    /// advanced again unless the caller means to repeat that step. Advancing
    /// a finished routine does nothing.
    pub fn advance(&mut self) -> Result<()> {
        let Some(step) = self.queued else {
            return Ok(());
        };

        debug!("Running routine step {}", step.name());
        let next = step.execute(&mut self.context, &mut *self.sink)?;
        if let Some(next) = next {
            debug!("Step {} queued {}", step.name(), next.name());
        }
        self.queued = next;
        Ok(())
    }

    /// Advance until the routine finishes or a step fails.
    pub fn run(&mut self) -> Result<()> {
        while !self.finished() {
            self.advance()?;
        }
        Ok(())
    }
}
