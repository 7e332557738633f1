// src/engine/notifier.rs

//! Execution events and the observers that receive them.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

/// Error carried by [`ExecutionNotifier::on_failed`]. Shared so that the
/// scheduler and every observer can keep hold of it.
pub type TaskFailure = Arc<anyhow::Error>;

/// Receives lifecycle events for running tasks.
///
/// For each task, `on_starting` is always delivered before `on_complete`,
/// and `on_complete` exactly once. `on_failed`, if delivered, comes between
/// the two.
///
/// Observers attached to an engine receive a task's `on_complete` before
/// any of its dependents' `on_starting`. That call is made while the
/// scheduler's state is locked, so an observer must not block on the run.
pub trait ExecutionNotifier: Send + Sync {
    fn on_starting(&self, task: &str);

    fn on_complete(&self, task: &str);

    fn on_failed(&self, task: &str, error: &TaskFailure);
}

const STARTED_SYMBOL: &str = "+ ";
const FINISHED_SYMBOL: &str = "- ";
const FAILED_SYMBOL: &str = "! ";

/// Prints `+ task` / `- task` lines as tasks start and finish.
///
/// All writes go through one mutex so lines from parallel tasks never
/// interleave.
#[derive(Debug)]
pub struct ProgressPrinter<W> {
    out: Mutex<W>,
}

impl ProgressPrinter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ProgressPrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Copy of everything written so far (for in-memory writers).
    pub fn output(&self) -> W
    where
        W: Clone,
    {
        self.out
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn print(&self, line: &str) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{line}").and_then(|_| out.flush()) {
            debug!(error = %e, "failed to write progress line");
        }
    }
}

impl<W: Write + Send> ExecutionNotifier for ProgressPrinter<W> {
    fn on_starting(&self, task: &str) {
        self.print(&format!("{STARTED_SYMBOL}{task}"));
    }

    fn on_complete(&self, task: &str) {
        self.print(&format!("{FINISHED_SYMBOL}{task}"));
    }

    fn on_failed(&self, task: &str, error: &TaskFailure) {
        self.print(&format!("{FAILED_SYMBOL}{task}: {error:#}"));
    }
}
