// src/types.rs

use std::fmt;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// Scheduling state of a graph node.
///
/// States only ever move forward:
/// `Waiting -> Queued -> Running -> Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskState {
    /// Not yet handed to the pool; waiting on predecessors (or the phase gate).
    Waiting,
    /// Submitted to the pool but not started by a worker yet.
    Queued,
    /// A worker is executing the task's work unit.
    Running,
    /// The work unit has returned, successfully or not.
    Complete,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Waiting => "WAITING",
            TaskState::Queued => "QUEUED",
            TaskState::Running => "RUNNING",
            TaskState::Complete => "COMPLETE",
        };
        f.write_str(s)
    }
}

/// Which execution phase a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Must all finish before any `Main` task starts.
    Pre,
    Main,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Pre => f.write_str("pre"),
            Phase::Main => f.write_str("main"),
        }
    }
}
