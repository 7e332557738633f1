// src/engine/mod.rs

//! Execution engine.
//!
//! - [`executor`] is the public entry point: validates the task set and runs
//!   each requested root task in turn.
//! - [`scheduler`] drives one root's graph on a worker pool.
//! - [`runner`] wraps a single node's work unit with lifecycle notifications.
//! - [`notifier`] defines those notifications and a progress printer.
//! - [`validator`] holds the pre-execution checks.

pub mod executor;
pub mod notifier;
pub mod runner;
pub mod scheduler;
pub mod validator;

pub use executor::{Engine, EngineOptions};
pub use notifier::{ExecutionNotifier, ProgressPrinter, TaskFailure};
pub use runner::NodeRunner;
pub use scheduler::{RunStats, Scheduler};
pub use validator::{GraphValidator, PreValidator};
