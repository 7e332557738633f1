// src/errors.rs

//! Crate-wide error types.
//!
//! - [`ConfigError`] covers everything detected *before* scheduling starts
//!   (bad names, cycles, phase and reserved-namespace misuse).
//! - [`GatedagError`] is what callers of the engine and the CLI see.

use std::sync::Arc;

use thiserror::Error;

use crate::types::TaskName;

/// Configuration problems. Always fatal for the invocation that found them
/// and never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown task '{0}'")]
    UnknownTask(TaskName),

    #[error("task '{task}' has unknown dependency '{dependency}'")]
    UnknownDependency { task: TaskName, dependency: TaskName },

    #[error("dependency cycle detected involving task '{0}'")]
    DependencyCycle(TaskName),

    #[error("pre-phase task '{task}' depends on '{dependency}', which is not a pre-phase task")]
    PrePhaseDependsOnMainTask { task: TaskName, dependency: TaskName },

    #[error("unknown reserved task '{0}'")]
    UnknownReservedTask(TaskName),

    #[error("reserved task '{0}' cannot carry work")]
    ReservedTaskHasWork(TaskName),

    #[error("task '{task}' cannot depend on reserved task '{dependency}'")]
    DependsOnReservedTask { task: TaskName, dependency: TaskName },

    #[error("reserved task '{0}' cannot be executed")]
    CannotExecuteReservedTask(TaskName),

    #[error("{0}")]
    Invalid(String),
}

/// Failure reported by a worker pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("pool is shut down; refusing to run task '{0}'")]
    Shutdown(TaskName),
}

#[derive(Error, Debug)]
pub enum GatedagError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A task's work unit failed. Only the first failure of an invocation is
    /// ever surfaced.
    #[error("Task '{task}' failed: {error:#}")]
    TaskFailed {
        task: TaskName,
        error: Arc<anyhow::Error>,
    },

    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GatedagError {
    /// The configuration error behind this error, if any.
    pub fn as_config(&self) -> Option<&ConfigError> {
        match self {
            GatedagError::Config(e) => Some(e),
            _ => None,
        }
    }

    /// Name of the failed task, if this is a task failure.
    pub fn failed_task(&self) -> Option<&str> {
        match self {
            GatedagError::TaskFailed { task, .. } => Some(task),
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, GatedagError>;
