// src/pool/mod.rs

//! Worker pool abstraction.
//!
//! The scheduler only ever talks to a [`WorkerPool`] created by a
//! [`PoolFactory`], so tests can wrap or replace the pool while production
//! uses [`TokioPool`].

pub mod tokio_pool;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::errors::PoolError;
use crate::types::TaskName;

pub use tokio_pool::{TokioPool, TokioPoolFactory};

pub type JobFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// One unit of submitted work, labelled with the task it runs.
pub struct Job {
    task: TaskName,
    future: JobFuture,
}

impl Job {
    pub fn new(task: impl Into<TaskName>, future: JobFuture) -> Self {
        Self {
            task: task.into(),
            future,
        }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn into_future(self) -> JobFuture {
        self.future
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").field("task", &self.task).finish_non_exhaustive()
    }
}

/// A bounded pool of workers.
pub trait WorkerPool: Send + Sync {
    /// Hand a job to the pool. Refused once the pool is shut down.
    fn submit(&self, job: Job) -> Result<(), PoolError>;

    /// Stop accepting jobs. Jobs already submitted still run to completion.
    fn shutdown(&self);

    fn is_shutdown(&self) -> bool;

    /// Resolves once the pool is shut down and every submitted job finished.
    fn await_termination(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Creates one pool per root execution.
pub trait PoolFactory: Send + Sync {
    fn create(&self, threads: usize) -> Arc<dyn WorkerPool>;
}
