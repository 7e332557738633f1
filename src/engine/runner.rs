// src/engine/runner.rs

//! Execution wrapper around a single node's work unit.

use std::sync::Arc;

use anyhow::anyhow;
use tracing::debug;

use crate::engine::notifier::{ExecutionNotifier, TaskFailure};
use crate::pool::Job;
use crate::task::Work;
use crate::types::TaskName;

/// Runs one node and reports its lifecycle to the notifier:
/// `on_starting`, then the work, then `on_failed` if the work errored, then
/// `on_complete` no matter what.
pub struct NodeRunner {
    task: TaskName,
    work: Option<Arc<dyn Work>>,
    notifier: Arc<dyn ExecutionNotifier>,
}

impl NodeRunner {
    pub fn new(
        task: impl Into<TaskName>,
        work: Option<Arc<dyn Work>>,
        notifier: Arc<dyn ExecutionNotifier>,
    ) -> Self {
        Self {
            task: task.into(),
            work,
            notifier,
        }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    /// Package this runner for submission to a worker pool.
    pub fn into_job(self) -> Job {
        let task = self.task.clone();
        Job::new(task, Box::pin(self.run()))
    }

    pub async fn run(self) {
        self.notifier.on_starting(&self.task);

        let guard = CompletionGuard {
            task: &self.task,
            notifier: self.notifier.as_ref(),
        };

        if let Some(work) = &self.work {
            if let Err(err) = work.perform().await {
                debug!(task = %self.task, error = %err, "work unit returned an error");
                let failure: TaskFailure = Arc::new(err);
                self.notifier.on_failed(&self.task, &failure);
            }
        }

        drop(guard);
    }
}

/// Fires `on_complete` when dropped, including while unwinding from a panic
/// in the work future (reported through `on_failed` first).
struct CompletionGuard<'a> {
    task: &'a str,
    notifier: &'a dyn ExecutionNotifier,
}

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let failure: TaskFailure = Arc::new(anyhow!("task '{}' panicked", self.task));
            self.notifier.on_failed(self.task, &failure);
        }
        self.notifier.on_complete(self.task);
    }
}
