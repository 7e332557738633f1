// src/pool/tokio_pool.rs

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::errors::PoolError;
use crate::pool::{Job, PoolFactory, WorkerPool};

/// Pool running jobs as tokio tasks, at most `threads` at a time.
///
/// Jobs are spawned immediately but each one waits for a semaphore permit
/// before running, so the concurrency bound holds without a dedicated
/// dispatcher. Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct TokioPool {
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    shut_down: AtomicBool,
}

impl TokioPool {
    /// A pool asked for zero threads still runs one job at a time.
    pub fn new(threads: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(threads.max(1))),
            tracker: TaskTracker::new(),
            shut_down: AtomicBool::new(false),
        }
    }
}

impl WorkerPool for TokioPool {
    fn submit(&self, job: Job) -> Result<(), PoolError> {
        if self.is_shutdown() {
            return Err(PoolError::Shutdown(job.task().to_string()));
        }

        let permits = Arc::clone(&self.permits);
        let task = job.task().to_string();
        let future = job.into_future();

        self.tracker.spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    warn!(task = %task, "pool semaphore closed; dropping job");
                    return;
                }
            };
            future.await;
        });

        Ok(())
    }

    fn shutdown(&self) {
        if !self.shut_down.swap(true, Ordering::SeqCst) {
            debug!(in_flight = self.tracker.len(), "worker pool shutting down");
            self.tracker.close();
        }
    }

    fn is_shutdown(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn await_termination(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(self.tracker.wait())
    }
}

/// Default factory: a fresh [`TokioPool`] per root execution.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPoolFactory;

impl PoolFactory for TokioPoolFactory {
    fn create(&self, threads: usize) -> Arc<dyn WorkerPool> {
        Arc::new(TokioPool::new(threads))
    }
}
