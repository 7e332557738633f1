use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use gatedag::errors::PoolError;
use gatedag::pool::{Job, PoolFactory, TokioPool, WorkerPool};

/// A pool factory that:
/// - hands out real `TokioPool`s (jobs are never run inline, so submitting
///   under the scheduler lock stays safe)
/// - records the task name of every submitted job, in submission order
/// - records the thread count each pool was created with.
#[derive(Clone, Default)]
pub struct RecordingPoolFactory {
    submitted: Arc<Mutex<Vec<String>>>,
    created: Arc<Mutex<Vec<usize>>>,
}

impl RecordingPoolFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Task names submitted across every pool this factory created.
    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }

    /// Thread count of each pool, in creation order (one per root).
    pub fn pools_created(&self) -> Vec<usize> {
        self.created.lock().unwrap().clone()
    }
}

impl PoolFactory for RecordingPoolFactory {
    fn create(&self, threads: usize) -> Arc<dyn WorkerPool> {
        self.created.lock().unwrap().push(threads);
        Arc::new(RecordingPool {
            inner: TokioPool::new(threads),
            submitted: Arc::clone(&self.submitted),
        })
    }
}

struct RecordingPool {
    inner: TokioPool,
    submitted: Arc<Mutex<Vec<String>>>,
}

impl WorkerPool for RecordingPool {
    fn submit(&self, job: Job) -> Result<(), PoolError> {
        let task = job.task().to_string();
        self.inner.submit(job)?;
        self.submitted.lock().unwrap().push(task);
        Ok(())
    }

    fn shutdown(&self) {
        self.inner.shutdown();
    }

    fn is_shutdown(&self) -> bool {
        self.inner.is_shutdown()
    }

    fn await_termination(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        self.inner.await_termination()
    }
}
