// src/engine/scheduler.rs

//! Per-root scheduling state machine.
//!
//! All bookkeeping (graph state, counters, phase gate, submissions) happens
//! under a single mutex. Work units run outside it, on pool workers, and
//! call back in through [`ExecutionNotifier`]. Completion is forwarded to
//! observers under that mutex, before dependents are submitted.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use anyhow::anyhow;
use tracing::{debug, error, info, warn};

use crate::dag::{DependencyGraph, NodeId, PhaseGate};
use crate::engine::notifier::{ExecutionNotifier, TaskFailure};
use crate::engine::runner::NodeRunner;
use crate::errors::{GatedagError, Result};
use crate::pool::WorkerPool;
use crate::types::{TaskName, TaskState};

/// Counters for one root execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub queued: usize,
    pub started: usize,
    pub finished: usize,
    pub failed: usize,
}

#[derive(Debug)]
struct RunState {
    graph: DependencyGraph,
    gate: PhaseGate,
    root: NodeId,
    stats: RunStats,
    first_failure: Option<(TaskName, TaskFailure)>,
}

impl RunState {
    fn in_flight(&self) -> usize {
        self.stats.queued - self.stats.finished
    }
}

/// Drives one root task's graph to completion on a worker pool.
pub struct Scheduler {
    root_name: TaskName,
    pool: Arc<dyn WorkerPool>,
    observers: Vec<Arc<dyn ExecutionNotifier>>,
    state: Mutex<RunState>,
    /// Handed to every node runner as its notifier.
    this: Weak<Scheduler>,
}

impl Scheduler {
    /// `root` must be a node of `graph`.
    pub fn new(
        graph: DependencyGraph,
        root: NodeId,
        pool: Arc<dyn WorkerPool>,
        observers: Vec<Arc<dyn ExecutionNotifier>>,
    ) -> Arc<Self> {
        let gate = PhaseGate::for_graph(&graph);
        let root_name = graph.node(root).name().to_string();

        Arc::new_cyclic(|this| Self {
            root_name,
            pool,
            observers,
            state: Mutex::new(RunState {
                graph,
                gate,
                root,
                stats: RunStats::default(),
                first_failure: None,
            }),
            this: this.clone(),
        })
    }

    pub fn root(&self) -> &str {
        &self.root_name
    }

    /// Submit the initial batch of schedulable nodes.
    pub fn start(&self) {
        let mut state = self.lock_state();
        debug!(
            root = %self.root_name,
            pre_phase = state.gate.is_pre_phase(),
            "scheduler starting"
        );

        let submitted = self.schedule_more(&mut state);
        if submitted == 0 && state.in_flight() == 0 {
            warn!(root = %self.root_name, "nothing schedulable at start; shutting down pool");
            self.pool.shutdown();
        }
    }

    pub fn stats(&self) -> RunStats {
        self.lock_state().stats
    }

    pub fn state_of(&self, task: &str) -> Option<TaskState> {
        let state = self.lock_state();
        state.graph.find(task).map(|id| state.graph.node(id).state())
    }

    /// Collect the outcome once the pool has terminated: the first task
    /// failure, if any, otherwise the run's counters.
    pub fn finish(&self) -> Result<RunStats> {
        let mut state = self.lock_state();
        let stats = state.stats;

        info!(
            root = %self.root_name,
            queued = stats.queued,
            started = stats.started,
            finished = stats.finished,
            failed = stats.failed,
            "run finished"
        );

        if let Some((task, error)) = state.first_failure.take() {
            return Err(GatedagError::TaskFailed { task, error });
        }

        if !state.graph.node(state.root).is_complete() {
            return Err(anyhow!("root task '{}' did not complete", self.root_name).into());
        }

        Ok(stats)
    }

    fn lock_state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Query the graph through the phase gate, mark every admitted node
    /// `Queued`, and submit it. Returns how many nodes were submitted.
    ///
    /// Callers must hold the state lock, which is what keeps two concurrent
    /// completions from submitting the same node twice.
    fn schedule_more(&self, state: &mut RunState) -> usize {
        let schedulable = state.graph.discover_schedulable_nodes();
        let in_flight = state.in_flight();
        let admitted = state.gate.admit(&state.graph, schedulable, in_flight);

        if admitted.is_empty() {
            return 0;
        }

        for &id in admitted.iter() {
            state.graph.node_mut(id).set_state(TaskState::Queued);
        }

        let Some(this) = self.this.upgrade() else {
            return 0;
        };
        let notifier: Arc<dyn ExecutionNotifier> = this;

        let mut submitted = 0;
        for id in admitted {
            let node = state.graph.node(id);
            let runner = NodeRunner::new(node.name(), node.work().cloned(), Arc::clone(&notifier));

            match self.pool.submit(runner.into_job()) {
                Ok(()) => {
                    state.stats.queued += 1;
                    submitted += 1;
                    debug!(task = %state.graph.node(id).name(), "task queued");
                }
                Err(e) => {
                    warn!(error = %e, "failed to submit task");
                }
            }
        }

        submitted
    }

    fn notify_observers(&self, f: impl Fn(&dyn ExecutionNotifier)) {
        for observer in self.observers.iter() {
            f(observer.as_ref());
        }
    }
}

impl ExecutionNotifier for Scheduler {
    fn on_starting(&self, task: &str) {
        {
            let mut state = self.lock_state();
            let Some(id) = state.graph.find(task) else {
                warn!(task = %task, "start reported for unknown task; ignoring");
                return;
            };
            state.graph.node_mut(id).set_state(TaskState::Running);
            state.stats.started += 1;
        }

        info!(task = %task, "task started");
        self.notify_observers(|o| o.on_starting(task));
    }

    fn on_complete(&self, task: &str) {
        let mut state = self.lock_state();
        let Some(id) = state.graph.find(task) else {
            warn!(task = %task, "completion reported for unknown task; ignoring");
            return;
        };
        state.graph.node_mut(id).set_state(TaskState::Complete);
        state.stats.finished += 1;
        debug!(task = %task, "task complete");

        // Observers hear about the completion before any dependent is
        // submitted, so they never see a dependent start first.
        self.notify_observers(|o| o.on_complete(task));

        self.schedule_more(&mut state);

        if id == state.root {
            info!(root = %self.root_name, "root task complete; shutting down pool");
            self.pool.shutdown();
        } else if state.in_flight() == 0 {
            let blocked = state.graph.blocked_by_failure();
            warn!(
                root = %self.root_name,
                ?blocked,
                "no task can make progress; shutting down pool"
            );
            self.pool.shutdown();
        }
    }

    fn on_failed(&self, task: &str, failure: &TaskFailure) {
        {
            let mut state = self.lock_state();
            let Some(id) = state.graph.find(task) else {
                warn!(task = %task, "failure reported for unknown task; ignoring");
                return;
            };
            state.graph.node_mut(id).mark_failed();
            state.stats.failed += 1;

            if state.first_failure.is_none() {
                state.first_failure = Some((task.to_string(), Arc::clone(failure)));
            }
        }

        let message = format!("{failure:#}");
        error!(task = %task, error = %message, "task failed; its dependents will not run");
        self.notify_observers(|o| o.on_failed(task, failure));
    }
}
