// src/engine/executor.rs

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::EngineSection;
use crate::config::model::DEFAULT_THREADS;
use crate::dag::{DependencyGraph, PhaseSet};
use crate::engine::notifier::ExecutionNotifier;
use crate::engine::scheduler::{RunStats, Scheduler};
use crate::engine::validator::{GraphValidator, PreValidator};
use crate::errors::{ConfigError, GatedagError, Result};
use crate::pool::{PoolFactory, TokioPoolFactory};
use crate::task::reserved::check_reserved_namespace;
use crate::task::{TaskSet, is_reserved};
use crate::types::{Phase, TaskName};

/// Options shared by every root execution of an [`Engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Worker pool size per root.
    pub threads: usize,
    /// Keep running the remaining roots after one fails, then report the
    /// first failure.
    pub keep_going: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            keep_going: false,
        }
    }
}

impl EngineOptions {
    pub fn from_config(section: &EngineSection) -> Self {
        Self {
            threads: section.threads,
            keep_going: section.keep_going,
        }
    }
}

/// Runs requested root tasks over a [`TaskSet`].
///
/// Each root gets a freshly built graph and its own worker pool; roots run
/// one after another in the order given.
pub struct Engine {
    tasks: Arc<TaskSet>,
    options: EngineOptions,
    pool_factory: Arc<dyn PoolFactory>,
    validator: Arc<dyn PreValidator>,
    observers: Vec<Arc<dyn ExecutionNotifier>>,
}

impl Engine {
    pub fn new(tasks: TaskSet, options: EngineOptions) -> Self {
        Self {
            tasks: Arc::new(tasks),
            options,
            pool_factory: Arc::new(TokioPoolFactory),
            validator: Arc::new(GraphValidator),
            observers: Vec::new(),
        }
    }

    pub fn with_pool_factory(mut self, factory: Arc<dyn PoolFactory>) -> Self {
        self.pool_factory = factory;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn PreValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Attach an observer that receives every task's lifecycle events.
    pub fn with_observer(mut self, observer: Arc<dyn ExecutionNotifier>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn tasks(&self) -> &TaskSet {
        &self.tasks
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Execute `roots` in order.
    ///
    /// Configuration is checked up front for the whole invocation. After
    /// that, a failing root either stops the invocation immediately or, in
    /// keep-going mode, is remembered while the remaining roots still run.
    /// Only the first error is ever returned.
    pub async fn execute<S: AsRef<str>>(&self, roots: &[S]) -> Result<()> {
        let roots: Vec<TaskName> = roots.iter().map(|r| r.as_ref().to_string()).collect();
        let phases = self.prepare(&roots)?;

        let mut deferred: Option<GatedagError> = None;

        for root in roots.iter() {
            match self.execute_root(root, &phases).await {
                Ok(stats) => {
                    debug!(root = %root, ?stats, "root task finished");
                }
                Err(err) if self.options.keep_going => {
                    warn!(root = %root, error = %err, "root task failed; keep-going, continuing with remaining tasks");
                    if deferred.is_none() {
                        deferred = Some(err);
                    }
                }
                Err(err) => return Err(err),
            }
        }

        match deferred {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Validate and build the graph for `root` without running anything.
    pub fn plan(&self, root: &str) -> Result<DependencyGraph> {
        let phases = self.prepare(&[root.to_string()])?;
        if is_reserved(root) {
            return Err(ConfigError::CannotExecuteReservedTask(root.to_string()).into());
        }

        let mut graph = DependencyGraph::new(Arc::clone(&self.tasks), phases);
        graph.build_dependencies(root)?;
        Ok(graph)
    }

    /// Everything checked once per invocation, before any scheduling.
    fn prepare(&self, roots: &[TaskName]) -> std::result::Result<Arc<PhaseSet>, ConfigError> {
        if self.options.threads == 0 {
            return Err(ConfigError::Invalid("thread count must be >= 1 (got 0)".to_string()));
        }

        self.validator.validate(&self.tasks, roots)?;
        check_reserved_namespace(&self.tasks)?;
        let phases = PhaseSet::from_tasks(&self.tasks)?;

        Ok(Arc::new(phases))
    }

    async fn execute_root(&self, root: &str, phases: &Arc<PhaseSet>) -> Result<RunStats> {
        if is_reserved(root) {
            return Err(ConfigError::CannotExecuteReservedTask(root.to_string()).into());
        }

        let mut graph = DependencyGraph::new(Arc::clone(&self.tasks), Arc::clone(phases));
        let root_id = graph.build_dependencies(root)?;

        info!(
            root = %root,
            tasks = graph.len(),
            pre_phase = graph.contains_phase(Phase::Pre),
            threads = self.options.threads,
            "executing root task"
        );

        let pool = self.pool_factory.create(self.options.threads);
        let scheduler = Scheduler::new(graph, root_id, Arc::clone(&pool), self.observers.clone());

        scheduler.start();
        pool.await_termination().await;

        scheduler.finish()
    }
}
