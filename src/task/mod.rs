// src/task/mod.rs

//! Task definitions: the read-only input the dependency graph is built from.
//!
//! - [`work`] holds the opaque [`Work`] trait and its stock implementations.
//! - [`reserved`] holds the reserved-namespace rules.

pub mod reserved;
pub mod work;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::ConfigFile;
use crate::types::TaskName;

pub use reserved::{PRE_PHASE_TASK, RESERVED_PREFIX, is_reserved};
pub use work::{ShellWork, Work, WorkFuture, from_fn};

/// A named task: optional work plus the names it depends on.
#[derive(Clone)]
pub struct TaskDefinition {
    pub name: TaskName,
    /// Dependency names, in declaration order.
    pub dependencies: Vec<TaskName>,
    /// `None` for tasks that only group dependencies.
    pub work: Option<Arc<dyn Work>>,
    pub description: Option<String>,
}

impl TaskDefinition {
    pub fn new(name: impl Into<TaskName>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            work: None,
            description: None,
        }
    }

    pub fn with_dependency(mut self, dependency: impl Into<TaskName>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        self.dependencies
            .extend(dependencies.into_iter().map(Into::into));
        self
    }

    pub fn with_work(mut self, work: Arc<dyn Work>) -> Self {
        self.work = Some(work);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn has_work(&self) -> bool {
        self.work.is_some()
    }
}

impl fmt::Debug for TaskDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDefinition")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("work", &self.work)
            .finish()
    }
}

/// Lookup of every known task by name.
#[derive(Debug, Clone, Default)]
pub struct TaskSet {
    tasks: BTreeMap<TaskName, TaskDefinition>,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the task set described by a validated [`ConfigFile`].
    ///
    /// Every `cmd` becomes a [`ShellWork`].
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let mut set = Self::new();

        for (name, tc) in cfg.task.iter() {
            let mut def = TaskDefinition::new(name.clone()).with_dependencies(tc.after.iter().cloned());
            if let Some(cmd) = &tc.cmd {
                def = def.with_work(Arc::new(ShellWork::new(name.clone(), cmd.clone())));
            }
            if let Some(desc) = &tc.description {
                def = def.with_description(desc.clone());
            }
            set.insert(def);
        }

        set
    }

    /// Insert a definition, returning the one it replaced (if any).
    pub fn insert(&mut self, def: TaskDefinition) -> Option<TaskDefinition> {
        self.tasks.insert(def.name.clone(), def)
    }

    pub fn get(&self, name: &str) -> Option<&TaskDefinition> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskDefinition> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl FromIterator<TaskDefinition> for TaskSet {
    fn from_iter<T: IntoIterator<Item = TaskDefinition>>(iter: T) -> Self {
        let mut set = TaskSet::new();
        for def in iter {
            set.insert(def);
        }
        set
    }
}
