#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use gatedag::config::{ConfigFile, EngineSection, RawConfigFile, TaskConfig};
use gatedag::task::{PRE_PHASE_TASK, TaskDefinition, TaskSet, Work};

/// Builder for `TaskSet` to simplify test setup.
pub struct TaskSetBuilder {
    tasks: TaskSet,
}

impl TaskSetBuilder {
    pub fn new() -> Self {
        Self {
            tasks: TaskSet::new(),
        }
    }

    pub fn with_task(mut self, task: TaskDefinition) -> Self {
        self.tasks.insert(task);
        self
    }

    /// Shorthand for a task with no work and the given dependencies.
    pub fn with_group(self, name: &str, after: &[&str]) -> Self {
        let mut task = TaskBuilder::new(name);
        for dep in after {
            task = task.after(dep);
        }
        self.with_task(task.build())
    }

    /// Declare the pre-phase members through the reserved sentinel task.
    pub fn with_pre_phase(self, members: &[&str]) -> Self {
        self.with_group(PRE_PHASE_TASK, members)
    }

    pub fn build(self) -> TaskSet {
        self.tasks
    }
}

impl Default for TaskSetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskDefinition`.
pub struct TaskBuilder {
    task: TaskDefinition,
}

impl TaskBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            task: TaskDefinition::new(name),
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task = self.task.with_dependency(dep);
        self
    }

    pub fn work(mut self, work: Arc<dyn Work>) -> Self {
        self.task = self.task.with_work(work);
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.task = self.task.with_description(text);
        self
    }

    pub fn build(self) -> TaskDefinition {
        self.task
    }
}

/// Builder for a validated `ConfigFile`.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: EngineSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.config.config.threads = threads;
        self
    }

    pub fn with_default(mut self, task: &str) -> Self {
        self.config.config.default = Some(task.to_string());
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                cmd: Some(cmd.to_string()),
                after: vec![],
                description: None,
            },
        }
    }

    /// A task with no command.
    pub fn group() -> Self {
        Self {
            task: TaskConfig::default(),
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.task.description = Some(text.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
