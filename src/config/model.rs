// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// Top-level configuration exactly as read from a TOML file, before
/// validation.
///
/// ```toml
/// [config]
/// threads = 4
/// keep_going = false
/// default = "build"
///
/// [task."gatedag:pre-phase"]
/// after = ["clean"]
///
/// [task.clean]
/// cmd = "rm -rf out"
///
/// [task.build]
/// cmd = "make"
/// after = ["clean"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: EngineSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// Validated configuration. Only obtainable through
/// `ConfigFile::try_from(RawConfigFile)` (or the loader).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: EngineSection,
    pub task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(config: EngineSection, task: BTreeMap<String, TaskConfig>) -> Self {
        Self { config, task }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    /// Worker pool size used for every root task.
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Keep executing the remaining requested tasks after one of them fails.
    #[serde(default)]
    pub keep_going: bool,

    /// Task to run when none is named on the command line.
    #[serde(default)]
    pub default: Option<String>,
}

pub const DEFAULT_THREADS: usize = 2;

fn default_threads() -> usize {
    DEFAULT_THREADS
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            keep_going: false,
            default: None,
        }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskConfig {
    /// Shell command to run. Tasks without one only group their dependencies.
    #[serde(default)]
    pub cmd: Option<String>,

    /// Dependency list: this task waits for all tasks listed here.
    #[serde(default)]
    pub after: Vec<String>,

    #[serde(default)]
    pub description: Option<String>,
}
