// src/engine/validator.rs

//! Pre-execution validation: unknown names and dependency cycles.

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::ConfigError;
use crate::task::TaskSet;
use crate::types::TaskName;

/// Checks a task set before any graph is built for it.
///
/// The dependency graph assumes that whatever passes here is acyclic and
/// only references known names.
pub trait PreValidator: Send + Sync {
    fn validate(&self, tasks: &TaskSet, roots: &[TaskName]) -> Result<(), ConfigError>;
}

/// Default validator.
///
/// Every requested root must exist; every declared dependency in the whole
/// set must exist; and the whole set must be acyclic.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphValidator;

impl PreValidator for GraphValidator {
    fn validate(&self, tasks: &TaskSet, roots: &[TaskName]) -> Result<(), ConfigError> {
        if let Some(root) = roots.iter().find(|r| !tasks.contains(r)) {
            return Err(ConfigError::UnknownTask(root.clone()));
        }

        // Edge direction: dep -> task.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for def in tasks.iter() {
            graph.add_node(def.name.as_str());

            for dep in def.dependencies.iter() {
                if !tasks.contains(dep) {
                    return Err(ConfigError::UnknownDependency {
                        task: def.name.clone(),
                        dependency: dep.clone(),
                    });
                }
                graph.add_edge(dep.as_str(), def.name.as_str(), ());
            }
        }

        // A topological sort fails if there is a cycle (self-loops included).
        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(ConfigError::DependencyCycle(cycle.node_id().to_string())),
        }
    }
}
