// src/dag/phase.rs

//! Two-phase scheduling.
//!
//! [`PhaseSet`] is the fixed pre-phase membership, read once per invocation
//! from the dependency list of [`PRE_PHASE_TASK`]. [`PhaseGate`] is the
//! per-run policy that hides main-phase nodes until the pre-phase drains.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::dag::graph::{DependencyGraph, NodeId};
use crate::errors::ConfigError;
use crate::task::{PRE_PHASE_TASK, TaskSet};
use crate::types::{Phase, TaskName};

#[derive(Debug, Clone, Default)]
pub struct PhaseSet {
    pre: BTreeSet<TaskName>,
}

impl PhaseSet {
    /// A phase set with no pre-phase tasks.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read the pre-phase membership from the task set and verify that each
    /// member exists and depends only on other members.
    pub fn from_tasks(tasks: &TaskSet) -> Result<Self, ConfigError> {
        let Some(decl) = tasks.get(PRE_PHASE_TASK) else {
            return Ok(Self::empty());
        };

        let pre: BTreeSet<TaskName> = decl.dependencies.iter().cloned().collect();

        for member in pre.iter() {
            let def = tasks.get(member).ok_or_else(|| ConfigError::UnknownDependency {
                task: PRE_PHASE_TASK.to_string(),
                dependency: member.clone(),
            })?;

            if let Some(dep) = def.dependencies.iter().find(|d| !pre.contains(*d)) {
                return Err(ConfigError::PrePhaseDependsOnMainTask {
                    task: member.clone(),
                    dependency: dep.clone(),
                });
            }
        }

        debug!(members = ?pre, "pre-phase configured");
        Ok(Self { pre })
    }

    pub fn phase_of(&self, name: &str) -> Phase {
        if self.pre.contains(name) {
            Phase::Pre
        } else {
            Phase::Main
        }
    }
}

/// Keeps main-phase nodes back until every pre-phase node has finished.
///
/// The gate opens exactly once, when no pre-phase node is schedulable and
/// nothing is in flight. It never closes again for the same run. If a
/// pre-phase node failed the gate stays shut, so no main-phase work starts.
#[derive(Debug, Clone)]
pub struct PhaseGate {
    in_pre_phase: bool,
    abandoned: bool,
}

impl PhaseGate {
    /// Start in pre-phase only if the graph has pre-phase nodes at all.
    pub fn for_graph(graph: &DependencyGraph) -> Self {
        Self {
            in_pre_phase: graph.contains_phase(Phase::Pre),
            abandoned: false,
        }
    }

    pub fn is_pre_phase(&self) -> bool {
        self.in_pre_phase
    }

    /// Narrow `schedulable` to what may be submitted right now.
    ///
    /// `in_flight` is the number of nodes queued but not yet finished.
    pub fn admit(
        &mut self,
        graph: &DependencyGraph,
        schedulable: Vec<NodeId>,
        in_flight: usize,
    ) -> Vec<NodeId> {
        if !self.in_pre_phase {
            return schedulable;
        }

        let pre: Vec<NodeId> = schedulable
            .iter()
            .copied()
            .filter(|&id| graph.node(id).is_pre_phase())
            .collect();

        if !pre.is_empty() || in_flight > 0 {
            return pre;
        }

        if graph.has_failed(Phase::Pre) {
            if !self.abandoned {
                warn!("a pre-phase task failed; main phase will not start");
                self.abandoned = true;
            }
            return Vec::new();
        }

        info!("pre-phase complete; opening main phase");
        self.in_pre_phase = false;
        schedulable
    }
}
