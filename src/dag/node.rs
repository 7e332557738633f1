// src/dag/node.rs

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::task::{TaskDefinition, Work};
use crate::types::{Phase, TaskName, TaskState};

/// Scheduling-time view of one task.
///
/// Edges are stored in the owning [`DependencyGraph`](super::DependencyGraph);
/// the node itself only carries identity, phase and state.
#[derive(Debug, Clone)]
pub struct GraphNode {
    name: TaskName,
    phase: Phase,
    state: TaskState,
    /// Set when the work unit reported an error. The node still reaches
    /// `Complete`, but it never satisfies a dependent.
    failed: bool,
    work: Option<Arc<dyn Work>>,
}

impl GraphNode {
    pub fn new(def: &TaskDefinition, phase: Phase) -> Self {
        Self {
            name: def.name.clone(),
            phase,
            state: TaskState::Waiting,
            failed: false,
            work: def.work.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_pre_phase(&self) -> bool {
        self.phase == Phase::Pre
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn is_waiting(&self) -> bool {
        self.state == TaskState::Waiting
    }

    pub fn is_complete(&self) -> bool {
        self.state == TaskState::Complete
    }

    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Complete and not failed: the only state that satisfies a dependent.
    pub fn is_satisfied(&self) -> bool {
        self.is_complete() && !self.failed
    }

    pub fn work(&self) -> Option<&Arc<dyn Work>> {
        self.work.as_ref()
    }

    /// Move to `next`. Returns `false` (and leaves the state alone) if that
    /// would move backwards.
    pub fn set_state(&mut self, next: TaskState) -> bool {
        if next < self.state {
            warn!(
                task = %self.name,
                from = %self.state,
                to = %next,
                "refusing backwards state transition"
            );
            return false;
        }
        self.state = next;
        true
    }

    pub fn mark_failed(&mut self) {
        self.failed = true;
    }
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.state)
    }
}
