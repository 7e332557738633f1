// src/dag/graph.rs

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::Arc;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::trace;

use crate::dag::node::GraphNode;
use crate::dag::phase::PhaseSet;
use crate::errors::ConfigError;
use crate::task::TaskSet;
use crate::types::Phase;

/// Handle to a node inside a [`DependencyGraph`].
pub type NodeId = NodeIndex;

/// Every task reachable from the requested root(s), with its edges.
///
/// Edge direction is dependency -> dependent: for `B` depending on `A` the
/// graph holds `A -> B`, so a node's predecessors are its incoming
/// neighbours and its successors the outgoing ones.
#[derive(Debug)]
pub struct DependencyGraph {
    tasks: Arc<TaskSet>,
    phases: Arc<PhaseSet>,
    graph: DiGraph<GraphNode, ()>,
    index: HashMap<String, NodeId>,
    /// Names whose dependencies are still being resolved.
    building: HashSet<String>,
    root: Option<NodeId>,
}

impl DependencyGraph {
    pub fn new(tasks: Arc<TaskSet>, phases: Arc<PhaseSet>) -> Self {
        Self {
            tasks,
            phases,
            graph: DiGraph::new(),
            index: HashMap::new(),
            building: HashSet::new(),
            root: None,
        }
    }

    /// Resolve `name` and all its transitive dependencies into nodes.
    ///
    /// Memoized by name: asking again for a name that was already built
    /// returns the same [`NodeId`] and adds nothing. Acyclicity is normally
    /// guaranteed by the pre-validator; reaching a name that is still being
    /// resolved fails with [`ConfigError::DependencyCycle`] instead of
    /// recursing forever.
    ///
    /// On error the graph is left exactly as it was before the call.
    pub fn build_dependencies(&mut self, name: &str) -> Result<NodeId, ConfigError> {
        if let Some(&id) = self.index.get(name) {
            return Ok(id);
        }

        let mark = self.graph.node_count();
        match self.build_node(name) {
            Ok(id) => {
                if self.root.is_none() {
                    self.root = Some(id);
                }
                Ok(id)
            }
            Err(e) => {
                self.rollback(mark);
                Err(e)
            }
        }
    }

    /// Nodes are registered only once all of their dependencies resolved,
    /// so a name in `index` always has its complete set of edges.
    fn build_node(&mut self, name: &str) -> Result<NodeId, ConfigError> {
        if let Some(&id) = self.index.get(name) {
            return Ok(id);
        }
        if self.building.contains(name) {
            return Err(ConfigError::DependencyCycle(name.to_string()));
        }

        let tasks = Arc::clone(&self.tasks);
        let def = tasks
            .get(name)
            .ok_or_else(|| ConfigError::UnknownTask(name.to_string()))?;

        if let Some(dep) = def.dependencies.iter().find(|d| !tasks.contains(d)) {
            return Err(ConfigError::UnknownDependency {
                task: name.to_string(),
                dependency: dep.clone(),
            });
        }

        self.building.insert(name.to_string());
        let mut dep_ids = Vec::with_capacity(def.dependencies.len());
        for dep in def.dependencies.iter() {
            match self.build_node(dep) {
                Ok(dep_id) => dep_ids.push(dep_id),
                Err(e) => {
                    self.building.remove(name);
                    return Err(e);
                }
            }
        }
        self.building.remove(name);

        let id = self
            .graph
            .add_node(GraphNode::new(def, self.phases.phase_of(name)));
        for dep_id in dep_ids {
            self.graph.update_edge(dep_id, id, ());
        }
        self.index.insert(name.to_string(), id);

        trace!(task = %name, "graph node built");
        Ok(id)
    }

    /// Drop every node added since the graph had `mark` nodes.
    fn rollback(&mut self, mark: usize) {
        // Removing the highest index first keeps every other index stable.
        while self.graph.node_count() > mark {
            let last = NodeIndex::new(self.graph.node_count() - 1);
            if let Some(node) = self.graph.remove_node(last) {
                self.index.remove(node.name());
            }
        }
        self.building.clear();
    }

    /// Every node that is `Waiting` and whose predecessors are all complete
    /// without failure. Order is unspecified.
    pub fn discover_schedulable_nodes(&self) -> Vec<NodeId> {
        self.graph
            .node_indices()
            .filter(|&id| self.is_schedulable(id))
            .collect()
    }

    pub fn is_schedulable(&self, id: NodeId) -> bool {
        self.graph[id].is_waiting()
            && self
                .graph
                .neighbors_directed(id, Direction::Incoming)
                .all(|pred| self.graph[pred].is_satisfied())
    }

    /// The first top-level name that was built.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    pub fn node(&self, id: NodeId) -> &GraphNode {
        &self.graph[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut GraphNode {
        &mut self.graph[id]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &GraphNode)> {
        self.graph
            .node_indices()
            .map(move |id| (id, &self.graph[id]))
    }

    /// Names this node waits for.
    pub fn predecessors(&self, id: NodeId) -> BTreeSet<&str> {
        self.neighbour_names(id, Direction::Incoming)
    }

    /// Names that declared this node as a dependency.
    pub fn successors(&self, id: NodeId) -> BTreeSet<&str> {
        self.neighbour_names(id, Direction::Outgoing)
    }

    fn neighbour_names(&self, id: NodeId, dir: Direction) -> BTreeSet<&str> {
        self.graph
            .neighbors_directed(id, dir)
            .map(|n| self.graph[n].name())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains_phase(&self, phase: Phase) -> bool {
        self.graph.node_weights().any(|n| n.phase() == phase)
    }

    pub fn has_failed(&self, phase: Phase) -> bool {
        self.graph
            .node_weights()
            .any(|n| n.phase() == phase && n.has_failed())
    }

    /// Waiting nodes that can never run because some ancestor failed.
    pub fn blocked_by_failure(&self) -> Vec<String> {
        let mut stack: Vec<NodeId> = self
            .graph
            .node_indices()
            .filter(|&id| self.graph[id].has_failed())
            .collect();
        let mut blocked = BTreeSet::new();

        while let Some(id) = stack.pop() {
            for succ in self.graph.neighbors_directed(id, Direction::Outgoing) {
                let node = &self.graph[succ];
                if node.is_waiting() && blocked.insert(node.name().to_string()) {
                    stack.push(succ);
                }
            }
        }

        blocked.into_iter().collect()
    }

    /// Human-readable listing of every node with its edges, sorted by name.
    pub fn dump(&self) -> String {
        let mut ids: Vec<NodeId> = self.graph.node_indices().collect();
        ids.sort_by(|a, b| self.graph[*a].name().cmp(self.graph[*b].name()));

        let mut out = String::new();
        for id in ids {
            let node = &self.graph[id];
            let _ = writeln!(out, "{} ({} phase)", node, node.phase());
            if let Some(work) = node.work() {
                let _ = writeln!(out, "  work:         {}", work.describe());
            }
            let preds: Vec<&str> = self.predecessors(id).into_iter().collect();
            let succs: Vec<&str> = self.successors(id).into_iter().collect();
            let _ = writeln!(out, "  predecessors: {}", preds.join(", "));
            let _ = writeln!(out, "  successors:   {}", succs.join(", "));
        }
        out
    }
}
