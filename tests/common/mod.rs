#![allow(dead_code)]

use std::sync::Arc;

use gatedag::dag::{DependencyGraph, NodeId, PhaseSet};
use gatedag::engine::{Engine, EngineOptions};
use gatedag::task::TaskSet;
use gatedag::types::TaskState;
use gatedag_test_utils::recording_pool::RecordingPoolFactory;

/// Engine over `tasks` whose pools record every submission.
pub fn recording_engine(
    tasks: TaskSet,
    threads: usize,
    keep_going: bool,
) -> (Engine, RecordingPoolFactory) {
    let factory = RecordingPoolFactory::new();
    let engine = Engine::new(tasks, EngineOptions { threads, keep_going })
        .with_pool_factory(Arc::new(factory.clone()));
    (engine, factory)
}

/// Graph for `root` with phases read from the task set.
pub fn build_graph(tasks: TaskSet, root: &str) -> DependencyGraph {
    let phases = PhaseSet::from_tasks(&tasks).expect("valid phase set");
    let mut graph = DependencyGraph::new(Arc::new(tasks), Arc::new(phases));
    graph.build_dependencies(root).expect("graph builds");
    graph
}

pub fn id(graph: &DependencyGraph, name: &str) -> NodeId {
    graph
        .find(name)
        .unwrap_or_else(|| panic!("no node named {name}"))
}

/// Sorted names of the currently schedulable nodes.
pub fn schedulable_names(graph: &DependencyGraph) -> Vec<String> {
    let mut names: Vec<String> = graph
        .discover_schedulable_nodes()
        .into_iter()
        .map(|id| graph.node(id).name().to_string())
        .collect();
    names.sort();
    names
}

/// Walk a node through Queued and Running to Complete.
pub fn run_to_completion(graph: &mut DependencyGraph, name: &str) {
    let node = id(graph, name);
    for state in [TaskState::Queued, TaskState::Running, TaskState::Complete] {
        assert!(graph.node_mut(node).set_state(state));
    }
}

pub fn position(items: &[String], name: &str) -> usize {
    items
        .iter()
        .position(|n| n == name)
        .unwrap_or_else(|| panic!("{name} not found in {items:?}"))
}
