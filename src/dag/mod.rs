// src/dag/mod.rs

//! Dependency graph and scheduling policy.
//!
//! - [`node`] holds the per-task scheduling state.
//! - [`graph`] builds the transitive closure of a root task and answers
//!   "what can run now".
//! - [`phase`] holds the pre-phase membership and the gate that keeps main
//!   work back until the pre-phase has drained.

pub mod graph;
pub mod node;
pub mod phase;

pub use graph::{DependencyGraph, NodeId};
pub use node::GraphNode;
pub use phase::{PhaseGate, PhaseSet};
