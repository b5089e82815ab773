//! Dependency Graph
//!
//! This module implements the global dependency graph that connects the
//! inputs and derived values of every registered unit.
//!
//! # Overview
//!
//! The dependency graph is a directed acyclic graph (DAG) where:
//!
//! - Nodes are inputs or derived values, addressed by `(unit, member)`
//! - Edges are dependencies: a derived value depends on the members it reads,
//!   and a connected input depends on the derived value feeding it
//!
//! The graph is built once from all units and connections and is immutable
//! afterwards. When inputs change, the scheduler walks the `dependents`
//! direction to find the affected set and orders it along `dependencies`.

mod builder;
mod node;
mod scheduler;

pub use builder::DependencyGraph;
pub use node::{NodeId, NodeKind};
pub use scheduler::UpdateScheduler;
