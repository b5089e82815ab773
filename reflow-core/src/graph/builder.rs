//! Graph Builder
//!
//! Assembles the global dependency graph from unit specs and connections.
//!
//! Every derived value gets an edge to each declared dependency, qualified
//! with its own unit name. Every connection adds an edge from the target input
//! to the source value. Every input gets an entry even when nothing depends on
//! it, so that initialization assigns it a value.

use indexmap::{IndexMap, IndexSet};

use super::node::{NodeId, NodeKind};
use crate::error::InitError;
use crate::unit::{Connection, UnitSpec};

/// The frozen dependency graph.
///
/// Edges are kept in both directions: `dependencies` answers "what does this
/// node read", `dependents` answers "who reads this node". Both maps preserve
/// insertion order, which keeps scheduling deterministic for a given set of
/// definitions.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    kinds: IndexMap<NodeId, NodeKind>,
    dependencies: IndexMap<NodeId, IndexSet<NodeId>>,
    dependents: IndexMap<NodeId, IndexSet<NodeId>>,
    /// Connected inputs, mapped to the derived value feeding them.
    feeds: IndexMap<NodeId, NodeId>,
}

impl DependencyGraph {
    /// Build the graph for the given units and connections.
    ///
    /// Only structural problems that would leave an edge dangling are
    /// reported here. Cycles are found by the scheduler.
    pub fn build<V>(units: &[UnitSpec<V>], connections: &[Connection]) -> Result<Self, InitError> {
        let mut graph = Self::default();

        let mut seen = IndexSet::new();
        for unit in units {
            if !seen.insert(unit.name()) {
                return Err(InitError::DuplicateUnit(unit.name().to_string()));
            }
            for (name, _) in unit.inputs() {
                let id = NodeId::new(unit.shared_name().clone(), name.clone());
                graph.add_node(id, NodeKind::Input);
            }
            for (name, _) in unit.derived() {
                let id = NodeId::new(unit.shared_name().clone(), name.clone());
                if graph.contains(&id) {
                    return Err(InitError::DuplicateMember(id));
                }
                graph.add_node(id, NodeKind::Derived);
            }
        }

        for unit in units {
            for (name, derived) in unit.derived() {
                let node = NodeId::new(unit.shared_name().clone(), name.clone());
                for dep in derived.dependencies() {
                    let dependency = NodeId::new(unit.shared_name().clone(), dep);
                    if !graph.contains(&dependency) {
                        return Err(InitError::UnresolvedDependency { node, dependency });
                    }
                    graph.add_edge(dependency, node.clone());
                }
            }
        }

        for connection in connections {
            let (source, target) = (connection.source(), connection.target());
            for endpoint in [source, target] {
                if !graph.contains(endpoint) {
                    return Err(InitError::UnknownConnectionEndpoint(endpoint.clone()));
                }
            }
            if graph.kind(target) != Some(NodeKind::Input) {
                return Err(InitError::ConnectionTargetNotInput(target.clone()));
            }
            graph.add_edge(source.clone(), target.clone());
            graph.feeds.insert(target.clone(), source.clone());
        }

        Ok(graph)
    }

    fn add_node(&mut self, id: NodeId, kind: NodeKind) {
        self.dependencies.entry(id.clone()).or_default();
        self.dependents.entry(id.clone()).or_default();
        self.kinds.insert(id, kind);
    }

    /// Add an edge: `dependent` depends on `dependency`.
    fn add_edge(&mut self, dependency: NodeId, dependent: NodeId) {
        self.dependents
            .entry(dependency.clone())
            .or_default()
            .insert(dependent.clone());
        self.dependencies
            .entry(dependent)
            .or_default()
            .insert(dependency);
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.kinds.contains_key(id)
    }

    pub fn kind(&self, id: &NodeId) -> Option<NodeKind> {
        self.kinds.get(id).copied()
    }

    /// All nodes, unit by unit, inputs before derived values.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> + '_ {
        self.kinds.keys()
    }

    /// Nodes that `id` depends on.
    pub fn dependencies(&self, id: &NodeId) -> Option<&IndexSet<NodeId>> {
        self.dependencies.get(id)
    }

    /// Nodes that depend on `id`.
    pub fn dependents(&self, id: &NodeId) -> Option<&IndexSet<NodeId>> {
        self.dependents.get(id)
    }

    /// The derived value feeding a connected input.
    pub fn feed(&self, input: &NodeId) -> Option<&NodeId> {
        self.feeds.get(input)
    }

    pub fn node_count(&self) -> usize {
        self.kinds.len()
    }

    pub fn edge_count(&self) -> usize {
        self.dependencies.values().map(IndexSet::len).sum()
    }
}
