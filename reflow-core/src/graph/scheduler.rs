//! Update Scheduler
//!
//! The scheduler determines the order in which nodes are evaluated.
//! It ensures that dependencies are always evaluated before their dependents.
//!
//! # Algorithm
//!
//! Ordering is a depth-first post-order over the `dependencies` relation:
//!
//! 1. Visit each root in graph (or subset) order
//! 2. Before emitting a node, visit every dependency it has not seen yet
//! 3. Emit the node once all its dependencies have been emitted
//!
//! The walk uses an explicit stack, so long dependency chains cannot overflow
//! the call stack. A dependency that is reached again while still on the
//! stack closes a cycle, which is reported instead of looped on.
//!
//! In subgraph mode the walk is restricted to the supplied subset: edges
//! leaving the subset are ignored. The affected set of a frame is closed
//! under "depends on me", so nothing it needs is ever cut off.

use std::collections::{HashMap, VecDeque};

use indexmap::IndexSet;

use super::builder::DependencyGraph;
use super::node::NodeId;
use crate::error::ScheduleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// On the current DFS path.
    Visiting,
    /// Already emitted.
    Done,
}

/// Orders node sets of a [`DependencyGraph`].
#[derive(Debug, Clone, Copy)]
pub struct UpdateScheduler<'g> {
    graph: &'g DependencyGraph,
}

impl<'g> UpdateScheduler<'g> {
    pub fn new(graph: &'g DependencyGraph) -> Self {
        Self { graph }
    }

    /// Order every node of the graph.
    pub fn full_order(&self) -> Result<Vec<NodeId>, ScheduleError> {
        self.post_order(self.graph.nodes(), None)
    }

    /// Order only the nodes in `subset`.
    pub fn order(&self, subset: &IndexSet<NodeId>) -> Result<Vec<NodeId>, ScheduleError> {
        self.post_order(subset.iter(), Some(subset))
    }

    /// The given nodes plus every node transitively depending on them.
    ///
    /// Seeds that are not part of the graph are ignored.
    pub fn downstream<'a>(&self, seeds: impl IntoIterator<Item = &'a NodeId>) -> IndexSet<NodeId>
    where
        'g: 'a,
    {
        let mut affected = IndexSet::new();
        let mut queue: VecDeque<&NodeId> = seeds
            .into_iter()
            .filter(|id| self.graph.contains(id))
            .collect();

        while let Some(node) = queue.pop_front() {
            if !affected.insert(node.clone()) {
                continue;
            }
            if let Some(dependents) = self.graph.dependents(node) {
                queue.extend(dependents.iter().filter(|id| !affected.contains(*id)));
            }
        }

        affected
    }

    fn post_order<'a>(
        &self,
        roots: impl Iterator<Item = &'a NodeId>,
        within: Option<&IndexSet<NodeId>>,
    ) -> Result<Vec<NodeId>, ScheduleError>
    where
        'g: 'a,
    {
        let mut marks: HashMap<&NodeId, Mark> = HashMap::new();
        let mut order = Vec::with_capacity(within.map_or(self.graph.node_count(), IndexSet::len));
        // (node, index of the next dependency to visit)
        let mut stack: Vec<(&NodeId, usize)> = Vec::new();

        for root in roots {
            if marks.contains_key(root) {
                continue;
            }
            marks.insert(root, Mark::Visiting);
            stack.push((root, 0));

            while let Some(&(node, cursor)) = stack.last() {
                let next = self
                    .graph
                    .dependencies(node)
                    .and_then(|deps| deps.get_index(cursor));

                let Some(dep) = next else {
                    stack.pop();
                    marks.insert(node, Mark::Done);
                    order.push(node.clone());
                    continue;
                };

                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }
                if within.is_some_and(|subset| !subset.contains(dep)) {
                    continue;
                }
                match marks.get(dep) {
                    Some(Mark::Done) => {}
                    Some(Mark::Visiting) => {
                        return Err(ScheduleError::Cycle { node: dep.clone() });
                    }
                    None => {
                        marks.insert(dep, Mark::Visiting);
                        stack.push((dep, 0));
                    }
                }
            }
        }

        Ok(order)
    }
}
