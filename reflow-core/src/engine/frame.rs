//! Frames
//!
//! A frame batches input writes. Nothing is applied until the frame is
//! committed; committing evaluates the writes against a working copy of the
//! committed state and reports what happened, leaving the decision to keep or
//! discard the result to the engine.
//!
//! # Commit Steps
//!
//! 1. Copy the committed state, apply the staged writes, and clear any
//!    failure recorded for the written nodes
//! 2. Collect the affected set: the written nodes plus everything that
//!    transitively depends on them
//! 3. Order the affected set and evaluate it node by node against the copy
//! 4. Report every affected node that ended in error

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use super::evaluator::Evaluator;
use super::store::Snapshot;
use crate::graph::{NodeId, UpdateScheduler};

/// An open batch of staged input writes.
#[derive(Debug, Clone)]
pub struct Frame<V> {
    writes: IndexMap<NodeId, V>,
}

impl<V> Default for Frame<V> {
    fn default() -> Self {
        Self {
            writes: IndexMap::new(),
        }
    }
}

impl<V: Clone> Frame<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a write, replacing any earlier write to the same node.
    pub fn stage(&mut self, id: NodeId, value: V) {
        self.writes.insert(id, value);
    }

    pub fn staged(&self, id: &NodeId) -> Option<&V> {
        self.writes.get(id)
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Evaluate the staged writes against a copy of `committed`.
    pub(crate) fn apply(
        self,
        committed: &Snapshot<V>,
        scheduler: UpdateScheduler<'_>,
        evaluator: &Evaluator<'_, V>,
    ) -> Applied<V> {
        let mut state = committed.clone();
        for (id, value) in &self.writes {
            state.values.insert(id.clone(), value.clone());
            state.errors.remove(id);
        }

        let affected: IndexSet<NodeId> = scheduler.downstream(self.writes.keys());
        let order = scheduler
            .order(&affected)
            .expect("graph was proven acyclic when the engine was built");
        debug!(writes = self.writes.len(), affected = order.len(), "evaluating frame");

        let mut failed = Vec::new();
        for id in &order {
            if evaluator.evaluate(id, &mut state).is_some() {
                failed.push(id.clone());
            }
        }

        Applied {
            state,
            order,
            failed,
        }
    }
}

/// The evaluated result of a frame, not yet committed.
#[derive(Debug)]
pub(crate) struct Applied<V> {
    /// Working copy after evaluating the affected set.
    pub(crate) state: Snapshot<V>,
    /// The affected set in evaluation order.
    pub(crate) order: Vec<NodeId>,
    /// Affected nodes that ended in error, in evaluation order.
    pub(crate) failed: Vec<NodeId>,
}

impl<V> Applied<V> {
    pub(crate) fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::BlockerReporting;
    use crate::graph::DependencyGraph;
    use crate::unit::UnitSpec;

    struct Fixture {
        units: IndexMap<Arc<str>, UnitSpec<f64>>,
        graph: DependencyGraph,
        committed: Snapshot<f64>,
    }

    impl Fixture {
        fn new(spec: UnitSpec<f64>) -> Self {
            let graph = DependencyGraph::build(std::slice::from_ref(&spec), &[]).unwrap();
            let units: IndexMap<_, _> = [(spec.shared_name().clone(), spec)].into_iter().collect();
            let mut committed = Snapshot::default();
            {
                let evaluator = Evaluator::new(&units, &graph, BlockerReporting::Immediate);
                for id in UpdateScheduler::new(&graph).full_order().unwrap() {
                    evaluator.evaluate(&id, &mut committed);
                }
            }
            Self {
                units,
                graph,
                committed,
            }
        }

        fn apply(&self, frame: Frame<f64>) -> Applied<f64> {
            let evaluator = Evaluator::new(&self.units, &self.graph, BlockerReporting::Immediate);
            frame.apply(&self.committed, UpdateScheduler::new(&self.graph), &evaluator)
        }
    }

    fn two_chains() -> UnitSpec<f64> {
        UnitSpec::new("u")
            .input("a", 1.0)
            .input("b", 100.0)
            .derive("a2", ["a"], |deps| deps["a"] * 2.0)
            .derive("b2", ["b"], |deps| deps["b"] * 2.0)
    }

    #[test]
    fn later_writes_replace_earlier_ones() {
        let mut frame = Frame::new();
        frame.stage(NodeId::new("u", "a"), 1.0);
        frame.stage(NodeId::new("u", "a"), 2.0);

        assert_eq!(frame.len(), 1);
        assert_eq!(frame.staged(&NodeId::new("u", "a")), Some(&2.0));
    }

    #[test]
    fn only_downstream_nodes_are_recomputed() {
        let fixture = Fixture::new(two_chains());

        let mut frame = Frame::new();
        frame.stage(NodeId::new("u", "a"), 5.0);
        let applied = fixture.apply(frame);

        assert!(applied.is_clean());
        assert_eq!(applied.order, vec![NodeId::new("u", "a"), NodeId::new("u", "a2")]);
        assert_eq!(applied.state.values.get(&NodeId::new("u", "a2")), Some(&10.0));
        assert_eq!(applied.state.values.get(&NodeId::new("u", "b2")), Some(&200.0));
    }

    #[test]
    fn committed_state_is_not_touched() {
        let fixture = Fixture::new(two_chains());
        let before = fixture.committed.clone();

        let mut frame = Frame::new();
        frame.stage(NodeId::new("u", "b"), 7.0);
        let applied = fixture.apply(frame);

        assert_eq!(fixture.committed, before);
        assert_eq!(applied.state.values.get(&NodeId::new("u", "b2")), Some(&14.0));
    }

    #[test]
    fn failures_in_the_affected_set_are_reported() {
        let spec = UnitSpec::new("u")
            .input("x", 1.0)
            .derive_fallible("checked", ["x"], |deps| {
                if deps["x"] < 0.0 {
                    Err("negative")
                } else {
                    Ok(deps["x"])
                }
            })
            .derive("after", ["checked"], |deps| deps["checked"] + 1.0);
        let fixture = Fixture::new(spec);

        let mut frame = Frame::new();
        frame.stage(NodeId::new("u", "x"), -1.0);
        let applied = fixture.apply(frame);

        assert!(!applied.is_clean());
        assert_eq!(
            applied.failed,
            vec![NodeId::new("u", "checked"), NodeId::new("u", "after")]
        );
        assert_eq!(applied.state.values.get(&NodeId::new("u", "x")), Some(&-1.0));
        assert_eq!(applied.state.values.get(&NodeId::new("u", "after")), Some(&2.0));
    }
}
