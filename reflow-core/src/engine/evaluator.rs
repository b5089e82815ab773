//! Single-node evaluation.
//!
//! The evaluator computes one node against a working [`Snapshot`], writing
//! the new value or failure back into it. Callers are responsible for visiting
//! nodes in dependency order.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::trace;

use super::store::Snapshot;
use crate::config::BlockerReporting;
use crate::error::Failure;
use crate::graph::{DependencyGraph, NodeId};
use crate::unit::{Outcome, UnitSpec, Values};

pub(crate) struct Evaluator<'e, V> {
    units: &'e IndexMap<Arc<str>, UnitSpec<V>>,
    graph: &'e DependencyGraph,
    blocker: BlockerReporting,
}

impl<'e, V: Clone> Evaluator<'e, V> {
    pub(crate) fn new(
        units: &'e IndexMap<Arc<str>, UnitSpec<V>>,
        graph: &'e DependencyGraph,
        blocker: BlockerReporting,
    ) -> Self {
        Self {
            units,
            graph,
            blocker,
        }
    }

    /// Evaluate `id` and record the result in `state`.
    ///
    /// Returns the failure recorded for the node, if any. A failed node keeps
    /// whatever value it had before.
    pub(crate) fn evaluate(&self, id: &NodeId, state: &mut Snapshot<V>) -> Option<Failure> {
        let unit = self.units.get(id.unit())?;

        if let Some(initial) = unit.initial(id.member()) {
            self.evaluate_input(id, initial, state);
            return None;
        }

        let derived = unit.derived_value(id.member())?;
        let deps: Vec<NodeId> = derived
            .dependencies()
            .map(|name| NodeId::new(Arc::clone(id.unit_name()), name))
            .collect();

        // First dependency in declaration order that is in error blocks us.
        if let Some(blocked_by) = deps.iter().find_map(|dep| self.failing(dep, state)) {
            let blocker = match self.blocker {
                BlockerReporting::Immediate => blocked_by.clone(),
                BlockerReporting::RootCause => state
                    .errors
                    .root_cause(blocked_by)
                    .map_or_else(|| blocked_by.clone(), |(root, _)| root.clone()),
            };
            trace!(node = %id, %blocker, "blocked");
            let failure = Failure::blocked(blocker);
            state.errors.insert(id.clone(), failure.clone());
            return Some(failure);
        }

        let outcome = {
            let values = Values::new(
                deps.iter()
                    .map(|dep| {
                        let value = state
                            .values
                            .get(dep)
                            .expect("dependencies are evaluated before their dependents");
                        (dep.member(), value)
                    })
                    .collect(),
            );
            let prior = if derived.is_stateful() {
                Values::new(state.values.for_unit(id.unit()))
            } else {
                Values::new(IndexMap::new())
            };
            derived.call(&values, &prior)
        };

        match outcome {
            Outcome::Success(value) => {
                trace!(node = %id, "computed");
                state.values.insert(id.clone(), value);
                state.errors.remove(id);
                None
            }
            Outcome::Failure(reason) => {
                trace!(node = %id, %reason, "expected failure");
                let failure = Failure::expected(reason);
                state.errors.insert(id.clone(), failure.clone());
                Some(failure)
            }
        }
    }

    /// The node in error behind `dep`, if any.
    ///
    /// Inputs never fail, so a connected input stands in for its feed: when
    /// the feed is in error, readers of the input are blocked by the feed.
    fn failing<'s>(&'s self, dep: &'s NodeId, state: &Snapshot<V>) -> Option<&'s NodeId> {
        if state.errors.contains(dep) {
            return Some(dep);
        }
        self.graph
            .feed(dep)
            .filter(|source| state.errors.contains(source))
    }

    /// A connected input mirrors its feed; otherwise it keeps the value it
    /// holds, falling back to its initial value.
    fn evaluate_input(&self, id: &NodeId, initial: &V, state: &mut Snapshot<V>) {
        let fed = self
            .graph
            .feed(id)
            .and_then(|source| state.values.get(source));
        let value = match fed.or_else(|| state.values.get(id)) {
            Some(value) => value.clone(),
            None => initial.clone(),
        };
        trace!(node = %id, connected = fed.is_some(), "input");
        state.values.insert(id.clone(), value);
        state.errors.remove(id);
    }
}
