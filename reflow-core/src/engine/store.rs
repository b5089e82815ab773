//! Value and error stores.
//!
//! The committed state of an engine, and the pending snapshot of a failed
//! frame, are both a [`Snapshot`]: a value store and an error store that are
//! only ever replaced together.

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::Failure;
use crate::graph::NodeId;

/// Last successfully computed value of each node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValueStore<V> {
    values: IndexMap<NodeId, V>,
}

impl<V> Default for ValueStore<V> {
    fn default() -> Self {
        Self {
            values: IndexMap::new(),
        }
    }
}

impl<V> ValueStore<V> {
    pub fn get(&self, id: &NodeId) -> Option<&V> {
        self.values.get(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.values.contains_key(id)
    }

    pub fn insert(&mut self, id: NodeId, value: V) {
        self.values.insert(id, value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &V)> + '_ {
        self.values.iter()
    }

    /// Values of one unit, keyed by member name.
    pub fn for_unit(&self, unit: &str) -> IndexMap<&str, &V> {
        self.values
            .iter()
            .filter(|(id, _)| id.belongs_to(unit))
            .map(|(id, value)| (id.member(), value))
            .collect()
    }
}

/// Current failure of each node in error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorStore {
    errors: IndexMap<NodeId, Failure>,
}

impl ErrorStore {
    pub fn get(&self, id: &NodeId) -> Option<&Failure> {
        self.errors.get(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.errors.contains_key(id)
    }

    pub fn insert(&mut self, id: NodeId, failure: Failure) {
        self.errors.insert(id, failure);
    }

    pub fn remove(&mut self, id: &NodeId) -> Option<Failure> {
        self.errors.shift_remove(id)
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &Failure)> + '_ {
        self.errors.iter()
    }

    /// Failures of one unit, keyed by member name.
    pub fn for_unit(&self, unit: &str) -> IndexMap<&str, &Failure> {
        self.errors
            .iter()
            .filter(|(id, _)| id.belongs_to(unit))
            .map(|(id, failure)| (id.member(), failure))
            .collect()
    }

    /// Follow blocked failures from `id` back to the node that started the
    /// chain.
    ///
    /// Returns `None` if `id` is not in error. If a blocker in the chain has
    /// no recorded failure, the last node that does is returned.
    pub fn root_cause<'s>(&'s self, id: &NodeId) -> Option<(&'s NodeId, &'s Failure)> {
        let mut current = self.errors.get_key_value(id)?;
        // A chain can visit each recorded failure at most once.
        for _ in 0..self.errors.len() {
            let Some(next) = current
                .1
                .blocker()
                .and_then(|blocker| self.errors.get_key_value(blocker))
            else {
                break;
            };
            current = next;
        }
        Some(current)
    }
}

/// A value store and error store that change together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot<V> {
    pub values: ValueStore<V>,
    pub errors: ErrorStore,
}

impl<V> Default for Snapshot<V> {
    fn default() -> Self {
        Self {
            values: ValueStore::default(),
            errors: ErrorStore::default(),
        }
    }
}

impl<V> Snapshot<V> {
    /// Values of one unit, keyed by member name.
    pub fn values_for(&self, unit: &str) -> IndexMap<&str, &V> {
        self.values.for_unit(unit)
    }

    /// Failures of one unit, keyed by member name.
    pub fn errors_for(&self, unit: &str) -> IndexMap<&str, &Failure> {
        self.errors.for_unit(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(member: &str) -> NodeId {
        NodeId::new("u", member)
    }

    #[test]
    fn projections_filter_by_unit() {
        let mut values = ValueStore::default();
        values.insert(NodeId::new("run", "time"), 30.0);
        values.insert(NodeId::new("walk", "time"), 50.0);
        values.insert(NodeId::new("run", "distance"), 10.0);

        let run = values.for_unit("run");
        assert_eq!(run.len(), 2);
        assert_eq!(run["time"], &30.0);
        assert_eq!(run["distance"], &10.0);
        assert!(values.for_unit("swim").is_empty());
    }

    #[test]
    fn root_cause_walks_blocked_chain() {
        let mut errors = ErrorStore::default();
        errors.insert(id("a"), Failure::expected("bad input"));
        errors.insert(id("b"), Failure::blocked(id("a")));
        errors.insert(id("c"), Failure::blocked(id("b")));

        let (root, failure) = errors.root_cause(&id("c")).unwrap();
        assert_eq!(root, &id("a"));
        assert_eq!(failure, &Failure::expected("bad input"));

        assert_eq!(errors.root_cause(&id("a")).unwrap().0, &id("a"));
        assert!(errors.root_cause(&id("z")).is_none());
    }

    #[test]
    fn root_cause_stops_at_missing_blocker() {
        let mut errors = ErrorStore::default();
        errors.insert(id("b"), Failure::blocked(id("gone")));

        assert_eq!(errors.root_cause(&id("b")).unwrap().0, &id("b"));
    }

    #[test]
    fn removing_an_error_keeps_order_of_the_rest() {
        let mut errors = ErrorStore::default();
        errors.insert(id("a"), Failure::expected("x"));
        errors.insert(id("b"), Failure::expected("y"));
        errors.insert(id("c"), Failure::expected("z"));

        assert!(errors.remove(&id("b")).is_some());
        let remaining: Vec<_> = errors.iter().map(|(id, _)| id.member().to_string()).collect();
        assert_eq!(remaining, vec!["a", "c"]);
    }

    #[test]
    fn snapshot_serializes_with_dotted_keys() {
        let mut snapshot = Snapshot::default();
        snapshot.values.insert(NodeId::new("run", "pace"), 3.0);
        snapshot
            .errors
            .insert(NodeId::new("run", "speed"), Failure::expected("too fast"));

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "values": { "run.pace": 3.0 },
                "errors": { "run.speed": { "kind": "expected", "reason": "too fast" } }
            })
        );
    }
}
