//! Graph Nodes
//!
//! This module defines the identity and kind of the nodes that live in the
//! dependency graph.

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

/// Unique identifier for a node in the dependency graph.
///
/// A node is addressed by the unit that declares it and its member name
/// within that unit. Both halves are shared strings, so cloning an id is a
/// pair of reference-count bumps.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
    unit: Arc<str>,
    member: Arc<str>,
}

impl NodeId {
    /// Create an identifier for `member` of `unit`.
    pub fn new(unit: impl Into<Arc<str>>, member: impl Into<Arc<str>>) -> Self {
        Self {
            unit: unit.into(),
            member: member.into(),
        }
    }

    /// The name of the unit that owns this node.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// The member name of this node within its unit.
    pub fn member(&self) -> &str {
        &self.member
    }

    pub(crate) fn unit_name(&self) -> &Arc<str> {
        &self.unit
    }

    /// Check if this node belongs to the named unit.
    pub fn belongs_to(&self, unit: &str) -> bool {
        &*self.unit == unit
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.unit, self.member)
    }
}

// Serialized as `unit.member` so ids can be used as JSON object keys.
impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<U, M> From<(U, M)> for NodeId
where
    U: Into<Arc<str>>,
    M: Into<Arc<str>>,
{
    fn from((unit, member): (U, M)) -> Self {
        Self::new(unit, member)
    }
}

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// An externally settable leaf. Inputs never fail; a connected input
    /// takes its value from the derived value feeding it.
    Input,

    /// A value computed from other members of the same unit.
    Derived,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_compare_by_unit_and_member() {
        let a = NodeId::new("run", "pace");
        let b = NodeId::from(("run", "pace"));
        let c = NodeId::new("walk", "pace");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a < c);
    }

    #[test]
    fn node_id_display_is_dotted() {
        let id = NodeId::new("run", "distance");
        assert_eq!(id.to_string(), "run.distance");
        assert_eq!(id.unit(), "run");
        assert_eq!(id.member(), "distance");
        assert!(id.belongs_to("run"));
        assert!(!id.belongs_to("runner"));
    }

    #[test]
    fn node_id_serializes_as_string() {
        let id = NodeId::new("filters", "spec");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"filters.spec\"");
    }
}
