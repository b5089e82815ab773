//! Error types for the evaluation engine.
//!
//! There are two families here. [`Failure`] is data: it describes why a
//! single node has no fresh value and lives in the error store alongside the
//! values. The remaining enums are ordinary Rust errors returned to the caller
//! of a misused or impossible operation.

use serde::Serialize;
use thiserror::Error;

use crate::graph::NodeId;

/// Why a node could not produce a value.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Failure {
    /// The compute function explicitly signaled a domain failure.
    #[error("expected failure: {reason}")]
    Expected { reason: String },

    /// A dependency is in error, so the compute function was not called.
    ///
    /// `blocker` is the immediate dependency in error unless the engine is
    /// configured to resolve root causes.
    #[error("blocked by {blocker}")]
    Blocked { blocker: NodeId },
}

impl Failure {
    pub fn expected(reason: impl Into<String>) -> Self {
        Self::Expected {
            reason: reason.into(),
        }
    }

    pub fn blocked(blocker: NodeId) -> Self {
        Self::Blocked { blocker }
    }

    pub fn is_expected(&self) -> bool {
        matches!(self, Self::Expected { .. })
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }

    /// The blocking dependency, for blocked failures.
    pub fn blocker(&self) -> Option<&NodeId> {
        match self {
            Self::Blocked { blocker } => Some(blocker),
            Self::Expected { .. } => None,
        }
    }
}

/// Programmer errors in the calling sequence of the frame API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UsageError {
    #[error("a frame is already open")]
    FrameAlreadyOpen,

    #[error("no frame is open")]
    NoOpenFrame,

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("{0} is a derived value and cannot be written")]
    NotAnInput(NodeId),
}

/// Failure to order a node set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The dependency relation loops back through `node`.
    #[error("dependency cycle through {node}")]
    Cycle { node: NodeId },
}

/// Fatal errors raised while building and initializing an engine.
///
/// There is no prior good state to fall back to, so none of these are
/// recoverable for the engine instance being built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InitError {
    #[error("{node} depends on {dependency}, which is not declared")]
    UnresolvedDependency { node: NodeId, dependency: NodeId },

    #[error("connection endpoint {0} is not declared")]
    UnknownConnectionEndpoint(NodeId),

    #[error("connection target {0} is not an input")]
    ConnectionTargetNotInput(NodeId),

    #[error("unit `{0}` is registered more than once")]
    DuplicateUnit(String),

    #[error("{0} is declared both as an input and as a derived value")]
    DuplicateMember(NodeId),

    #[error(transparent)]
    Cycle(#[from] ScheduleError),

    /// Initial evaluation left nodes in error.
    #[error("initial evaluation failed for {}", describe(.failures))]
    Failed { failures: Vec<(NodeId, Failure)> },
}

fn describe(failures: &[(NodeId, Failure)]) -> String {
    failures
        .iter()
        .map(|(node, failure)| format!("{node} ({failure})"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors loading an [`EngineConfig`](crate::EngineConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid engine config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_classification() {
        let expected = Failure::expected("distance is zero");
        let blocked = Failure::blocked(NodeId::new("run", "pace"));

        assert!(expected.is_expected());
        assert!(!expected.is_blocked());
        assert_eq!(expected.blocker(), None);

        assert!(blocked.is_blocked());
        assert_eq!(blocked.blocker(), Some(&NodeId::new("run", "pace")));
    }

    #[test]
    fn failure_messages() {
        assert_eq!(
            Failure::expected("distance is zero").to_string(),
            "expected failure: distance is zero"
        );
        assert_eq!(
            Failure::blocked(NodeId::new("run", "pace")).to_string(),
            "blocked by run.pace"
        );
    }

    #[test]
    fn init_failure_lists_every_node() {
        let err = InitError::Failed {
            failures: vec![
                (NodeId::new("run", "pace"), Failure::expected("distance is zero")),
                (
                    NodeId::new("run", "speed"),
                    Failure::blocked(NodeId::new("run", "pace")),
                ),
            ],
        };

        assert_eq!(
            err.to_string(),
            "initial evaluation failed for run.pace (expected failure: distance is zero), \
             run.speed (blocked by run.pace)"
        );
    }

    #[test]
    fn failure_serializes_with_kind_tag() {
        let json = serde_json::to_value(Failure::blocked(NodeId::new("a", "b"))).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "blocked", "blocker": "a.b" }));
    }
}
