//! Engine Runtime
//!
//! The engine owns the frozen graph, the unit definitions, the committed
//! state, the pending snapshot of the last failed frame, and the open frame.
//!
//! # Lifecycle
//!
//! 1. Units and connections are registered with an [`EngineBuilder`].
//!
//! 2. `build` freezes the graph and evaluates every node in full order. Any
//!    failure at this point is fatal: there is no earlier state to keep.
//!
//! 3. Updates go through frames: `start`, any number of `set`s, `commit`.
//!    A commit either replaces the committed state wholesale or leaves it
//!    exactly as it was and keeps the attempt as the pending snapshot.
//!
//! # Thread Safety
//!
//! Every operation runs to completion before returning and mutating ones take
//! `&mut self`. Sharing an engine across threads means wrapping it in a lock
//! of the caller's choosing.

use std::fmt::Debug;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, debug_span, warn};

use super::evaluator::Evaluator;
use super::frame::Frame;
use super::store::Snapshot;
use crate::config::EngineConfig;
use crate::error::{Failure, InitError, UsageError};
use crate::graph::{DependencyGraph, NodeId, NodeKind, UpdateScheduler};
use crate::unit::{Connection, UnitSpec};

/// Result of committing a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The new state was committed. Lists the recomputed nodes in evaluation
    /// order.
    Committed { recomputed: Vec<NodeId> },

    /// At least one affected node ended in error. The committed state is
    /// unchanged and the attempt is available as the pending snapshot.
    Rejected { failed: Vec<NodeId> },
}

impl CommitOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// Collects units and connections before the graph is frozen.
pub struct EngineBuilder<V> {
    units: Vec<UnitSpec<V>>,
    connections: Vec<Connection>,
    config: EngineConfig,
}

impl<V> Default for EngineBuilder<V> {
    fn default() -> Self {
        Self {
            units: Vec::new(),
            connections: Vec::new(),
            config: EngineConfig::default(),
        }
    }
}

impl<V: Clone> EngineBuilder<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unit(mut self, unit: UnitSpec<V>) -> Self {
        self.units.push(unit);
        self
    }

    pub fn units(mut self, units: impl IntoIterator<Item = UnitSpec<V>>) -> Self {
        self.units.extend(units);
        self
    }

    pub fn connect(mut self, connection: Connection) -> Self {
        self.connections.push(connection);
        self
    }

    pub fn connections(mut self, connections: impl IntoIterator<Item = Connection>) -> Self {
        self.connections.extend(connections);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Freeze the graph and compute the initial state.
    pub fn build(self) -> Result<Engine<V>, InitError> {
        let Self {
            units,
            connections,
            config,
        } = self;
        let _span = debug_span!("initialize", engine = config.label()).entered();

        let graph = DependencyGraph::build(&units, &connections)?;
        let order = UpdateScheduler::new(&graph).full_order()?;
        let units: IndexMap<Arc<str>, UnitSpec<V>> = units
            .into_iter()
            .map(|unit| (unit.shared_name().clone(), unit))
            .collect();

        let mut committed = Snapshot::default();
        let evaluator = Evaluator::new(&units, &graph, config.blocker);
        for id in &order {
            evaluator.evaluate(id, &mut committed);
        }

        if !committed.errors.is_empty() {
            let failures: Vec<(NodeId, Failure)> = committed
                .errors
                .iter()
                .map(|(id, failure)| (id.clone(), failure.clone()))
                .collect();
            warn!(failed = failures.len(), "initial evaluation failed");
            return Err(InitError::Failed { failures });
        }

        debug!(
            units = units.len(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "engine initialized"
        );

        Ok(Engine {
            units,
            graph,
            committed,
            pending: None,
            frame: None,
            config,
        })
    }
}

/// The dependency-graph evaluation engine.
pub struct Engine<V> {
    units: IndexMap<Arc<str>, UnitSpec<V>>,
    graph: DependencyGraph,
    committed: Snapshot<V>,
    pending: Option<Snapshot<V>>,
    frame: Option<Frame<V>>,
    config: EngineConfig,
}

impl<V: Clone> Engine<V> {
    pub fn builder() -> EngineBuilder<V> {
        EngineBuilder::new()
    }

    /// Build an engine with the default config.
    pub fn initialize(
        units: impl IntoIterator<Item = UnitSpec<V>>,
        connections: impl IntoIterator<Item = Connection>,
    ) -> Result<Self, InitError> {
        EngineBuilder::new()
            .units(units)
            .connections(connections)
            .build()
    }

    // --- Frames ---

    /// Open a frame.
    pub fn start(&mut self) -> Result<(), UsageError> {
        if self.frame.is_some() {
            return Err(UsageError::FrameAlreadyOpen);
        }
        self.frame = Some(Frame::new());
        Ok(())
    }

    /// Stage a write to an input in the open frame.
    ///
    /// Writing to a connected input is allowed, but the value is replaced by
    /// the input's feed when the frame is evaluated.
    pub fn set(&mut self, unit: &str, member: &str, value: V) -> Result<(), UsageError> {
        if self.frame.is_none() {
            return Err(UsageError::NoOpenFrame);
        }
        let id = self.input_id(unit, member)?;
        if self.graph.feed(&id).is_some() {
            debug!(node = %id, "write to connected input will be replaced by its feed");
        }
        if let Some(frame) = self.frame.as_mut() {
            frame.stage(id, value);
        }
        Ok(())
    }

    /// Evaluate the open frame and commit it if nothing it affects fails.
    pub fn commit(&mut self) -> Result<CommitOutcome, UsageError> {
        let frame = self.frame.take().ok_or(UsageError::NoOpenFrame)?;
        let _span = debug_span!("commit", engine = self.config.label()).entered();

        let evaluator = Evaluator::new(&self.units, &self.graph, self.config.blocker);
        let applied = frame.apply(&self.committed, UpdateScheduler::new(&self.graph), &evaluator);

        if applied.is_clean() {
            debug!(recomputed = applied.order.len(), "frame committed");
            self.committed = applied.state;
            self.pending = None;
            Ok(CommitOutcome::Committed {
                recomputed: applied.order,
            })
        } else {
            warn!(
                failed = applied.failed.len(),
                first = ?applied.failed.first(),
                "frame rejected, committed state kept"
            );
            self.pending = Some(applied.state);
            Ok(CommitOutcome::Rejected {
                failed: applied.failed,
            })
        }
    }

    /// Write several inputs of one unit in a single frame.
    ///
    /// Every write is checked before the frame opens, so a bad name leaves no
    /// frame behind.
    pub fn update<K>(
        &mut self,
        unit: &str,
        writes: impl IntoIterator<Item = (K, V)>,
    ) -> Result<CommitOutcome, UsageError>
    where
        K: AsRef<str>,
    {
        if self.frame.is_some() {
            return Err(UsageError::FrameAlreadyOpen);
        }
        let mut frame = Frame::new();
        for (member, value) in writes {
            frame.stage(self.input_id(unit, member.as_ref())?, value);
        }
        self.frame = Some(frame);
        self.commit()
    }

    fn input_id(&self, unit: &str, member: &str) -> Result<NodeId, UsageError> {
        let id = NodeId::new(unit, member);
        match self.graph.kind(&id) {
            Some(NodeKind::Input) => Ok(id),
            Some(NodeKind::Derived) => Err(UsageError::NotAnInput(id)),
            None => Err(UsageError::UnknownNode(id)),
        }
    }

    pub fn is_frame_open(&self) -> bool {
        self.frame.is_some()
    }

    // --- Reads ---

    /// Committed values of a unit, keyed by member name.
    pub fn current_values(&self, unit: &str) -> IndexMap<&str, &V> {
        self.committed.values_for(unit)
    }

    /// Committed failures of a unit, keyed by member name.
    pub fn current_errors(&self, unit: &str) -> IndexMap<&str, &Failure> {
        self.committed.errors_for(unit)
    }

    /// Values of a unit from the last rejected frame; empty if there is none.
    pub fn pending_values(&self, unit: &str) -> IndexMap<&str, &V> {
        self.pending
            .as_ref()
            .map(|pending| pending.values_for(unit))
            .unwrap_or_default()
    }

    /// Failures of a unit from the last rejected frame; empty if there is none.
    pub fn pending_errors(&self, unit: &str) -> IndexMap<&str, &Failure> {
        self.pending
            .as_ref()
            .map(|pending| pending.errors_for(unit))
            .unwrap_or_default()
    }

    /// True unless the last commit was rejected.
    pub fn is_success(&self) -> bool {
        self.pending.is_none()
    }

    /// Committed value of one member.
    pub fn value(&self, unit: &str, member: &str) -> Option<&V> {
        self.committed.values.get(&NodeId::new(unit, member))
    }

    /// Committed failure of one member.
    pub fn error(&self, unit: &str, member: &str) -> Option<&Failure> {
        self.committed.errors.get(&NodeId::new(unit, member))
    }

    /// Resolve a blocked failure to the failure that started its chain.
    ///
    /// Looks in the pending snapshot while there is one, since that is where
    /// the failures of the last attempt live, and in the committed state
    /// otherwise.
    pub fn root_cause(&self, unit: &str, member: &str) -> Option<(&NodeId, &Failure)> {
        let id = NodeId::new(unit, member);
        self.pending
            .as_ref()
            .unwrap_or(&self.committed)
            .errors
            .root_cause(&id)
    }

    pub fn committed(&self) -> &Snapshot<V> {
        &self.committed
    }

    pub fn pending(&self) -> Option<&Snapshot<V>> {
        self.pending.as_ref()
    }

    /// Registered unit names, in registration order.
    pub fn units(&self) -> impl Iterator<Item = &str> + '_ {
        self.units.keys().map(|name| &**name)
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl<V: Debug> Debug for Engine<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("label", &self.config.label())
            .field("units", &self.units.len())
            .field("nodes", &self.graph.node_count())
            .field("frame_open", &self.frame.is_some())
            .field("success", &self.pending.is_none())
            .finish()
    }
}
