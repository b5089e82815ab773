//! Evaluation Engine
//!
//! This module turns a frozen [`DependencyGraph`](crate::graph::DependencyGraph)
//! and its unit definitions into committed state, and keeps that state
//! consistent as inputs change.
//!
//! # Concepts
//!
//! ## Snapshots
//!
//! A [`Snapshot`] pairs a value store with an error store. The engine's
//! committed state is a snapshot, and so is the pending snapshot left behind by
//! a rejected frame. The two stores are only ever replaced together.
//!
//! ## Frames
//!
//! A [`Frame`] batches input writes. Committing evaluates only the nodes
//! downstream of the written inputs, in dependency order, against a working
//! copy of the committed state.
//!
//! ## Failures
//!
//! A node whose compute function reports a failure is in error; every node
//! reading it is blocked without its function being called. Failures never
//! stop the rest of a frame from being evaluated, but any failure in the
//! affected set stops the frame from being committed.

mod evaluator;
mod frame;
mod runtime;
mod store;

pub use frame::Frame;
pub use runtime::{CommitOutcome, Engine, EngineBuilder};
pub use store::{ErrorStore, Snapshot, ValueStore};
