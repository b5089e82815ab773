//! Reflow Core
//!
//! This crate provides the dependency-graph evaluation engine behind the
//! Reflow reactive dataflow layer. An application declares units of inputs
//! and derived values, connects units together, and the engine keeps every
//! derived value consistent as inputs change.
//!
//! It implements:
//!
//! - Global dependency graph construction across connected units
//! - Topological scheduling of the full graph and of affected subgraphs
//! - Incremental recomputation with failure classification and blocking
//! - All-or-nothing frames that keep the failed attempt for inspection
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `unit`: unit definitions, compute functions, and connections
//! - `graph`: node identities, the frozen dependency graph, and scheduling
//! - `engine`: value/error stores, evaluation, frames, and the engine facade
//! - `config`: engine configuration
//! - `error`: failure classification and error types
//!
//! # Example
//!
//! ```rust
//! use reflow_core::{Engine, UnitSpec};
//!
//! let run = UnitSpec::new("run")
//!     .input("time", 30.0)
//!     .input("distance", 10.0)
//!     .derive_fallible("pace", ["time", "distance"], |deps| {
//!         if deps["distance"] == 0.0 {
//!             Err("distance must be positive")
//!         } else {
//!             Ok(deps["time"] / deps["distance"])
//!         }
//!     });
//!
//! let mut engine = Engine::initialize([run], []).unwrap();
//! assert_eq!(engine.value("run", "pace"), Some(&3.0));
//!
//! // A failing frame leaves the committed state alone
//! engine.start().unwrap();
//! engine.set("run", "distance", 0.0).unwrap();
//! let outcome = engine.commit().unwrap();
//!
//! assert!(!outcome.is_committed());
//! assert!(!engine.is_success());
//! assert_eq!(engine.value("run", "pace"), Some(&3.0));
//! assert_eq!(engine.pending_values("run")["distance"], &0.0);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod unit;

pub use config::{BlockerReporting, EngineConfig};
pub use engine::{CommitOutcome, Engine, EngineBuilder, ErrorStore, Frame, Snapshot, ValueStore};
pub use error::{ConfigError, Failure, InitError, ScheduleError, UsageError};
pub use graph::{NodeId, NodeKind};
pub use unit::{Connection, Derived, Outcome, UnitSpec, Values};
