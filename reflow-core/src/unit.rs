//! Unit Definitions
//!
//! A unit is a named scope of inputs and derived values. Units are described
//! by an immutable [`UnitSpec`] handed to the engine by the definition layer,
//! and joined together by [`Connection`]s.
//!
//! # Compute Functions
//!
//! A derived value carries an explicit list of dependency names and a pure
//! function from the values of those dependencies to a result. Functions come
//! in several shapes, all normalized into an [`Outcome`] when registered:
//!
//! - [`UnitSpec::derive`]: returns a plain value, which always succeeds
//! - [`UnitSpec::derive_fallible`]: returns a `Result`; `Err` is an expected failure
//! - [`UnitSpec::derive_outcome`]: returns an [`Outcome`] directly
//! - [`UnitSpec::derive_stateful`]: also receives the unit's current values,
//!   including the derived value's own last output
//!
//! # Example
//!
//! ```rust
//! use reflow_core::UnitSpec;
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
//! assert_eq!(run.name(), "run");
//! ```

use std::fmt::{self, Debug, Display};
use std::ops::Index;
use std::sync::Arc;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::graph::NodeId;

/// Normalized result of a compute function.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<V> {
    /// The function produced a value.
    Success(V),

    /// The function explicitly reported that it cannot produce a value for
    /// the given inputs.
    Failure(String),
}

impl<V> Outcome<V> {
    pub fn success(value: V) -> Self {
        Self::Success(value)
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure(reason.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl<V, E: Display> From<Result<V, E>> for Outcome<V> {
    fn from(result: Result<V, E>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(reason) => Self::Failure(reason.to_string()),
        }
    }
}

/// A read-only view of member values, keyed by member name.
///
/// Compute functions receive one of these holding exactly their declared
/// dependencies. Indexing with a name that is not present panics, the same
/// way indexing a map does.
pub struct Values<'a, V> {
    members: IndexMap<&'a str, &'a V>,
}

impl<'a, V> Values<'a, V> {
    pub(crate) fn new(members: IndexMap<&'a str, &'a V>) -> Self {
        Self { members }
    }

    /// Get the value of a member, if present.
    pub fn get(&self, name: &str) -> Option<&'a V> {
        self.members.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Iterate over `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a V)> + '_ {
        self.members.iter().map(|(name, value)| (*name, *value))
    }
}

impl<V> Index<&str> for Values<'_, V> {
    type Output = V;

    fn index(&self, name: &str) -> &V {
        self.get(name)
            .unwrap_or_else(|| panic!("no value named `{name}` in scope"))
    }
}

impl<V: Debug> Debug for Values<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.members.iter()).finish()
    }
}

type PureFn<V> = dyn Fn(&Values<'_, V>) -> Outcome<V> + Send + Sync;
type StatefulFn<V> = dyn Fn(&Values<'_, V>, &Values<'_, V>) -> Outcome<V> + Send + Sync;

enum Compute<V> {
    Pure(Arc<PureFn<V>>),
    Stateful(Arc<StatefulFn<V>>),
}

impl<V> Clone for Compute<V> {
    fn clone(&self) -> Self {
        match self {
            Self::Pure(f) => Self::Pure(Arc::clone(f)),
            Self::Stateful(f) => Self::Stateful(Arc::clone(f)),
        }
    }
}

fn pure<V, F>(f: F) -> Compute<V>
where
    F: Fn(&Values<'_, V>) -> Outcome<V> + Send + Sync + 'static,
{
    Compute::Pure(Arc::new(f))
}

/// A derived value: a compute function plus its declared dependencies.
pub struct Derived<V> {
    dependencies: SmallVec<[Arc<str>; 4]>,
    compute: Compute<V>,
}

impl<V> Derived<V> {
    /// Dependency member names, in declaration order.
    pub fn dependencies(&self) -> impl Iterator<Item = &str> + '_ {
        self.dependencies.iter().map(|name| &**name)
    }

    /// Whether the compute function also reads the unit's current values.
    pub fn is_stateful(&self) -> bool {
        matches!(self.compute, Compute::Stateful(_))
    }

    /// Run the compute function.
    ///
    /// `prior` is only consulted by stateful functions.
    pub(crate) fn call(&self, deps: &Values<'_, V>, prior: &Values<'_, V>) -> Outcome<V> {
        match &self.compute {
            Compute::Pure(f) => f(deps),
            Compute::Stateful(f) => f(deps, prior),
        }
    }
}

impl<V> Clone for Derived<V> {
    fn clone(&self) -> Self {
        Self {
            dependencies: self.dependencies.clone(),
            compute: self.compute.clone(),
        }
    }
}

impl<V> Debug for Derived<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derived")
            .field("dependencies", &self.dependencies)
            .field("stateful", &self.is_stateful())
            .finish()
    }
}

/// Immutable description of one computation unit.
pub struct UnitSpec<V> {
    name: Arc<str>,
    inputs: IndexMap<Arc<str>, V>,
    derived: IndexMap<Arc<str>, Derived<V>>,
}

impl<V: 'static> UnitSpec<V> {
    /// Start describing a unit with the given name.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            inputs: IndexMap::new(),
            derived: IndexMap::new(),
        }
    }

    /// Declare an input with its initial value.
    pub fn input(mut self, name: impl Into<Arc<str>>, initial: V) -> Self {
        self.inputs.insert(name.into(), initial);
        self
    }

    /// Declare a derived value whose function always succeeds.
    pub fn derive<F>(
        self,
        name: impl Into<Arc<str>>,
        deps: impl IntoIterator<Item = impl Into<Arc<str>>>,
        f: F,
    ) -> Self
    where
        F: Fn(&Values<'_, V>) -> V + Send + Sync + 'static,
    {
        self.with_derived(name, deps, pure(move |values| Outcome::Success(f(values))))
    }

    /// Declare a derived value whose function may fail with a reason.
    pub fn derive_fallible<F, E>(
        self,
        name: impl Into<Arc<str>>,
        deps: impl IntoIterator<Item = impl Into<Arc<str>>>,
        f: F,
    ) -> Self
    where
        F: Fn(&Values<'_, V>) -> Result<V, E> + Send + Sync + 'static,
        E: Display,
    {
        self.with_derived(name, deps, pure(move |values| Outcome::from(f(values))))
    }

    /// Declare a derived value whose function returns an [`Outcome`].
    pub fn derive_outcome<F>(
        self,
        name: impl Into<Arc<str>>,
        deps: impl IntoIterator<Item = impl Into<Arc<str>>>,
        f: F,
    ) -> Self
    where
        F: Fn(&Values<'_, V>) -> Outcome<V> + Send + Sync + 'static,
    {
        self.with_derived(name, deps, pure(f))
    }

    /// Declare a derived value that also reads the unit's current values.
    ///
    /// The second argument holds every member of the unit as it stands when
    /// the function runs; the derived value's own entry is its last output
    /// (absent on the first evaluation).
    pub fn derive_stateful<F>(
        self,
        name: impl Into<Arc<str>>,
        deps: impl IntoIterator<Item = impl Into<Arc<str>>>,
        f: F,
    ) -> Self
    where
        F: Fn(&Values<'_, V>, &Values<'_, V>) -> Outcome<V> + Send + Sync + 'static,
    {
        self.with_derived(name, deps, Compute::Stateful(Arc::new(f)))
    }

    fn with_derived(
        mut self,
        name: impl Into<Arc<str>>,
        deps: impl IntoIterator<Item = impl Into<Arc<str>>>,
        compute: Compute<V>,
    ) -> Self {
        let dependencies = deps.into_iter().map(Into::into).collect();
        self.derived.insert(name.into(), Derived { dependencies, compute });
        self
    }
}

impl<V> UnitSpec<V> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> &Arc<str> {
        &self.name
    }

    /// Declared inputs with their initial values.
    pub fn inputs(&self) -> impl Iterator<Item = (&Arc<str>, &V)> + '_ {
        self.inputs.iter()
    }

    /// Declared derived values.
    pub fn derived(&self) -> impl Iterator<Item = (&Arc<str>, &Derived<V>)> + '_ {
        self.derived.iter()
    }

    /// Initial value of an input, or `None` if `member` is not an input.
    pub fn initial(&self, member: &str) -> Option<&V> {
        self.inputs.get(member)
    }

    pub fn derived_value(&self, member: &str) -> Option<&Derived<V>> {
        self.derived.get(member)
    }

    pub fn has_member(&self, member: &str) -> bool {
        self.inputs.contains_key(member) || self.derived.contains_key(member)
    }
}

impl<V: Clone> Clone for UnitSpec<V> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            inputs: self.inputs.clone(),
            derived: self.derived.clone(),
        }
    }
}

impl<V: Debug> Debug for UnitSpec<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitSpec")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("derived", &self.derived)
            .finish()
    }
}

/// A cross-unit edge: a derived value of one unit supplies an input of another.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Connection {
    source: NodeId,
    target: NodeId,
}

impl Connection {
    /// Feed `source_value` of `source_unit` into `target_input` of `target_unit`.
    pub fn new(
        source_unit: impl Into<Arc<str>>,
        source_value: impl Into<Arc<str>>,
        target_unit: impl Into<Arc<str>>,
        target_input: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            source: NodeId::new(source_unit, source_value),
            target: NodeId::new(target_unit, target_input),
        }
    }

    /// The derived value supplying the data.
    pub fn source(&self) -> &NodeId {
        &self.source
    }

    /// The input receiving the data.
    pub fn target(&self) -> &NodeId {
        &self.target
    }
}
