//! Identities and results shared by the compiler and the resolver.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifier of one parameterized registration, unique within a trie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PatternId(pub(crate) u32);

impl PatternId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A parameter of a registered pattern.
///
/// Identity is the pattern plus the placeholder's position in it, never the
/// name, so `{id}` in two different patterns are two different parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PatternParameter {
    pub pattern: PatternId,
    pub index: usize,
}

/// Capture state of one parameter along one resolution path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub(crate) struct ParameterResult {
    pub value: String,
    /// The path sits at a node where this parameter may legally end.
    pub ended: bool,
}

/// One stored value together with the parameters bound on the path that reached it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterizedValue<V> {
    value: V,
    parameters: BTreeMap<String, String>,
}

impl<V> ParameterizedValue<V> {
    pub(crate) fn new(value: V, parameters: BTreeMap<String, String>) -> Self {
        Self { value, parameters }
    }

    /// A value reached through a literal key, with nothing bound.
    pub fn unbound(value: V) -> Self {
        Self::new(value, BTreeMap::new())
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn into_value(self) -> V {
        self.value
    }

    /// The substring captured for `name`, if the pattern declares it.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    pub fn parameter_names(&self) -> BTreeSet<&str> {
        self.parameters.keys().map(String::as_str).collect()
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }
}
