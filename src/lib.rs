//! paramtrie: a character trie with regex-constrained placeholders
//!
//! Patterns such as `/project/{name}/edit` are compiled straight into the
//! trie: every transition a placeholder's regex can take becomes a trie edge,
//! so literal keys and parameterized patterns share prefixes and are resolved
//! together in a single pass over the input.
//!
//! ```
//! use paramtrie::ParameterizedTrie;
//!
//! let mut trie = ParameterizedTrie::new();
//! trie.add("/home", "home")?;
//! trie.parameterized("/{page}", "page")?
//!     .matching("page", ".+")?
//!     .add()?;
//!
//! let results = trie.resolve("/home");
//! assert_eq!(results.len(), 2);
//! assert!(results
//!     .iter()
//!     .any(|r| *r.value() == "page" && r.parameter("page") == Some("home")));
//! # Ok::<(), paramtrie::RegistrationError>(())
//! ```
//!
//! Registration is single-threaded. Once built, a trie is a plain immutable
//! value and may be shared across threads for concurrent `resolve` calls.

mod builder;
mod config;
mod error;
pub mod regexp;
mod template;
mod trie;
mod value;

use std::collections::HashSet;
use std::hash::Hash;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use template::{Segment, Template};
use trie::{Compiler, Frontier, NodeArena, NodeId, Op, StoredValue};

pub use builder::{ExtendedPattern, ParameterizedBuilder};
pub use config::Limits;
pub use error::RegistrationError;
pub use value::{ParameterizedValue, PatternId, PatternParameter};

/// A trie resolving strings against literal keys and parameterized patterns.
///
/// Keys may map to several values, and an input may match several patterns:
/// [`resolve`](Self::resolve) returns every match with its own bindings.
///
/// ```
/// # use paramtrie::ParameterizedTrie;
/// let mut trie = ParameterizedTrie::new();
/// trie.parameterized("/{x}", 1)?
///     .matching_not("x", "admin")?
///     .add()?;
///
/// assert!(trie.resolve("/admin").is_empty());
/// let other = trie.resolve("/other");
/// assert_eq!(other.iter().next().and_then(|r| r.parameter("x")), Some("other"));
/// # Ok::<(), paramtrie::RegistrationError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ParameterizedTrie<V> {
    arena: NodeArena,
    values: Vec<V>,
    /// Parameter names per committed pattern, by parameter index.
    parameter_names: FxHashMap<PatternId, Vec<String>>,
    next_pattern: u32,
    limits: Limits,
}

impl<V> Default for ParameterizedTrie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ParameterizedTrie<V> {
    /// Create an empty trie with default [`Limits`].
    pub fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    pub fn with_limits(limits: Limits) -> Self {
        ParameterizedTrie {
            arena: NodeArena::new(),
            values: Vec::new(),
            parameter_names: FxHashMap::default(),
            next_pattern: 0,
            limits,
        }
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Add a literal key. Adding the same key again accumulates values.
    ///
    /// Fails only when the key could grow the trie past
    /// [`Limits::max_nodes`].
    pub fn add(&mut self, key: &str, value: V) -> Result<(), RegistrationError> {
        self.arena.reserve(key.chars().count(), self.limits.max_nodes)?;
        let slot = self.push_value(value);
        let mut compiler = Compiler::new(&mut self.arena, None);
        let end = compiler.literal(&[NodeId::ROOT], key);
        compiler.store(&end, StoredValue {
            slot,
            pattern: None,
        });
        trace!(key, nodes = self.arena.len(), "added literal key");
        Ok(())
    }

    /// Start registering a pattern with `{name}` placeholders.
    ///
    /// Placeholder syntax is checked here; each placeholder then needs one
    /// constraint on the returned builder before [`add`](ParameterizedBuilder::add)
    /// commits it. Nothing reaches the trie until then.
    pub fn parameterized(
        &mut self,
        pattern: &str,
        value: V,
    ) -> Result<ParameterizedBuilder<'_, V>, RegistrationError> {
        let id = PatternId(self.next_pattern);
        self.next_pattern += 1;
        let template = Template::parse(pattern)?;
        Ok(ParameterizedBuilder::new(self, id, template, value))
    }

    /// Number of nodes in the trie, the root included.
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Number of committed parameterized patterns.
    pub fn pattern_count(&self) -> usize {
        self.parameter_names.len()
    }

    /// Whether no value has been added yet.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Thread a validated pattern into the trie. Only the node limit can
    /// reject it, and that is checked before anything is touched.
    pub(crate) fn commit(
        &mut self,
        id: PatternId,
        template: Template,
        ops: Vec<Op>,
        value: V,
    ) -> Result<(), RegistrationError> {
        let bound = template.segments.iter().fold(0usize, |total, segment| {
            let nodes = match segment {
                Segment::Literal(text) => text.chars().count(),
                Segment::Parameter(index) => ops[*index].node_bound(),
            };
            total.saturating_add(nodes)
        });
        self.arena.reserve(bound, self.limits.max_nodes)?;

        let slot = self.push_value(value);
        let mut compiler = Compiler::new(&mut self.arena, Some(id));
        let mut frontier = Frontier::single(NodeId::ROOT);
        for segment in &template.segments {
            frontier = match segment {
                Segment::Literal(text) => compiler.literal(&frontier, text),
                Segment::Parameter(index) => {
                    let param = PatternParameter {
                        pattern: id,
                        index: *index,
                    };
                    compiler.parameter(&frontier, param, &ops[*index])
                }
            };
        }
        compiler.store(&frontier, StoredValue {
            slot,
            pattern: Some(id),
        });

        let names = template.parameters.into_iter().map(|p| p.name).collect();
        self.parameter_names.insert(id, names);
        debug!(
            pattern = %id,
            parameters = ops.len(),
            nodes = self.arena.len(),
            "registered parameterized pattern"
        );
        Ok(())
    }

    /// Whether `input` resolves to at least one value.
    pub fn has_match(&self, input: &str) -> bool {
        trie::matches(&self.arena, &trie::walk(&self.arena, input))
            .next()
            .is_some()
    }

    fn push_value(&mut self, value: V) -> usize {
        self.values.push(value);
        self.values.len() - 1
    }

    fn parameter_name(&self, param: &PatternParameter) -> Option<&str> {
        self.parameter_names
            .get(&param.pattern)
            .and_then(|names| names.get(param.index))
            .map(String::as_str)
    }
}

impl<V: Clone + Eq + Hash> ParameterizedTrie<V> {
    /// Every value whose key or pattern matches the whole of `input`, each
    /// with the parameters bound along one matching path.
    pub fn resolve(&self, input: &str) -> HashSet<ParameterizedValue<V>> {
        trie::matches(&self.arena, &trie::walk(&self.arena, input))
            .map(|(stored, captures)| {
                let bindings = captures
                    .iter()
                    .filter(|(param, result)| Some(param.pattern) == stored.pattern && result.ended)
                    .filter_map(|(param, result)| {
                        self.parameter_name(param)
                            .map(|name| (name.to_string(), result.value.clone()))
                    })
                    .collect();
                ParameterizedValue::new(self.values[stored.slot].clone(), bindings)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trie_is_empty() {
        let trie: ParameterizedTrie<u32> = ParameterizedTrie::new();
        assert!(trie.is_empty());
        assert_eq!(trie.node_count(), 1);
        assert_eq!(trie.pattern_count(), 0);
        assert_eq!(trie.limits(), Limits::default());
    }

    #[test]
    fn test_add_and_resolve_literal() {
        let mut trie = ParameterizedTrie::new();
        trie.add("/home", "home").unwrap();
        assert!(!trie.is_empty());

        let results = trie.resolve("/home");
        assert_eq!(results.len(), 1);
        assert!(results.contains(&ParameterizedValue::unbound("home")));
        assert!(trie.resolve("/hom").is_empty());
        assert!(trie.resolve("/homes").is_empty());
    }

    #[test]
    fn test_has_match() {
        let mut trie = ParameterizedTrie::new();
        trie.add("/a", 1).unwrap();
        trie.parameterized("/b/{id}", 2)
            .unwrap()
            .matching("id", "[0-9]+")
            .unwrap()
            .add()
            .unwrap();

        assert!(trie.has_match("/a"));
        assert!(trie.has_match("/b/42"));
        assert!(!trie.has_match("/b/x"));
        assert!(!trie.has_match("/b/"));
    }

    #[test]
    fn test_with_limits() {
        let limits = Limits {
            max_repeat: 3,
            ..Limits::default()
        };
        let mut trie: ParameterizedTrie<u8> = ParameterizedTrie::with_limits(limits);
        let err = trie
            .parameterized("/{n}", 1)
            .unwrap()
            .matching("n", "[0-9]{4}")
            .err();
        assert!(matches!(err, Some(RegistrationError::Unsupported(_))));
        assert_eq!(trie.limits(), limits);
    }

    #[test]
    fn test_node_limit_rejects_before_mutating() {
        let limits = Limits {
            max_nodes: 6,
            ..Limits::default()
        };
        let mut trie = ParameterizedTrie::with_limits(limits);
        trie.add("/ab", 1).unwrap();
        assert_eq!(
            trie.add("/cde", 2),
            Err(RegistrationError::TooManyNodes { needed: 8, limit: 6 })
        );
        // "/{n}" with [0-9]+ may need '/' plus a loop of up to three nodes
        let err = trie
            .parameterized("/{n}", 3)
            .unwrap()
            .matching("n", "[0-9]+")
            .unwrap()
            .add();
        assert!(matches!(err, Err(RegistrationError::TooManyNodes { .. })));

        assert_eq!(trie.node_count(), 4);
        assert_eq!(trie.pattern_count(), 0);
        assert!(trie.resolve("/cde").is_empty());
        assert!(trie.resolve("/7").is_empty());
        assert_eq!(trie.resolve("/ab").len(), 1);
    }

    #[test]
    fn test_pattern_ids_are_sequential() {
        let mut trie = ParameterizedTrie::new();
        let first = trie
            .parameterized("/{a}", 1)
            .unwrap()
            .matching("a", "a")
            .unwrap()
            .add()
            .unwrap();
        // a rejected registration still consumes an id
        assert!(trie.parameterized("/{b}{b}", 2).is_err());
        let third = trie
            .parameterized("/{c}", 3)
            .unwrap()
            .matching("c", "c")
            .unwrap()
            .add()
            .unwrap();
        assert_eq!(first.get(), 0);
        assert_eq!(third.get(), 2);
        assert_eq!(trie.pattern_count(), 2);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut trie = ParameterizedTrie::new();
        trie.add("/a", 1).unwrap();
        let snapshot = trie.clone();
        trie.add("/b", 2).unwrap();
        assert!(snapshot.resolve("/b").is_empty());
        assert_eq!(trie.resolve("/b").len(), 1);
    }
}
