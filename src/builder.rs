//! Fluent registration of parameterized patterns.

use crate::error::RegistrationError;
use crate::regexp::{parse_regex, Node};
use crate::template::Template;
use crate::trie::{lower, lower_negated, Op};
use crate::value::PatternId;
use crate::ParameterizedTrie;

/// A regex constraint, plain or negated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtendedPattern {
    regex: String,
    negated: bool,
}

impl ExtendedPattern {
    /// Values matching `regex`.
    pub fn matching(regex: impl Into<String>) -> Self {
        ExtendedPattern {
            regex: regex.into(),
            negated: false,
        }
    }

    /// Non-empty values not matching `regex`.
    pub fn not_matching(regex: impl Into<String>) -> Self {
        ExtendedPattern {
            regex: regex.into(),
            negated: true,
        }
    }

    pub fn regex(&self) -> &str {
        &self.regex
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }
}

/// Collects one constraint per placeholder, then commits the pattern.
///
/// Every constraint is parsed and validated when it is attached, so by the
/// time [`add`](Self::add) runs only a missing constraint or the node limit
/// can still reject the pattern. Dropping the builder leaves the trie
/// untouched.
///
/// ```
/// # use paramtrie::{ParameterizedTrie, RegistrationError};
/// let mut trie = ParameterizedTrie::new();
/// let err = trie
///     .parameterized("/{a}/{b}", ())?
///     .matching("a", "[a-z]+")?
///     .add()
///     .unwrap_err();
/// assert_eq!(err, RegistrationError::MissingConstraint("b".into()));
/// assert!(trie.is_empty());
/// # Ok::<(), RegistrationError>(())
/// ```
#[must_use = "a pattern is only registered once `add` is called"]
pub struct ParameterizedBuilder<'t, V> {
    trie: &'t mut ParameterizedTrie<V>,
    pattern: PatternId,
    template: Template,
    value: V,
    /// Lowered constraints by parameter index.
    constraints: Vec<Option<Op>>,
}

impl<'t, V> ParameterizedBuilder<'t, V> {
    pub(crate) fn new(
        trie: &'t mut ParameterizedTrie<V>,
        pattern: PatternId,
        template: Template,
        value: V,
    ) -> Self {
        let constraints = vec![None; template.parameters.len()];
        ParameterizedBuilder {
            trie,
            pattern,
            template,
            value,
            constraints,
        }
    }

    /// The id this pattern will be registered under.
    pub fn pattern_id(&self) -> PatternId {
        self.pattern
    }

    /// Constrain `name` to values matching `regex`.
    pub fn matching(self, name: &str, regex: &str) -> Result<Self, RegistrationError> {
        self.constraint(name, &ExtendedPattern::matching(regex))
    }

    /// Constrain `name` to non-empty values not matching `regex`.
    pub fn matching_not(self, name: &str, regex: &str) -> Result<Self, RegistrationError> {
        self.constraint(name, &ExtendedPattern::not_matching(regex))
    }

    pub fn constraint(
        self,
        name: &str,
        pattern: &ExtendedPattern,
    ) -> Result<Self, RegistrationError> {
        let index = self.vacant_slot(name)?;
        let node = parse_regex(&pattern.regex).map_err(|source| RegistrationError::InvalidRegex {
            name: name.to_string(),
            source,
        })?;
        self.attach(index, &node, pattern.negated)
    }

    /// Constrain `name` with a tree from another regex provider.
    pub fn matching_node(self, name: &str, node: &Node) -> Result<Self, RegistrationError> {
        let index = self.vacant_slot(name)?;
        self.attach(index, node, false)
    }

    pub fn matching_not_node(self, name: &str, node: &Node) -> Result<Self, RegistrationError> {
        let index = self.vacant_slot(name)?;
        self.attach(index, node, true)
    }

    /// Commit the pattern. Fails if a placeholder has no constraint or the
    /// pattern could grow the trie past [`Limits::max_nodes`](crate::Limits::max_nodes).
    pub fn add(self) -> Result<PatternId, RegistrationError> {
        let ParameterizedBuilder {
            trie,
            pattern,
            template,
            value,
            constraints,
        } = self;
        let ops = constraints
            .into_iter()
            .zip(&template.parameters)
            .map(|(op, param)| {
                op.ok_or_else(|| RegistrationError::MissingConstraint(param.name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        trie.commit(pattern, template, ops, value)?;
        Ok(pattern)
    }

    fn vacant_slot(&self, name: &str) -> Result<usize, RegistrationError> {
        let index = self
            .template
            .position(name)
            .ok_or_else(|| RegistrationError::UnknownParameter(name.to_string()))?;
        if self.constraints[index].is_some() {
            return Err(RegistrationError::DuplicateConstraint(name.to_string()));
        }
        Ok(index)
    }

    fn attach(mut self, index: usize, node: &Node, negated: bool) -> Result<Self, RegistrationError> {
        let limits = self.trie.limits();
        let op = if negated {
            lower_negated(node, &limits)?
        } else {
            lower(node, &limits)?
        };
        self.constraints[index] = Some(op);
        Ok(self)
    }
}
