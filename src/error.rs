//! Registration errors.

use thiserror::Error;

use crate::regexp::RegexError;

/// Errors raised while adding keys or parameterized patterns.
///
/// All of them surface before the trie is touched, so a failed registration
/// leaves the structure exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// Placeholder syntax is broken: stray brace, unclosed placeholder,
    /// empty name or dangling escape.
    #[error("malformed pattern {pattern:?}: {message} at offset {offset}")]
    MalformedPattern {
        pattern: String,
        message: String,
        offset: usize,
    },

    /// The same placeholder name appears twice in one pattern.
    #[error("duplicate parameter {name:?} at offset {offset}")]
    DuplicateParameter { name: String, offset: usize },

    /// A constraint names a placeholder the pattern does not declare.
    #[error("unknown parameter {0:?}")]
    UnknownParameter(String),

    /// A placeholder received a second constraint.
    #[error("parameter {0:?} is already constrained")]
    DuplicateConstraint(String),

    /// A placeholder was left without a constraint at commit time.
    #[error("parameter {0:?} has no constraint")]
    MissingConstraint(String),

    /// The constraint regex does not parse.
    #[error("invalid regex for parameter {name:?}: {source}")]
    InvalidRegex {
        name: String,
        #[source]
        source: RegexError,
    },

    /// An empty regex, empty group or empty alternative.
    #[error("empty regex construct")]
    EmptyRegex,

    /// A construct the compiler cannot thread into the trie.
    #[error("unsupported regex construct: {0}")]
    Unsupported(String),

    /// The registration could grow the trie past `Limits::max_nodes` or
    /// past the node id space.
    #[error("registration needs up to {needed} nodes, over the limit of {limit}")]
    TooManyNodes { needed: usize, limit: usize },
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_display() {
        let err = RegistrationError::DuplicateParameter {
            name: "id".into(),
            offset: 9,
        };
        assert_eq!(err.to_string(), "duplicate parameter \"id\" at offset 9");
    }

    #[test]
    fn test_invalid_regex_exposes_source() {
        let err = RegistrationError::InvalidRegex {
            name: "id".into(),
            source: RegexError {
                message: "unclosed '('".into(),
                offset: 0,
            },
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("unclosed '(' at offset 0"));
    }
}
