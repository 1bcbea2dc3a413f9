//! Regex AST provider.
//!
//! Parses the constraint attached to a placeholder into a [`Node`] tree. The
//! pattern compiler only depends on the tree, so any other provider producing
//! the same nodes can be plugged in through the builder's `*_node` methods.

mod parser;

pub use parser::{parse_regex, Node, RegexError, QUANTIFIER_CEILING};
