//! Validation and lowering of regex nodes into trie programs.
//!
//! Every failure a constraint can produce is raised here, so threading the
//! resulting [`Op`] into the trie never fails and never leaves a half-added
//! pattern behind.

use super::charset::CharSet;
use crate::config::Limits;
use crate::error::RegistrationError;
use crate::regexp::Node;

/// A validated constraint, ready to thread into the trie.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Op {
    /// Consume one character from the set.
    Step(CharSet),
    Concat(Vec<Op>),
    Or(Vec<Op>),
    Optional(Box<Op>),
    Repeat {
        op: Box<Op>,
        min: u32,
        max: Option<u32>,
    },
    /// Any non-empty string the sequence of steps does not match.
    Except(Vec<CharSet>),
}

impl Op {
    /// Most nodes threading this op can allocate, from any frontier.
    pub fn node_bound(&self) -> usize {
        match self {
            Op::Step(_) => 1,
            Op::Concat(ops) | Op::Or(ops) => ops
                .iter()
                .fold(0, |total, op| total.saturating_add(op.node_bound())),
            Op::Optional(op) => op.node_bound(),
            Op::Repeat { op, min, max } => {
                let body = op.node_bound();
                match max {
                    Some(max) => body.saturating_mul(*max as usize),
                    // unrolled prefix, loop head, entry and return iterations
                    None => body
                        .saturating_mul(min.saturating_sub(1) as usize)
                        .saturating_add(body.saturating_mul(2))
                        .saturating_add(1),
                }
            }
            // one node per position plus the escape node
            Op::Except(sets) => sets.len().saturating_add(1),
        }
    }
}

pub(crate) fn lower(node: &Node, limits: &Limits) -> Result<Op, RegistrationError> {
    if let Some(set) = position_set(node, limits)? {
        return Ok(Op::Step(set));
    }
    match node {
        Node::Empty => Err(RegistrationError::EmptyRegex),
        Node::Concat(items) => {
            let mut ops = items
                .iter()
                .map(|item| lower(item, limits))
                .collect::<Result<Vec<_>, _>>()?;
            match ops.len() {
                0 => Err(RegistrationError::EmptyRegex),
                1 => Ok(ops.swap_remove(0)),
                _ => Ok(Op::Concat(ops)),
            }
        }
        Node::Or(alternatives) => {
            if alternatives.is_empty() {
                return Err(RegistrationError::EmptyRegex);
            }
            let ops = alternatives
                .iter()
                .map(|alt| lower(alt, limits))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Op::Or(ops))
        }
        Node::Optional(inner) => Ok(Op::Optional(Box::new(lower(inner, limits)?))),
        Node::Repeat { node, min, max } => lower_repeat(node, *min, *max, limits),
        Node::Complement(inner) => Ok(Op::Except(sequence(inner, limits)?)),
        _ => Err(RegistrationError::Unsupported(node.kind().to_string())),
    }
}

/// Lower a `matching_not` constraint: any non-empty string `node` does not match.
pub(crate) fn lower_negated(node: &Node, limits: &Limits) -> Result<Op, RegistrationError> {
    Ok(Op::Except(sequence(node, limits)?))
}

fn lower_repeat(
    node: &Node,
    min: u32,
    max: Option<u32>,
    limits: &Limits,
) -> Result<Op, RegistrationError> {
    let bound = max.unwrap_or(min);
    if bound > limits.max_repeat {
        return Err(RegistrationError::Unsupported(format!(
            "repeat bound {} exceeds the limit of {}",
            bound, limits.max_repeat
        )));
    }
    if let Some(max) = max {
        if max < min {
            return Err(RegistrationError::Unsupported(format!(
                "repeat bounds {{{},{}}} are reversed",
                min, max
            )));
        }
    }
    let op = lower(node, limits)?;
    match (min, max) {
        (0, Some(0)) => Err(RegistrationError::EmptyRegex),
        (1, Some(1)) => Ok(op),
        (0, Some(1)) => Ok(Op::Optional(Box::new(op))),
        _ => Ok(Op::Repeat {
            op: Box::new(op),
            min,
            max,
        }),
    }
}

/// The steps of a sequence that is being negated.
fn sequence(node: &Node, limits: &Limits) -> Result<Vec<CharSet>, RegistrationError> {
    if let Some(set) = position_set(node, limits)? {
        return Ok(vec![set]);
    }
    match node {
        Node::Empty => Err(RegistrationError::EmptyRegex),
        Node::Concat(items) if !items.is_empty() => items
            .iter()
            .map(|item| {
                position_set(item, limits)?.ok_or_else(|| {
                    RegistrationError::Unsupported(format!(
                        "{} inside a negated sequence",
                        item.kind()
                    ))
                })
            })
            .collect(),
        _ => Err(RegistrationError::Unsupported(format!(
            "negation of {}",
            node.kind()
        ))),
    }
}

/// The set of characters `node` consumes if it consumes exactly one.
fn position_set(node: &Node, limits: &Limits) -> Result<Option<CharSet>, RegistrationError> {
    let set = match node {
        Node::Char(c) => CharSet::only([*c]),
        Node::CharRange(lo, hi) => {
            if lo > hi {
                return Err(RegistrationError::Unsupported(format!(
                    "reversed range {}-{}",
                    lo, hi
                )));
            }
            let size = *hi as usize - *lo as usize + 1;
            if size > limits.max_class_size {
                return Err(class_too_large(size, limits));
            }
            CharSet::only(*lo..=*hi)
        }
        Node::Dot => CharSet::Any,
        Node::Complement(inner) => match position_set(inner, limits)? {
            Some(set) => set.complement().ok_or_else(|| {
                RegistrationError::Unsupported("class matches no character".into())
            })?,
            None => return Ok(None),
        },
        Node::Or(alternatives) if !alternatives.is_empty() => {
            let mut union = CharSet::only([]);
            for alt in alternatives {
                match position_set(alt, limits)? {
                    Some(set) => union = union.union(set),
                    None => return Ok(None),
                }
            }
            union
        }
        _ => return Ok(None),
    };
    if set.is_empty() {
        return Err(RegistrationError::Unsupported(
            "class matches no character".into(),
        ));
    }
    if set.stored_len() > limits.max_class_size {
        return Err(class_too_large(set.stored_len(), limits));
    }
    Ok(Some(set))
}

fn class_too_large(size: usize, limits: &Limits) -> RegistrationError {
    RegistrationError::Unsupported(format!(
        "class of {} characters exceeds the limit of {}",
        size, limits.max_class_size
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regexp::parse_regex;

    fn lowered(re: &str) -> Result<Op, RegistrationError> {
        lower(&parse_regex(re).unwrap(), &Limits::default())
    }

    fn negated(re: &str) -> Result<Op, RegistrationError> {
        lower_negated(&parse_regex(re).unwrap(), &Limits::default())
    }

    #[test]
    fn test_class_becomes_one_step() {
        assert_eq!(
            lowered("[a-c_]").unwrap(),
            Op::Step(CharSet::only(['a', 'b', 'c', '_']))
        );
        assert_eq!(lowered("a|b").unwrap(), Op::Step(CharSet::only(['a', 'b'])));
        assert_eq!(lowered(".|a").unwrap(), Op::Step(CharSet::Any));
    }

    #[test]
    fn test_negated_class_is_except_step() {
        assert_eq!(lowered("[^/]").unwrap(), Op::Step(CharSet::except(['/'])));
        assert_eq!(
            lowered(r"\D").unwrap(),
            Op::Step(CharSet::except('0'..='9'))
        );
    }

    #[test]
    fn test_sequence_and_alternation() {
        assert_eq!(
            lowered("ab|c.").unwrap(),
            Op::Or(vec![
                Op::Concat(vec![
                    Op::Step(CharSet::only(['a'])),
                    Op::Step(CharSet::only(['b']))
                ]),
                Op::Concat(vec![Op::Step(CharSet::only(['c'])), Op::Step(CharSet::Any)]),
            ])
        );
    }

    #[test]
    fn test_repeat_normalization() {
        let a = || Box::new(Op::Step(CharSet::only(['a'])));
        assert_eq!(lowered("a{1}").unwrap(), *a());
        assert_eq!(lowered("a{0,1}").unwrap(), Op::Optional(a()));
        assert_eq!(
            lowered("a+").unwrap(),
            Op::Repeat {
                op: a(),
                min: 1,
                max: None
            }
        );
    }

    #[test]
    fn test_empty_constructs_rejected() {
        for re in ["", "()", "a|", "(|a)b", "a{0}"] {
            assert_eq!(
                lowered(re),
                Err(RegistrationError::EmptyRegex),
                "{} should be rejected as empty",
                re
            );
        }
    }

    #[test]
    fn test_limits() {
        let limits = Limits {
            max_repeat: 5,
            max_class_size: 10,
            ..Limits::default()
        };
        let lower_with = |re: &str| lower(&parse_regex(re).unwrap(), &limits);
        assert!(lower_with("a{5}").is_ok());
        assert!(matches!(lower_with("a{6}"), Err(RegistrationError::Unsupported(_))));
        assert!(matches!(lower_with("a{2,9}"), Err(RegistrationError::Unsupported(_))));
        assert!(lower_with("[0-9]").is_ok());
        assert!(matches!(lower_with("[a-z]"), Err(RegistrationError::Unsupported(_))));
    }

    #[test]
    fn test_node_bound() {
        assert_eq!(lowered("[a-z]").unwrap().node_bound(), 1);
        assert_eq!(lowered("a?b?c?").unwrap().node_bound(), 3);
        assert_eq!(lowered("(ab){2,4}").unwrap().node_bound(), 8);
        assert_eq!(lowered("x+").unwrap().node_bound(), 3);
        assert_eq!(lowered("x{3,}").unwrap().node_bound(), 5);
        assert_eq!(negated("abc").unwrap().node_bound(), 4);
    }

    #[test]
    fn test_ast_from_other_providers_is_validated() {
        let reversed = Node::CharRange('z', 'a');
        assert!(lower(&reversed, &Limits::default()).is_err());

        let bad_repeat = Node::Repeat {
            node: Box::new(Node::Char('a')),
            min: 3,
            max: Some(1),
        };
        assert!(lower(&bad_repeat, &Limits::default()).is_err());

        assert_eq!(
            lower(&Node::Concat(vec![]), &Limits::default()),
            Err(RegistrationError::EmptyRegex)
        );
        assert_eq!(
            lower(&Node::Complement(Box::new(Node::Dot)), &Limits::default()),
            Err(RegistrationError::Unsupported("class matches no character".into()))
        );
    }

    #[test]
    fn test_negated_sequence() {
        assert_eq!(
            negated("admin").unwrap(),
            Op::Except("admin".chars().map(|c| CharSet::only([c])).collect())
        );
        // a single position is still a sequence of length one
        assert_eq!(negated("a").unwrap(), Op::Except(vec![CharSet::only(['a'])]));
        assert_eq!(
            negated("[^0-9]x").unwrap(),
            Op::Except(vec![CharSet::except('0'..='9'), CharSet::only(['x'])])
        );
    }

    #[test]
    fn test_complement_of_sequence_in_ast() {
        let node = Node::Concat(vec![
            Node::Char('/'),
            Node::Complement(Box::new(Node::Concat(vec![Node::Char('a'), Node::Char('b')]))),
        ]);
        assert_eq!(
            lower(&node, &Limits::default()).unwrap(),
            Op::Concat(vec![
                Op::Step(CharSet::only(['/'])),
                Op::Except(vec![CharSet::only(['a']), CharSet::only(['b'])]),
            ])
        );
    }

    #[test]
    fn test_unsupported_negations() {
        for re in ["a|bc", "a+", "ab?", "(ab)c*"] {
            assert!(
                matches!(negated(re), Err(RegistrationError::Unsupported(_))),
                "negating {} should be unsupported",
                re
            );
        }
        assert_eq!(negated(""), Err(RegistrationError::EmptyRegex));
    }
}
