//! Breadth-first walk of the trie over an input string.
//!
//! The walk keeps every reachable node at once, each with the set of capture
//! states that reached it. Capture states are values: two paths that arrive
//! at the same node with the same captures collapse into one, which keeps
//! loops from multiplying work.

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};

use super::arena::{NodeArena, NodeId, StoredValue, TrieNode};
use crate::value::{ParameterResult, PatternParameter};

pub(crate) type Captures = BTreeMap<PatternParameter, ParameterResult>;

/// Reachable nodes after consuming some prefix of the input.
pub(crate) type Frontier = FxHashMap<NodeId, FxHashSet<Captures>>;

/// Walk `input` from the root, returning the nodes reached by the whole of it.
pub(crate) fn walk(arena: &NodeArena, input: &str) -> Frontier {
    let mut start = Captures::new();
    open_empty(arena.get(NodeId::ROOT), &mut start);
    let mut frontier = Frontier::default();
    frontier.entry(NodeId::ROOT).or_default().insert(start);

    for c in input.chars() {
        let mut next = Frontier::default();
        for (&node, states) in &frontier {
            for dest in arena.transitions(node, c) {
                let target = arena.get(dest);
                let bucket = next.entry(dest).or_default();
                for captures in states {
                    bucket.insert(advance(target, captures, c));
                }
            }
        }
        if next.is_empty() {
            return next;
        }
        frontier = next;
    }
    frontier
}

/// Every stored value reached by the walk, with the captures that reached it.
pub(crate) fn matches<'f>(
    arena: &'f NodeArena,
    frontier: &'f Frontier,
) -> impl Iterator<Item = (StoredValue, &'f Captures)> + 'f {
    frontier
        .iter()
        .filter(move |&(&node, _)| arena.get(node).terminal)
        .flat_map(move |(&node, states)| {
            arena
                .get(node)
                .values
                .iter()
                .flat_map(move |&stored| states.iter().map(move |captures| (stored, captures)))
        })
}

fn advance(node: &TrieNode, captures: &Captures, c: char) -> Captures {
    let mut captures = captures.clone();
    for &param in &node.spans {
        let result = captures.entry(param).or_default();
        result.value.push(c);
        result.ended = node.ends.contains(&param);
    }
    open_empty(node, &mut captures);
    captures
}

/// Bind parameters that may end at `node` without consuming anything.
fn open_empty(node: &TrieNode, captures: &mut Captures) {
    for &param in &node.ends {
        if !node.spans.contains(&param) {
            captures.entry(param).or_insert_with(|| ParameterResult {
                value: String::new(),
                ended: true,
            });
        }
    }
}
