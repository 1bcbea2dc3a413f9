//! Arena-based node storage for the trie.
//!
//! `NodeId` is an index, so a loop head can point at itself and several
//! parents can hold edges into the same node without shared ownership.
//! Nodes are never removed; the arena only grows.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::charset::CharSet;
use super::lower::Op;
use crate::error::RegistrationError;
use crate::value::{PatternId, PatternParameter};

/// A node identifier - an index into the arena.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub(crate) struct NodeId(u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

pub(crate) type Children = SmallVec<[NodeId; 1]>;

/// A group of negated-character edges sharing one child: the child is
/// reachable on any character not listed in `keys`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NegatedEdge {
    pub keys: Vec<char>,
    pub child: NodeId,
}

/// A value stored at a terminal node, with the registration it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StoredValue {
    /// Index into the trie's value list.
    pub slot: usize,
    /// `None` for literal keys.
    pub pattern: Option<PatternId>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct TrieNode {
    pub literal: FxHashMap<char, Children>,
    pub negated: SmallVec<[NegatedEdge; 1]>,
    pub wildcard: Children,
    pub values: SmallVec<[StoredValue; 1]>,
    pub terminal: bool,
    /// Parameters whose capture includes the character that led here.
    pub spans: SmallVec<[PatternParameter; 2]>,
    /// Parameters that may legally end here.
    pub ends: SmallVec<[PatternParameter; 2]>,
    /// The step that created this node out of a shareable parent.
    /// `None` for the root and for nodes owned by a single pattern.
    pub label: Option<CharSet>,
    /// Anchor of a shared construct. It is reached by the same strings
    /// whichever pattern threads through it, so its children may be shared.
    pub canonical: bool,
}

/// A loop or complement construct, identified by the shareable node it
/// hangs off and the op threaded from there.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ConstructKey {
    pub at: NodeId,
    pub op: Op,
}

/// A construct built by one registration and reused by later ones.
#[derive(Debug, Clone)]
pub(crate) struct Construct {
    pub exits: Vec<NodeId>,
    /// Every node the construct steps into. A reuse tags all of them.
    pub members: Vec<NodeId>,
}

/// Outgoing edges of one node, detached from it so they can be spliced elsewhere.
#[derive(Debug, Clone, Default)]
pub(crate) struct Edges {
    literal: Vec<(char, NodeId)>,
    negated: Vec<NegatedEdge>,
    wildcard: Vec<NodeId>,
}

/// Arena owning every node of one trie.
#[derive(Debug, Clone)]
pub(crate) struct NodeArena {
    nodes: Vec<TrieNode>,
    constructs: FxHashMap<ConstructKey, Construct>,
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeArena {
    /// Create an arena holding only the root.
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
            constructs: FxHashMap::default(),
        }
    }

    /// Check that `count` more nodes fit under `limit` and in the id space.
    ///
    /// Registrations call this with an upper bound of what they allocate
    /// before touching the arena, which keeps `alloc` infallible.
    pub fn reserve(&self, count: usize, limit: usize) -> Result<(), RegistrationError> {
        let needed = self.nodes.len().saturating_add(count);
        let last_id = u32::try_from(needed - 1);
        if needed > limit || last_id.is_err() {
            return Err(RegistrationError::TooManyNodes { needed, limit });
        }
        Ok(())
    }

    pub fn alloc(&mut self, label: Option<CharSet>) -> NodeId {
        debug_assert!(u32::try_from(self.nodes.len()).is_ok(), "node ids are reserved first");
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(TrieNode {
            label,
            ..TrieNode::default()
        });
        id
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &TrieNode {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut TrieNode {
        &mut self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether other registrations may thread through children created here.
    pub fn is_shareable(&self, id: NodeId) -> bool {
        let node = self.get(id);
        id == NodeId::ROOT || node.label.is_some() || node.canonical
    }

    pub fn construct(&self, key: &ConstructKey) -> Option<&Construct> {
        self.constructs.get(key)
    }

    /// Record a construct and mark `anchor` as canonical.
    pub fn insert_construct(&mut self, key: ConstructKey, anchor: NodeId, construct: Construct) {
        self.get_mut(anchor).canonical = true;
        self.constructs.insert(key, construct);
    }

    /// Add edges from `from` to `to` accepting every character of `set`.
    pub fn link(&mut self, from: NodeId, set: &CharSet, to: NodeId) {
        let node = self.get_mut(from);
        match set {
            CharSet::Any => push_unique(&mut node.wildcard, to),
            CharSet::Only(chars) => {
                for &c in chars {
                    push_unique(node.literal.entry(c).or_default(), to);
                }
            }
            CharSet::Except(keys) => {
                let edge = NegatedEdge {
                    keys: keys.clone(),
                    child: to,
                };
                if !node.negated.contains(&edge) {
                    node.negated.push(edge);
                }
            }
        }
    }

    /// Children of `from` created by exactly the step `set`.
    pub fn labelled_children<'a>(
        &'a self,
        from: NodeId,
        set: &'a CharSet,
    ) -> impl Iterator<Item = NodeId> + 'a {
        let node = self.get(from);
        let candidates: Children = match set {
            CharSet::Any => node.wildcard.clone(),
            CharSet::Only(chars) => chars
                .first()
                .and_then(|c| node.literal.get(c))
                .cloned()
                .unwrap_or_default(),
            CharSet::Except(keys) => node
                .negated
                .iter()
                .filter(|edge| &edge.keys == keys)
                .map(|edge| edge.child)
                .collect(),
        };
        candidates
            .into_iter()
            .filter(move |&child| self.get(child).label.as_ref() == Some(set))
    }

    /// Every node reachable from `from` by consuming `c`, literal edges first.
    pub fn transitions(&self, from: NodeId, c: char) -> impl Iterator<Item = NodeId> + '_ {
        let node = self.get(from);
        let literal = node.literal.get(&c).into_iter().flatten().copied();
        let negated = node
            .negated
            .iter()
            .filter(move |edge| edge.keys.binary_search(&c).is_err())
            .map(|edge| edge.child);
        literal.chain(negated).chain(node.wildcard.iter().copied())
    }

    pub fn edges(&self, id: NodeId) -> Edges {
        let node = self.get(id);
        Edges {
            literal: node
                .literal
                .iter()
                .flat_map(|(&c, children)| children.iter().map(move |&child| (c, child)))
                .collect(),
            negated: node.negated.to_vec(),
            wildcard: node.wildcard.to_vec(),
        }
    }

    /// Splice a detached edge set into `into`, skipping edges it already has.
    pub fn splice(&mut self, edges: &Edges, into: NodeId) {
        let node = self.get_mut(into);
        for &(c, child) in &edges.literal {
            push_unique(node.literal.entry(c).or_default(), child);
        }
        for edge in &edges.negated {
            if !node.negated.contains(edge) {
                node.negated.push(edge.clone());
            }
        }
        for &child in &edges.wildcard {
            push_unique(&mut node.wildcard, child);
        }
    }

    /// Tag `id` as part of `param`'s capture.
    pub fn add_span(&mut self, id: NodeId, param: PatternParameter) {
        let spans = &mut self.get_mut(id).spans;
        if !spans.contains(&param) {
            spans.push(param);
        }
    }

    /// Tag `id` as a legal exit of `param`.
    pub fn add_end(&mut self, id: NodeId, param: PatternParameter) {
        let ends = &mut self.get_mut(id).ends;
        if !ends.contains(&param) {
            ends.push(param);
        }
    }
}

fn push_unique(children: &mut Children, id: NodeId) {
    if !children.contains(&id) {
        children.push(id);
    }
}
