//! Threading of lowered patterns into the trie.
//!
//! A pattern is threaded from a frontier of nodes: every step either reuses a
//! child created earlier by the same step or allocates a new one. Reuse is
//! limited to children of shareable nodes that the registering pattern has
//! either never visited or visited with the tags the step would give them.
//! Every registration that reaches a shareable node accepts the same set of
//! strings up to it, so merged patterns never match each other's inputs.
//!
//! A step from several nodes at once leads into a single private join node,
//! which keeps the node count linear in the size of the lowered pattern.
//!
//! Unbounded repeats are the one place cycles appear:
//!
//! ```text
//! [a-z]+ from F:
//!
//!   F --[a-z]--> head --[a-z]--> head
//! ```
//!
//! Loops and complements threaded from a single shareable node are recorded
//! in the arena, and later registrations threading the same op from the same
//! node reuse them and add their own tags.

use std::ops::Deref;

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use super::arena::{Construct, ConstructKey, NodeArena, NodeId, StoredValue};
use super::charset::CharSet;
use super::lower::Op;
use crate::value::{PatternId, PatternParameter};

/// Nodes reached so far, in insertion order and without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Frontier {
    nodes: SmallVec<[NodeId; 4]>,
    seen: FxHashSet<NodeId>,
}

impl Frontier {
    pub fn single(id: NodeId) -> Self {
        let mut frontier = Self::default();
        frontier.push(id);
        frontier
    }

    pub fn from_slice(ids: &[NodeId]) -> Self {
        let mut frontier = Self::default();
        frontier.extend(ids);
        frontier
    }

    pub fn push(&mut self, id: NodeId) {
        if self.seen.insert(id) {
            self.nodes.push(id);
        }
    }

    pub fn extend(&mut self, ids: &[NodeId]) {
        for &id in ids {
            self.push(id);
        }
    }
}

impl Deref for Frontier {
    type Target = [NodeId];

    fn deref(&self) -> &[NodeId] {
        &self.nodes
    }
}

impl<'a> IntoIterator for &'a Frontier {
    type Item = &'a NodeId;
    type IntoIter = std::slice::Iter<'a, NodeId>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

pub(crate) struct Compiler<'a> {
    arena: &'a mut NodeArena,
    pattern: Option<PatternId>,
    /// Parameter currently being threaded, `None` inside literal runs.
    scope: Option<PatternParameter>,
    /// Nodes this registration has stepped into.
    visited: FxHashSet<NodeId>,
    /// Step targets in order, so a construct can list the nodes it covers.
    trail: Vec<NodeId>,
}

impl<'a> Compiler<'a> {
    pub fn new(arena: &'a mut NodeArena, pattern: Option<PatternId>) -> Self {
        Self {
            arena,
            pattern,
            scope: None,
            visited: FxHashSet::default(),
            trail: Vec::new(),
        }
    }

    /// Thread a literal run, one edge per character.
    pub fn literal(&mut self, from: &[NodeId], text: &str) -> Frontier {
        self.scope = None;
        let mut cur = Frontier::from_slice(from);
        for c in text.chars() {
            cur = self.step(&CharSet::only([c]), &cur, None);
        }
        cur
    }

    /// Thread one parameter's constraint and tag its legal exits.
    pub fn parameter(&mut self, from: &[NodeId], param: PatternParameter, op: &Op) -> Frontier {
        self.scope = Some(param);
        let ends = self.thread(op, from, None);
        for &end in &ends {
            self.arena.add_end(end, param);
        }
        self.scope = None;
        ends
    }

    /// Mark the frontier terminal for `value`.
    pub fn store(&mut self, at: &[NodeId], value: StoredValue) {
        for &id in at {
            let node = self.arena.get_mut(id);
            node.terminal = true;
            node.values.push(value);
        }
    }

    /// Thread `op` from `from`. With `into` set, the final steps link to that
    /// node instead of allocating; callers must cope with exits other than it.
    fn thread(&mut self, op: &Op, from: &[NodeId], into: Option<NodeId>) -> Frontier {
        match op {
            Op::Step(set) => self.step(set, from, into),
            Op::Concat(ops) => {
                let last = ops.len().saturating_sub(1);
                let mut cur = Frontier::from_slice(from);
                for (i, op) in ops.iter().enumerate() {
                    cur = self.thread(op, &cur, if i == last { into } else { None });
                }
                cur
            }
            Op::Or(alternatives) => {
                let mut out = Frontier::default();
                for alt in alternatives {
                    let ends = self.thread(alt, from, into);
                    out.extend(&ends);
                }
                out
            }
            Op::Optional(inner) => {
                let mut out = Frontier::from_slice(from);
                let ends = self.thread(inner, from, into);
                out.extend(&ends);
                out
            }
            Op::Repeat {
                op,
                min,
                max: Some(max),
            } => self.repeat_bounded(op, *min, *max, from),
            Op::Repeat { op, min, max: None } => self.repeat_unbounded(op, *min, from),
            Op::Except(sets) => self.shared(op, from, |this, from| this.except(sets, from)),
        }
    }

    fn step(&mut self, set: &CharSet, from: &[NodeId], into: Option<NodeId>) -> Frontier {
        let dest = match (into, from) {
            (_, []) => return Frontier::default(),
            (Some(target), _) => {
                for &parent in from {
                    self.arena.link(parent, set, target);
                }
                target
            }
            (None, &[parent]) => self.child(parent, set),
            (None, _) => {
                let join = self.arena.alloc(None);
                for &parent in from {
                    self.arena.link(parent, set, join);
                }
                join
            }
        };
        if let Some(param) = self.scope {
            self.arena.add_span(dest, param);
        }
        self.visited.insert(dest);
        self.trail.push(dest);
        Frontier::single(dest)
    }

    /// Find or create the child of `parent` for `set`.
    fn child(&mut self, parent: NodeId, set: &CharSet) -> NodeId {
        if !self.arena.is_shareable(parent) {
            let child = self.arena.alloc(None);
            self.arena.link(parent, set, child);
            return child;
        }
        let reusable = self
            .arena
            .labelled_children(parent, set)
            .find(|&child| self.reusable(child));
        if let Some(child) = reusable {
            return child;
        }
        let child = self.arena.alloc(Some(set.clone()));
        self.arena.link(parent, set, child);
        child
    }

    /// A node this registration already passed through is only reused when it
    /// carries exactly the current scope among this pattern's parameters.
    fn reusable(&self, node: NodeId) -> bool {
        if !self.visited.contains(&node) {
            return true;
        }
        let mut own = self
            .arena
            .get(node)
            .spans
            .iter()
            .filter(|param| Some(param.pattern) == self.pattern);
        match self.scope {
            Some(scope) => own.next() == Some(&scope) && own.next().is_none(),
            None => own.next().is_none(),
        }
    }

    /// Thread a loop or complement through `build`, or reuse the one an
    /// earlier registration built for `op` off the same shareable node.
    ///
    /// `build` returns the exits and the construct's anchor node. Reuse is
    /// skipped when this registration already passed through the construct.
    fn shared(
        &mut self,
        op: &Op,
        from: &[NodeId],
        build: impl FnOnce(&mut Self, &[NodeId]) -> (Frontier, NodeId),
    ) -> Frontier {
        let at = match *from {
            [at] if self.arena.is_shareable(at) => at,
            _ => return build(self, from).0,
        };
        let key = ConstructKey { at, op: op.clone() };
        if let Some(construct) = self.arena.construct(&key).cloned() {
            if construct.members.iter().any(|m| self.visited.contains(m)) {
                return build(self, from).0;
            }
            for &member in &construct.members {
                if let Some(param) = self.scope {
                    self.arena.add_span(member, param);
                }
                self.visited.insert(member);
                self.trail.push(member);
            }
            return Frontier::from_slice(&construct.exits);
        }

        let mark = self.trail.len();
        let (exits, anchor) = build(self, from);
        let members = Frontier::from_slice(&self.trail[mark..]).to_vec();
        self.arena.insert_construct(key, anchor, Construct {
            exits: exits.to_vec(),
            members,
        });
        exits
    }

    fn repeat_bounded(&mut self, op: &Op, min: u32, max: u32, from: &[NodeId]) -> Frontier {
        let mut cur = Frontier::from_slice(from);
        for _ in 0..min {
            cur = self.thread(op, &cur, None);
        }
        let mut out = cur.clone();
        for _ in min..max {
            cur = self.thread(op, &cur, None);
            out.extend(&cur);
        }
        out
    }

    /// Unroll `min - 1` iterations, then loop through a head node.
    fn repeat_unbounded(&mut self, op: &Op, min: u32, from: &[NodeId]) -> Frontier {
        let mut cur = Frontier::from_slice(from);
        for _ in 1..min {
            cur = self.thread(op, &cur, None);
        }

        let body = Op::Repeat {
            op: Box::new(op.clone()),
            min: 1,
            max: None,
        };
        let mut exits = self.shared(&body, &cur, |this, cur| this.plus_loop(op, cur));
        if min == 0 {
            exits.extend(from);
        }
        exits
    }

    /// One or more iterations of `op`: the first is threaded into the head,
    /// one more from the head back into itself, and the head's iteration
    /// edges are spliced into every other node where an iteration can finish.
    fn plus_loop(&mut self, op: &Op, from: &[NodeId]) -> (Frontier, NodeId) {
        let head = self.arena.alloc(None);
        let mut exits = self.thread(op, from, Some(head));
        let again = self.thread(op, &[head], Some(head));
        exits.extend(&again);

        let iteration = self.arena.edges(head);
        for &exit in &exits {
            if exit != head {
                self.arena.splice(&iteration, exit);
            }
        }
        (exits, head)
    }

    /// Thread "any non-empty string other than `sets`".
    ///
    /// Characters the current position rejects jump to an escape node that
    /// swallows the rest of the input; characters it accepts continue along
    /// the sequence. Every continuation short of the full sequence is a legal
    /// exit, the full sequence only continues into the escape node.
    fn except(&mut self, sets: &[CharSet], from: &[NodeId]) -> (Frontier, NodeId) {
        let escape = self.arena.alloc(None);
        self.arena.link(escape, &CharSet::Any, escape);
        if let Some(param) = self.scope {
            self.arena.add_span(escape, param);
        }
        self.visited.insert(escape);
        self.trail.push(escape);

        let mut exits = Frontier::default();
        let mut cur = Frontier::from_slice(from);
        for (i, set) in sets.iter().enumerate() {
            if let Some(rejected) = set.complement() {
                for &node in &cur {
                    self.arena.link(node, &rejected, escape);
                }
            }
            cur = self.step(set, &cur, None);
            if i + 1 < sets.len() {
                exits.extend(&cur);
            }
        }
        for &node in &cur {
            self.arena.link(node, &CharSet::Any, escape);
        }
        exits.push(escape);
        (exits, escape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;
    use crate::regexp::parse_regex;
    use crate::trie::lower::lower;

    fn op(re: &str) -> Op {
        lower(&parse_regex(re).unwrap(), &Limits::default()).unwrap()
    }

    fn param(pattern: u32, index: usize) -> PatternParameter {
        PatternParameter {
            pattern: PatternId(pattern),
            index,
        }
    }

    #[test]
    fn test_literal_reuses_prefix() {
        let mut arena = NodeArena::new();
        let mut compiler = Compiler::new(&mut arena, None);
        let a = compiler.literal(&[NodeId::ROOT], "/ab");
        let b = compiler.literal(&[NodeId::ROOT], "/ac");
        assert_ne!(a, b);
        assert_eq!(arena.len(), 5, "root, '/', 'a', 'b', 'c'");
    }

    #[test]
    fn test_class_is_one_node() {
        let mut arena = NodeArena::new();
        let mut compiler = Compiler::new(&mut arena, Some(PatternId(0)));
        let ends = compiler.parameter(&[NodeId::ROOT], param(0, 0), &op("[a-z]"));
        assert_eq!(ends.len(), 1);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.transitions(NodeId::ROOT, 'q').collect::<Vec<_>>(), ends.to_vec());
    }

    #[test]
    fn test_plus_loops_on_head() {
        let mut arena = NodeArena::new();
        let mut compiler = Compiler::new(&mut arena, Some(PatternId(0)));
        let ends = compiler.parameter(&[NodeId::ROOT], param(0, 0), &op(".+"));
        assert_eq!(ends.len(), 1);
        let head = ends[0];
        assert!(arena.is_shareable(head), "a loop off the root is recorded for reuse");
        assert_eq!(arena.transitions(head, 'x').collect::<Vec<_>>(), vec![head]);
        assert!(arena.get(head).spans.contains(&param(0, 0)));
        assert!(arena.get(head).ends.contains(&param(0, 0)));
    }

    #[test]
    fn test_star_includes_entry() {
        let mut arena = NodeArena::new();
        let mut compiler = Compiler::new(&mut arena, Some(PatternId(0)));
        let ends = compiler.parameter(&[NodeId::ROOT], param(0, 0), &op("a*"));
        assert!(ends.contains(&NodeId::ROOT));
        assert!(arena.get(NodeId::ROOT).ends.contains(&param(0, 0)));
        assert!(!arena.get(NodeId::ROOT).spans.contains(&param(0, 0)));
    }

    #[test]
    fn test_bounded_repeat_unrolls() {
        let mut arena = NodeArena::new();
        let mut compiler = Compiler::new(&mut arena, Some(PatternId(0)));
        let ends = compiler.parameter(&[NodeId::ROOT], param(0, 0), &op("[0-9]{2,4}"));
        assert_eq!(ends.len(), 3);
        assert_eq!(arena.len(), 5, "root plus one node per iteration");
    }

    #[test]
    fn test_loop_heads_are_not_reused_by_single_steps() {
        let mut arena = NodeArena::new();
        let mut compiler = Compiler::new(&mut arena, Some(PatternId(0)));
        compiler.parameter(&[NodeId::ROOT], param(0, 0), &op("a+"));
        let before = arena.len();

        let mut compiler = Compiler::new(&mut arena, None);
        let ends = compiler.literal(&[NodeId::ROOT], "aa");
        assert_eq!(arena.len(), before + 2, "literal key builds its own path");
        assert!(arena.is_shareable(ends[0]));
    }

    #[test]
    fn test_different_parameters_do_not_share_nodes() {
        // {a}{b} with a = x? and b = x: the node after "x" for `a` must not
        // double as the node after "x" for `b`
        let mut arena = NodeArena::new();
        let mut compiler = Compiler::new(&mut arena, Some(PatternId(0)));
        let after_a = compiler.parameter(&[NodeId::ROOT], param(0, 0), &op("x?"));
        let after_b = compiler.parameter(&after_a, param(0, 1), &op("x"));
        assert_eq!(after_b.len(), 1);
        assert!(!after_a.contains(&after_b[0]));
        assert!(!arena.get(after_b[0]).spans.contains(&param(0, 0)));
    }

    #[test]
    fn test_wide_frontier_steps_into_one_join() {
        let mut arena = NodeArena::new();
        let mut compiler = Compiler::new(&mut arena, Some(PatternId(0)));
        let ends = compiler.parameter(&[NodeId::ROOT], param(0, 0), &op("a?b?c"));
        assert_eq!(ends.len(), 1);
        assert_eq!(arena.len(), 4, "root, 'a', one join for 'b', one join for 'c'");

        let join = ends[0];
        assert!(!arena.is_shareable(join));
        let after_a = arena.transitions(NodeId::ROOT, 'a').next().unwrap();
        let after_b = arena.transitions(NodeId::ROOT, 'b').next().unwrap();
        for from in [NodeId::ROOT, after_a, after_b] {
            assert_eq!(arena.transitions(from, 'c').collect::<Vec<_>>(), vec![join]);
        }
    }

    #[test]
    fn test_same_loop_is_reused_across_patterns() {
        let mut arena = NodeArena::new();
        let mut compiler = Compiler::new(&mut arena, Some(PatternId(0)));
        let first = compiler.parameter(&[NodeId::ROOT], param(0, 0), &op("[0-9]+"));
        let before = arena.len();

        let mut compiler = Compiler::new(&mut arena, Some(PatternId(1)));
        let second = compiler.parameter(&[NodeId::ROOT], param(1, 0), &op("[0-9]+"));
        assert_eq!(first, second);
        assert_eq!(arena.len(), before);
        let head = arena.get(first[0]);
        assert!(head.spans.contains(&param(0, 0)) && head.spans.contains(&param(1, 0)));
        assert!(head.ends.contains(&param(0, 0)) && head.ends.contains(&param(1, 0)));
    }

    #[test]
    fn test_loop_is_not_reused_within_its_own_pattern() {
        // two parameters of one pattern threading the same loop off the
        // same node must keep their captures apart
        let mut arena = NodeArena::new();
        let mut compiler = Compiler::new(&mut arena, Some(PatternId(0)));
        let after_a = compiler.parameter(&[NodeId::ROOT], param(0, 0), &op("[0-9]+"));
        let after_b = compiler.parameter(&[NodeId::ROOT], param(0, 1), &op("[0-9]+"));
        assert_ne!(after_a, after_b);
        assert!(!arena.get(after_b[0]).spans.contains(&param(0, 0)));
        assert!(!arena.get(after_a[0]).spans.contains(&param(0, 1)));
    }

    #[test]
    fn test_same_except_is_reused_across_patterns() {
        let except = Op::Except(vec![CharSet::only(['a']), CharSet::only(['b'])]);
        let mut arena = NodeArena::new();
        let mut compiler = Compiler::new(&mut arena, Some(PatternId(0)));
        let first = compiler.parameter(&[NodeId::ROOT], param(0, 0), &except);
        let before = arena.len();

        let mut compiler = Compiler::new(&mut arena, Some(PatternId(1)));
        let second = compiler.parameter(&[NodeId::ROOT], param(1, 0), &except);
        assert_eq!(first, second);
        assert_eq!(arena.len(), before);
        for &exit in &second {
            assert!(arena.get(exit).spans.contains(&param(1, 0)));
        }
    }

    #[test]
    fn test_other_patterns_share_tagged_nodes() {
        let mut arena = NodeArena::new();
        let mut compiler = Compiler::new(&mut arena, Some(PatternId(0)));
        let first = compiler.parameter(&[NodeId::ROOT], param(0, 0), &op("ab"));
        let mut compiler = Compiler::new(&mut arena, Some(PatternId(1)));
        let second = compiler.parameter(&[NodeId::ROOT], param(1, 0), &op("ab"));
        assert_eq!(first, second);
        assert_eq!(arena.len(), 3);
        let spans = &arena.get(first[0]).spans;
        assert!(spans.contains(&param(0, 0)) && spans.contains(&param(1, 0)));
    }

    #[test]
    fn test_except_structure() {
        let mut arena = NodeArena::new();
        let mut compiler = Compiler::new(&mut arena, Some(PatternId(0)));
        let except = Op::Except(vec![CharSet::only(['a']), CharSet::only(['b'])]);
        let exits = compiler.parameter(&[NodeId::ROOT], param(0, 0), &except);

        // exits: the node after "a" and the escape node
        assert_eq!(exits.len(), 2);
        let after_a = arena.transitions(NodeId::ROOT, 'a').next().unwrap();
        assert!(exits.contains(&after_a));
        let after_ab = arena.transitions(after_a, 'b').next().unwrap();
        assert!(!exits.contains(&after_ab));
        assert!(!arena.get(after_ab).ends.contains(&param(0, 0)));
    }
}
