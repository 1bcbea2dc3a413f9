//! Trie engine: node storage, AST lowering, pattern threading and resolution.

mod arena;
mod charset;
mod compile;
mod lower;
mod resolve;


pub(crate) use arena::{NodeArena, NodeId, StoredValue};
pub(crate) use compile::{Compiler, Frontier};
pub(crate) use lower::{lower, lower_negated, Op};
pub(crate) use resolve::{matches, walk};
