//! # Persistent parse stacks
//!
//! Each parse head owns a [`ParseStack`]: a singly linked chain of
//! reference-counted entries. Forking a head clones only the top pointer,
//! so any number of heads can share a common tail; entries popped by one
//! head remain untouched for its siblings and are reclaimed when the last
//! reference drops.

use crate::language::{StateId, Symbol, START_STATE};
use crate::syntax::Subtree;
use smallvec::SmallVec;
use std::sync::Arc;

/// The node payload of one stack entry: any leading extras or error leaves
/// swept up before the shift, followed by the derivation node itself.
pub(crate) type EntryNodes = SmallVec<[Subtree; 1]>;

struct StackEntry {
    state: StateId,
    nodes: EntryNodes,
    prev: Option<Arc<StackEntry>>,
    depth: usize,
}

/// A persistent stack of (state, nodes) entries over an implicit base
/// state of [`START_STATE`].
#[derive(Clone, Default)]
pub(crate) struct ParseStack {
    top: Option<Arc<StackEntry>>,
}

impl ParseStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The state on top of the stack.
    pub(crate) fn state(&self) -> StateId {
        self.top.as_ref().map_or(START_STATE, |entry| entry.state)
    }

    /// Number of entries above the base state.
    pub(crate) fn depth(&self) -> usize {
        self.top.as_ref().map_or(0, |entry| entry.depth)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.top.is_none()
    }

    /// Symbol of the topmost derivation node, for head merging.
    pub(crate) fn top_symbol(&self) -> Option<Symbol> {
        self.top
            .as_ref()
            .and_then(|entry| entry.nodes.last())
            .map(Subtree::symbol)
    }

    pub(crate) fn push(&mut self, state: StateId, nodes: EntryNodes) {
        let depth = self.depth() + 1;
        self.top = Some(Arc::new(StackEntry {
            state,
            nodes,
            prev: self.top.take(),
            depth,
        }));
    }

    /// Pop the top entry, returning its nodes. Returns None at the base.
    pub(crate) fn pop(&mut self) -> Option<EntryNodes> {
        let entry = self.top.take()?;
        self.top = entry.prev.clone();
        Some(entry.nodes.clone())
    }

    /// Pop `count` entries, returning their node lists bottom-first (the
    /// order the corresponding text appears in the input).
    pub(crate) fn pop_entries(&mut self, count: usize) -> Vec<EntryNodes> {
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            match self.pop() {
                Some(nodes) => entries.push(nodes),
                None => break,
            }
        }
        entries.reverse();
        entries
    }

    /// Every node on the stack, bottom-first. Used to wrap an unfinished
    /// parse into an ERROR root.
    pub(crate) fn all_nodes(&self) -> Vec<Subtree> {
        let mut per_entry: Vec<&EntryNodes> = Vec::with_capacity(self.depth());
        let mut current = self.top.as_deref();
        while let Some(entry) = current {
            per_entry.push(&entry.nodes);
            current = entry.prev.as_deref();
        }
        per_entry
            .into_iter()
            .rev()
            .flat_map(|nodes| nodes.iter().cloned())
            .collect()
    }
}
