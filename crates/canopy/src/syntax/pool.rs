//! Leaf deduplication within a single parse.
//!
//! Identical tokens (same symbol, text, flags, and shift state) recur
//! constantly in real input. The pool hands back the same `Arc` for each
//! repeat so subtree sharing starts at the leaves instead of only at
//! reused spans.

use crate::language::{StateId, Symbol};
use crate::syntax::subtree::{Subtree, SubtreeFlags};
use ahash::RandomState;
use compact_str::CompactString;
use hashbrown::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LeafKey {
    symbol: Symbol,
    text: CompactString,
    /// Raw scanned width. Distinct invalid-byte runs can render to the
    /// same lossy text, so the text alone does not identify a leaf.
    byte_len: usize,
    parse_state: StateId,
    flags_bits: u8,
}

#[derive(Default)]
pub(crate) struct SubtreePool {
    leaves: HashMap<LeafKey, Subtree, RandomState>,
    hits: usize,
}

impl SubtreePool {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fetch or create the leaf for a scanned token. Error and missing
    /// leaves are never pooled; their identity matters to recovery
    /// bookkeeping and they are rare anyway.
    pub(crate) fn leaf(
        &mut self,
        symbol: Symbol,
        raw: &[u8],
        parse_state: StateId,
        flags: SubtreeFlags,
    ) -> Subtree {
        if flags.contains(SubtreeFlags::IS_ERROR) || flags.contains(SubtreeFlags::IS_MISSING) {
            return Subtree::scanned(symbol, raw, parse_state, flags);
        }
        let key = LeafKey {
            symbol,
            text: CompactString::from_utf8_lossy(raw),
            byte_len: raw.len(),
            parse_state,
            flags_bits: flags_bits(flags),
        };
        if let Some(existing) = self.leaves.get(&key) {
            self.hits += 1;
            return existing.clone();
        }
        let leaf = Subtree::scanned(symbol, raw, parse_state, flags);
        self.leaves.insert(key, leaf.clone());
        leaf
    }

    pub(crate) fn hits(&self) -> usize {
        self.hits
    }
}

fn flags_bits(flags: SubtreeFlags) -> u8 {
    let mut bits = 0;
    if flags.contains(SubtreeFlags::IS_EXTRA) {
        bits |= 1;
    }
    if flags.contains(SubtreeFlags::IS_NAMED) {
        bits |= 2;
    }
    if flags.contains(SubtreeFlags::IS_KEYWORD) {
        bits |= 4;
    }
    bits
}
