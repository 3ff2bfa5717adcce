//! # Error recovery
//!
//! When a head has no action for its lookahead, it does not fail: it forks
//! into repair candidates, each carrying a cost, and the normal GLR
//! machinery (merging keeps the cheaper interpretation, pruning drops the
//! most expensive heads) picks the repair that lets the most input parse
//! normally.
//!
//! Three repairs exist. **Missing** synthesizes a zero-width leaf for a
//! terminal the state could shift, at most once per (position, state) so
//! recovery always makes progress. **Skip** consumes the offending input as
//! error material. **Pop** discards the most recent stack entry into error
//! material, unwinding to a state that may have an action. Skipped and
//! popped material accumulates as pending items and is collapsed into a
//! single ERROR node spanning exactly the malformed region when the next
//! ordinary shift happens.

use crate::language::{Language, ParseAction, Symbol};
use crate::lexer;
use crate::parser::engine::Head;
use crate::syntax::{Subtree, SubtreeFlags, TextSize};

/// Cost of consuming one token (or one unrecognized character) as error
/// material.
pub(crate) const SKIP_TOKEN_COST: u32 = 110;
/// Cost per stack entry discarded into error material.
pub(crate) const POP_ENTRY_COST: u32 = 100;
/// Cost of synthesizing one MISSING leaf. Cheaper than discarding real
/// input, so a missing delimiter beats popping the phrase before it.
pub(crate) const MISSING_TOKEN_COST: u32 = 90;

/// A node scanned or unwound but not yet attached to a stack entry.
#[derive(Clone)]
pub(crate) enum PendingItem {
    /// An extra (whitespace, comment): attaches as an ordinary sibling.
    Extra(Subtree),
    /// Error material: collapses with its neighbors into one ERROR node.
    Error(Subtree),
}

/// Drain pending items into attachable nodes, wrapping each maximal run of
/// error material in a single ERROR node.
pub(crate) fn flush_pending(items: &mut Vec<PendingItem>) -> Vec<Subtree> {
    let mut out = Vec::with_capacity(items.len());
    let mut run: Vec<Subtree> = Vec::new();
    for item in items.drain(..) {
        match item {
            PendingItem::Extra(node) => {
                close_error_run(&mut run, &mut out);
                out.push(node);
            }
            PendingItem::Error(node) => run.push(node),
        }
    }
    close_error_run(&mut run, &mut out);
    out
}

fn close_error_run(run: &mut Vec<Subtree>, out: &mut Vec<Subtree>) {
    if run.is_empty() {
        return;
    }
    let mut nodes = std::mem::take(run);
    if nodes.len() == 1 && nodes[0].is_error() && !nodes[0].is_leaf() {
        // Already a wrapped ERROR region (a popped one); keep it flat.
        if let Some(node) = nodes.pop() {
            out.push(node);
        }
        return;
    }
    out.push(error_node(nodes));
}

/// Wrap nodes in an ERROR node.
pub(crate) fn error_node(children: Vec<Subtree>) -> Subtree {
    Subtree::interior(
        Symbol::ERROR,
        children,
        0,
        crate::syntax::NO_PRODUCTION,
        smallvec::SmallVec::new(),
        smallvec::SmallVec::new(),
        SubtreeFlags::IS_ERROR.union(SubtreeFlags::IS_NAMED),
    )
}

/// Build the repair candidates for a head with no valid action. `rest` is
/// the unconsumed input at the head's position; `at_end` marks true end of
/// input. Candidates come back in deterministic order (missing, skip, pop)
/// with their costs already applied; the caller assigns sequence numbers
/// and merges them into the head set.
pub(crate) fn candidates(language: &Language, head: &Head, rest: &[u8]) -> Vec<Head> {
    let mut out = Vec::with_capacity(3);
    let state = head.stack.state();

    // Missing: the lowest-id valid terminal with a shift action, unless a
    // missing leaf was already inserted at this (position, state).
    if !head.missing_tried(state) {
        let valid = language.table().valid_terminals(state);
        let shiftable = valid.iter().find_map(|terminal| {
            language
                .table()
                .actions(state, terminal)
                .iter()
                .find_map(|action| match action {
                    ParseAction::Shift { state: next } => Some((terminal, *next)),
                    _ => None,
                })
        });
        if let Some((terminal, next)) = shiftable {
            let mut candidate = head.clone();
            candidate.log_missing(state);
            let leaf = Subtree::missing(terminal, language.is_named(terminal), state);
            let mut nodes = flush_pending(&mut candidate.pending);
            nodes.push(leaf);
            candidate.stack.push(next, nodes.into());
            candidate.cost += MISSING_TOKEN_COST;
            candidate.reductions = 0;
            out.push(candidate);
        }
    }

    // Skip: consume the next token (scanned with every terminal allowed),
    // or one character when nothing scans, as error material.
    if !rest.is_empty() {
        let mut candidate = head.clone();
        let relaxed = language.all_terminals();
        let skip_len = match lexer::scan(
            language,
            rest,
            TextSize::from(u32::try_from(candidate.byte).unwrap_or(u32::MAX)),
            candidate.point,
            &relaxed,
        ) {
            Some(token) => token.byte_len,
            None => utf8_len(rest[0]).min(rest.len()),
        };
        let raw = &rest[..skip_len];
        let leaf = Subtree::unrecognized(raw, state);
        candidate.advance(raw);
        candidate.pending.push(PendingItem::Error(leaf));
        candidate.cost += SKIP_TOKEN_COST;
        out.push(candidate);
    }

    // Pop: unwind one stack entry into error material, preserving input
    // order ahead of anything already pending.
    if !head.stack.is_empty() {
        let mut candidate = head.clone();
        if let Some(nodes) = candidate.stack.pop() {
            let items: Vec<PendingItem> = nodes
                .into_iter()
                .map(|node| {
                    if node.is_extra() {
                        PendingItem::Extra(node)
                    } else {
                        PendingItem::Error(node)
                    }
                })
                .collect();
            candidate.pending.splice(0..0, items);
            candidate.cost += POP_ENTRY_COST;
            candidate.reductions = 0;
            out.push(candidate);
        }
    }

    out
}

/// Byte length of the UTF-8 sequence starting with `first`.
fn utf8_len(first: u8) -> usize {
    match first {
        b if b < 0x80 => 1,
        b if b >= 0xF0 => 4,
        b if b >= 0xE0 => 3,
        b if b >= 0xC0 => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(symbol: u16, text: &str, flags: SubtreeFlags) -> Subtree {
        Subtree::leaf(Symbol::new(symbol), text, 0, flags)
    }

    #[test]
    fn pending_errors_collapse_into_one_node() {
        let mut items = vec![
            PendingItem::Error(leaf(9, "@", SubtreeFlags::IS_ERROR)),
            PendingItem::Error(leaf(9, "#", SubtreeFlags::IS_ERROR)),
            PendingItem::Extra(leaf(3, " ", SubtreeFlags::IS_EXTRA)),
            PendingItem::Error(leaf(9, "!", SubtreeFlags::IS_ERROR)),
        ];
        let nodes = flush_pending(&mut items);
        assert!(items.is_empty());
        assert_eq!(nodes.len(), 3);
        assert!(nodes[0].is_error());
        assert_eq!(nodes[0].child_count(), 2);
        assert!(nodes[1].is_extra());
        assert!(nodes[2].is_error());
        assert_eq!(nodes[2].child_count(), 1);
    }

    #[test]
    fn lone_error_node_is_not_rewrapped() {
        let inner = error_node(vec![leaf(9, "@", SubtreeFlags::IS_ERROR)]);
        let mut items = vec![PendingItem::Error(inner.clone())];
        let nodes = flush_pending(&mut items);
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].ptr_eq(&inner));
    }

    #[test]
    fn utf8_len_by_leading_byte() {
        assert_eq!(utf8_len(b'a'), 1);
        assert_eq!(utf8_len(0xC3), 2);
        assert_eq!(utf8_len(0xE2), 3);
        assert_eq!(utf8_len(0xF0), 4);
    }
}
