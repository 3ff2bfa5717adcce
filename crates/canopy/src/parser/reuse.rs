//! # Subtree reuse
//!
//! During an incremental reparse a [`ReuseCursor`] walks the previous tree
//! in lockstep with the new parse. Whenever the (single) head's position
//! lines up with the remapped start of an old subtree that survived the
//! edits intact, the whole subtree is spliced onto the stack instead of
//! being re-lexed and re-parsed. Reuse is purely an optimization: declining
//! is always safe, so every check below errs toward declining.

use crate::language::{Language, ParseAction, StateId};
use crate::syntax::{Point, Subtree, TextRange, TextSize, Tree};

struct Frame<'t> {
    subtree: &'t Subtree,
    index_in_parent: usize,
    start_byte: TextSize,
    start_point: Point,
}

pub(crate) struct ReuseCursor<'t> {
    tree: &'t Tree,
    frames: Vec<Frame<'t>>,
    done: bool,
}

impl<'t> ReuseCursor<'t> {
    pub(crate) fn new(tree: &'t Tree) -> Self {
        Self {
            tree,
            frames: vec![Frame {
                subtree: tree.root(),
                index_in_parent: 0,
                start_byte: TextSize::zero(),
                start_point: Point::zero(),
            }],
            done: false,
        }
    }

    fn descend(&mut self) -> bool {
        let Some(frame) = self.frames.last() else {
            return false;
        };
        let (subtree, start_byte, start_point) =
            (frame.subtree, frame.start_byte, frame.start_point);
        match subtree.child(0) {
            Some(child) => {
                self.frames.push(Frame {
                    subtree: child,
                    index_in_parent: 0,
                    start_byte,
                    start_point,
                });
                true
            }
            None => false,
        }
    }

    /// Move past the current subtree: next sibling, or the next sibling of
    /// the nearest ancestor that has one.
    fn advance_past(&mut self) {
        loop {
            let Some(frame) = self.frames.pop() else {
                self.done = true;
                return;
            };
            let Some(parent) = self.frames.last() else {
                self.done = true;
                return;
            };
            let next_index = frame.index_in_parent + 1;
            if let Some(next) = parent.subtree.child(next_index) {
                self.frames.push(Frame {
                    subtree: next,
                    index_in_parent: next_index,
                    start_byte: frame.start_byte + frame.subtree.byte_len(),
                    start_point: frame.start_point + frame.subtree.point_len(),
                });
                return;
            }
        }
    }

    /// Look for an old subtree whose remapped start is exactly `target`
    /// (new coordinates) and that can be pushed from `state`. On success
    /// the cursor has already moved past the returned subtree; on failure
    /// it is parked at or beyond `target` for the next attempt.
    pub(crate) fn find(
        &mut self,
        target: TextSize,
        state: StateId,
        language: &Language,
    ) -> Option<(Subtree, StateId)> {
        while !self.done {
            let frame = self.frames.last()?;
            let subtree = frame.subtree;
            let start = frame.start_byte;
            let end = start + subtree.byte_len();

            if self.tree.map_byte(end) <= target || subtree.byte_len() == TextSize::zero() {
                self.advance_past();
                continue;
            }
            let mapped_start = self.tree.map_byte(start);
            if mapped_start > target {
                return None;
            }
            if mapped_start < target {
                // Target falls inside this subtree; only a descendant can
                // start at it.
                if !self.descend() {
                    self.advance_past();
                }
                continue;
            }

            let reusable = subtree.child_count() > 0
                && !subtree.has_error()
                && !subtree.is_extra()
                && subtree.parse_state() == state
                && !self.tree.range_invalidated(TextRange::new(start, end));
            if reusable {
                if let Some(next) = push_target(language, state, subtree) {
                    let reused = subtree.clone();
                    self.advance_past();
                    return Some((reused, next));
                }
            }
            if !self.descend() {
                return None;
            }
        }
        None
    }
}

/// The state pushing `subtree` from `state` would land in, if the table
/// has an unambiguous transition for it.
fn push_target(language: &Language, state: StateId, subtree: &Subtree) -> Option<StateId> {
    let symbol = subtree.symbol();
    if language.is_terminal(symbol) {
        match language.table().actions(state, symbol) {
            [ParseAction::Shift { state: next }] => Some(*next),
            _ => None,
        }
    } else {
        language.table().goto(state, symbol)
    }
}
