//! # Parse trees
//!
//! A [`Tree`] pairs an immutable root [`Subtree`] with the language that
//! produced it and the edits recorded against it since it was parsed.
//!
//! Because subtrees store only relative lengths, recording an edit never
//! rewrites a node. Instead the edit chain acts as a coordinate view: node
//! positions are accumulated in the coordinates of the originally parsed
//! text and mapped through the chain on the way out. [`Tree::edit`] returns
//! a new `Tree` value sharing every node with the original, which stays
//! fully usable.

use crate::error::EditError;
use crate::language::Language;
use crate::syntax::cursor::TreeCursor;
use crate::syntax::node::Node;
use crate::syntax::subtree::Subtree;
use crate::syntax::text::{InputEdit, Point, TextRange, TextSize};
use std::fmt;
use std::sync::Arc;

/// An immutable concrete syntax tree.
#[derive(Clone)]
pub struct Tree {
    language: Arc<Language>,
    root: Subtree,
    /// Edits recorded since this tree was produced, in chronological order.
    /// Each edit's coordinates are relative to the text as it stood when
    /// that edit was applied.
    edits: Vec<InputEdit>,
}

impl Tree {
    pub(crate) fn new(language: Arc<Language>, root: Subtree) -> Self {
        Self {
            language,
            root,
            edits: Vec::new(),
        }
    }

    #[must_use]
    pub fn language(&self) -> &Arc<Language> {
        &self.language
    }

    pub(crate) fn root(&self) -> &Subtree {
        &self.root
    }

    pub(crate) fn edits(&self) -> &[InputEdit] {
        &self.edits
    }

    /// True if any ERROR or MISSING node exists anywhere in the tree.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.root.has_error()
    }

    /// Byte length of the tree's text in current (post-edit) coordinates.
    #[must_use]
    pub fn len(&self) -> TextSize {
        self.map_byte(self.root.byte_len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == TextSize::zero()
    }

    /// End position of the tree's text in current coordinates.
    #[must_use]
    pub fn end_point(&self) -> Point {
        let delta = self.root.point_len();
        self.map_point(Point::zero() + delta)
    }

    /// Record an edit, returning the edited tree. Coordinates are validated
    /// against the tree's current extent before anything is recorded; a
    /// rejected edit leaves no trace.
    pub fn edit(&self, edit: &InputEdit) -> Result<Self, EditError> {
        if edit.start_byte > edit.old_end_byte {
            return Err(EditError::Inverted {
                start: edit.start_byte,
                old_end: edit.old_end_byte,
            });
        }
        let len = self.len();
        if edit.old_end_byte > len {
            return Err(EditError::OutOfBounds {
                start: edit.start_byte,
                old_end: edit.old_end_byte,
                len,
            });
        }
        if edit.new_end_byte < edit.start_byte
            || edit.old_end_point < edit.start_point
            || edit.new_end_point < edit.start_point
        {
            return Err(EditError::InconsistentPoints);
        }
        let mut edited = self.clone();
        edited.edits.push(*edit);
        Ok(edited)
    }

    /// Map a byte position from originally-parsed coordinates to current
    /// coordinates.
    pub(crate) fn map_byte(&self, pos: TextSize) -> TextSize {
        self.edits
            .iter()
            .fold(pos, |pos, edit| map_byte_through(edit, pos))
    }

    /// Map a point from originally-parsed coordinates to current
    /// coordinates.
    pub(crate) fn map_point(&self, point: Point) -> Point {
        self.edits
            .iter()
            .fold(point, |point, edit| map_point_through(edit, point))
    }

    /// Whether a range of the originally parsed text overlaps or abuts any
    /// recorded edit. Abutting counts because token boundaries can extend
    /// across an edit.
    pub(crate) fn range_invalidated(&self, range: TextRange) -> bool {
        let mut start = range.start();
        let mut end = range.end();
        for edit in &self.edits {
            let edited = TextRange::new(edit.start_byte, edit.old_end_byte);
            if TextRange::new(start, end).touches(edited) {
                return true;
            }
            start = map_byte_through(edit, start);
            end = map_byte_through(edit, end);
        }
        false
    }

    /// The root as a [`Node`].
    #[must_use]
    pub fn root_node(&self) -> Node<'_> {
        Node::root(self)
    }

    /// A fresh cursor positioned on the root.
    #[must_use]
    pub fn walk(&self) -> TreeCursor<'_> {
        TreeCursor::new(self)
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("language", &self.language.name())
            .field("len", &self.len())
            .field("has_error", &self.has_error())
            .field("pending_edits", &self.edits.len())
            .finish()
    }
}

/// Carry one byte position across one edit. Positions inside the replaced
/// range clamp to the replacement's end; nothing inside an edited range is
/// ever reused, so the clamp only affects display of stale queries.
fn map_byte_through(edit: &InputEdit, pos: TextSize) -> TextSize {
    if pos < edit.start_byte {
        pos
    } else if pos >= edit.old_end_byte {
        edit.new_end_byte + (pos - edit.old_end_byte)
    } else {
        edit.new_end_byte
    }
}

/// Carry one point across one edit, same policy as [`map_byte_through`].
fn map_point_through(edit: &InputEdit, point: Point) -> Point {
    if point < edit.start_point {
        point
    } else if point >= edit.old_end_point {
        if point.row == edit.old_end_point.row {
            Point::new(
                edit.new_end_point.row,
                edit.new_end_point.column + (point.column - edit.old_end_point.column),
            )
        } else {
            Point::new(
                edit.new_end_point.row + (point.row - edit.old_end_point.row),
                point.column,
            )
        }
    } else {
        edit.new_end_point
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insertion(at: u32, len: u32) -> InputEdit {
        InputEdit {
            start_byte: TextSize::from(at),
            old_end_byte: TextSize::from(at),
            new_end_byte: TextSize::from(at + len),
            start_point: Point::new(0, at),
            old_end_point: Point::new(0, at),
            new_end_point: Point::new(0, at + len),
        }
    }

    #[test]
    fn byte_mapping_across_insertion() {
        let edit = insertion(4, 3);
        assert_eq!(map_byte_through(&edit, TextSize::from(2)), TextSize::from(2));
        assert_eq!(map_byte_through(&edit, TextSize::from(4)), TextSize::from(7));
        assert_eq!(
            map_byte_through(&edit, TextSize::from(10)),
            TextSize::from(13)
        );
    }

    #[test]
    fn byte_mapping_clamps_inside_replacement() {
        let edit = InputEdit {
            start_byte: TextSize::from(2),
            old_end_byte: TextSize::from(8),
            new_end_byte: TextSize::from(4),
            start_point: Point::new(0, 2),
            old_end_point: Point::new(0, 8),
            new_end_point: Point::new(0, 4),
        };
        assert_eq!(map_byte_through(&edit, TextSize::from(5)), TextSize::from(4));
        assert_eq!(
            map_byte_through(&edit, TextSize::from(9)),
            TextSize::from(5)
        );
    }

    #[test]
    fn point_mapping_across_newline_insertion() {
        // Replace nothing at (1, 2) with text ending at (3, 1).
        let edit = InputEdit {
            start_byte: TextSize::from(10),
            old_end_byte: TextSize::from(10),
            new_end_byte: TextSize::from(20),
            start_point: Point::new(1, 2),
            old_end_point: Point::new(1, 2),
            new_end_point: Point::new(3, 1),
        };
        // Same row as the edit end: column shifts onto the new end row.
        assert_eq!(
            map_point_through(&edit, Point::new(1, 5)),
            Point::new(3, 4)
        );
        // Later rows only shift by the row delta.
        assert_eq!(
            map_point_through(&edit, Point::new(4, 7)),
            Point::new(6, 7)
        );
        // Earlier positions are untouched.
        assert_eq!(
            map_point_through(&edit, Point::new(0, 9)),
            Point::new(0, 9)
        );
    }
}
