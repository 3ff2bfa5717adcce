//! # Tree cursors
//!
//! A [`TreeCursor`] walks a tree while accumulating absolute positions
//! from the relative lengths stored in subtrees. It is a stack of frames,
//! one per level of the current path; all navigation is O(depth) at worst
//! and touches no shared state, so any number of cursors can walk the same
//! tree from different threads.

use crate::syntax::node::Node;
use crate::syntax::subtree::Subtree;
use crate::syntax::text::{Point, TextSize};
use crate::syntax::tree::Tree;
use smallvec::SmallVec;

/// One level of the cursor's path. Positions are kept in the coordinates
/// of the originally parsed text and mapped through the tree's edit chain
/// when exposed.
#[derive(Clone)]
pub(crate) struct Frame<'t> {
    pub(crate) subtree: &'t Subtree,
    pub(crate) index_in_parent: usize,
    pub(crate) start_byte: TextSize,
    pub(crate) start_point: Point,
}

/// A re-positionable pointer into a [`Tree`].
#[derive(Clone)]
pub struct TreeCursor<'t> {
    tree: &'t Tree,
    frames: SmallVec<[Frame<'t>; 8]>,
}

impl<'t> TreeCursor<'t> {
    #[must_use]
    pub(crate) fn new(tree: &'t Tree) -> Self {
        let mut frames = SmallVec::new();
        frames.push(Frame {
            subtree: tree.root(),
            index_in_parent: 0,
            start_byte: TextSize::zero(),
            start_point: Point::zero(),
        });
        Self { tree, frames }
    }

    #[must_use]
    pub(crate) fn tree(&self) -> &'t Tree {
        self.tree
    }

    pub(crate) fn top(&self) -> &Frame<'t> {
        // The root frame is pushed at construction and never popped.
        &self.frames[self.frames.len() - 1]
    }

    pub(crate) fn parent_frame(&self) -> Option<&Frame<'t>> {
        self.frames.len().checked_sub(2).map(|i| &self.frames[i])
    }

    /// The subtree the cursor currently points at.
    #[must_use]
    pub(crate) fn subtree(&self) -> &'t Subtree {
        self.top().subtree
    }

    /// Start position in originally-parsed coordinates.
    pub(crate) fn raw_start_byte(&self) -> TextSize {
        self.top().start_byte
    }

    pub(crate) fn raw_start_point(&self) -> Point {
        self.top().start_point
    }

    /// Current node as a standalone [`Node`].
    #[must_use]
    pub fn node(&self) -> Node<'t> {
        Node::from_cursor(self.clone())
    }

    /// Depth of the current node; the root is at depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// Descend to the first child. Returns false on a leaf.
    pub fn goto_first_child(&mut self) -> bool {
        let frame = self.top();
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

    /// Move to the next sibling. Returns false on the last child or the
    /// root.
    pub fn goto_next_sibling(&mut self) -> bool {
        let Some(parent) = self.parent_frame() else {
            return false;
        };
        let parent_subtree = parent.subtree;
        let top = self.top();
        let next_index = top.index_in_parent + 1;
        let Some(next) = parent_subtree.child(next_index) else {
            return false;
        };
        let start_byte = top.start_byte + top.subtree.byte_len();
        let start_point = top.start_point + top.subtree.point_len();
        let last = self.frames.len() - 1;
        self.frames[last] = Frame {
            subtree: next,
            index_in_parent: next_index,
            start_byte,
            start_point,
        };
        true
    }

    /// Climb one level. Returns false at the root.
    pub fn goto_parent(&mut self) -> bool {
        if self.frames.len() > 1 {
            self.frames.pop();
            true
        } else {
            false
        }
    }

    /// Descend to the child at `index`, if there is one.
    pub(crate) fn goto_child(&mut self, index: usize) -> bool {
        let frame = self.top();
        let subtree = frame.subtree;
        if index >= subtree.child_count() {
            return false;
        }
        let mut start_byte = frame.start_byte;
        let mut start_point = frame.start_point;
        for child in &subtree.children()[..index] {
            start_byte += child.byte_len();
            start_point += child.point_len();
        }
        self.frames.push(Frame {
            subtree: &subtree.children()[index],
            index_in_parent: index,
            start_byte,
            start_point,
        });
        true
    }

    /// Descend to the first child whose span ends after `target` (current
    /// coordinates). Returns the child index, or None when the position is
    /// past every child.
    pub fn goto_first_child_for_byte(&mut self, target: TextSize) -> Option<usize> {
        let frame = self.top();
        let subtree = frame.subtree;
        let mut start_byte = frame.start_byte;
        let mut start_point = frame.start_point;
        for (index, child) in subtree.children().iter().enumerate() {
            let end = start_byte + child.byte_len();
            if target < self.tree.map_byte(end) {
                self.frames.push(Frame {
                    subtree: child,
                    index_in_parent: index,
                    start_byte,
                    start_point,
                });
                return Some(index);
            }
            start_byte = end;
            start_point += child.point_len();
        }
        None
    }

    /// Point-targeted variant of [`Self::goto_first_child_for_byte`].
    pub fn goto_first_child_for_point(&mut self, target: Point) -> Option<usize> {
        let frame = self.top();
        let subtree = frame.subtree;
        let mut start_byte = frame.start_byte;
        let mut start_point = frame.start_point;
        for (index, child) in subtree.children().iter().enumerate() {
            let end = start_point + child.point_len();
            if target < self.tree.map_point(end) {
                self.frames.push(Frame {
                    subtree: child,
                    index_in_parent: index,
                    start_byte,
                    start_point,
                });
                return Some(index);
            }
            start_byte += child.byte_len();
            start_point = end;
        }
        None
    }

    /// Advance in pre-order: first child, else next sibling, else the next
    /// sibling of the nearest ancestor that has one. Returns false once the
    /// whole tree has been visited.
    pub(crate) fn goto_preorder_next(&mut self) -> bool {
        if self.goto_first_child() {
            return true;
        }
        loop {
            if self.goto_next_sibling() {
                return true;
            }
            if !self.goto_parent() {
                return false;
            }
        }
    }
}
