//! # Node surface
//!
//! [`Node`] is the read-only facade callers use to inspect a tree. It is a
//! cursor snapshot: it knows its whole path from the root, which is what
//! lets it answer parent, sibling, field, and alias questions without back
//! pointers in the shared subtrees.

use crate::language::{FieldId, Language, Symbol};
use crate::syntax::cursor::TreeCursor;
use crate::syntax::text::{Point, TextRange, TextSize};
use std::fmt;
use std::fmt::Write as _;

/// One node of a [`Tree`](crate::syntax::Tree).
#[derive(Clone)]
pub struct Node<'t> {
    cursor: TreeCursor<'t>,
}

impl<'t> Node<'t> {
    pub(crate) fn root(tree: &'t crate::syntax::Tree) -> Self {
        Self {
            cursor: TreeCursor::new(tree),
        }
    }

    pub(crate) fn from_cursor(cursor: TreeCursor<'t>) -> Self {
        Self { cursor }
    }

    /// A fresh cursor positioned on this node.
    #[must_use]
    pub fn walk(&self) -> TreeCursor<'t> {
        self.cursor.clone()
    }

    fn language(&self) -> &'t Language {
        self.cursor.tree().language()
    }

    fn subtree(&self) -> &'t crate::syntax::Subtree {
        self.cursor.subtree()
    }

    /// The alias assigned by the parent production, if any.
    fn alias(&self) -> Option<Symbol> {
        let parent = self.cursor.parent_frame()?;
        parent
            .subtree
            .alias_for_child(self.cursor.top().index_in_parent)
    }

    /// The symbol this node surfaces as: its alias when the enclosing
    /// production assigns one, its own symbol otherwise.
    #[must_use]
    pub fn symbol(&self) -> Symbol {
        self.alias().unwrap_or_else(|| self.subtree().symbol())
    }

    #[must_use]
    pub fn kind_name(&self) -> &'t str {
        self.language().symbol_name(self.symbol())
    }

    #[must_use]
    pub fn is_named(&self) -> bool {
        match self.alias() {
            Some(alias) => self.language().is_named(alias),
            None => self.subtree().is_named(),
        }
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        self.subtree().is_missing()
    }

    #[must_use]
    pub fn is_extra(&self) -> bool {
        self.subtree().is_extra()
    }

    /// True for leaves produced by keyword correction.
    #[must_use]
    pub fn is_keyword(&self) -> bool {
        self.subtree().is_keyword()
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.subtree().is_error()
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        self.subtree().has_error()
    }

    /// Start byte in current (post-edit) coordinates.
    #[must_use]
    pub fn start_byte(&self) -> TextSize {
        self.cursor.tree().map_byte(self.cursor.raw_start_byte())
    }

    #[must_use]
    pub fn end_byte(&self) -> TextSize {
        let raw_end = self.cursor.raw_start_byte() + self.subtree().byte_len();
        self.cursor.tree().map_byte(raw_end)
    }

    #[must_use]
    pub fn byte_range(&self) -> TextRange {
        TextRange::new(self.start_byte(), self.end_byte())
    }

    #[must_use]
    pub fn start_point(&self) -> Point {
        self.cursor.tree().map_point(self.cursor.raw_start_point())
    }

    #[must_use]
    pub fn end_point(&self) -> Point {
        let raw_end = self.cursor.raw_start_point() + self.subtree().point_len();
        self.cursor.tree().map_point(raw_end)
    }

    /// Token text, for leaves.
    #[must_use]
    pub fn text(&self) -> Option<&'t str> {
        self.subtree().text()
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.subtree().child_count()
    }

    #[must_use]
    pub fn child(&self, index: usize) -> Option<Node<'t>> {
        let mut cursor = self.cursor.clone();
        cursor.goto_child(index).then(|| Node::from_cursor(cursor))
    }

    /// All children, in order.
    pub fn children(&self) -> impl Iterator<Item = Node<'t>> + '_ {
        (0..self.child_count()).filter_map(move |i| self.child(i))
    }

    #[must_use]
    pub fn named_child_count(&self) -> usize {
        self.children().filter(Node::is_named).count()
    }

    #[must_use]
    pub fn named_child(&self, index: usize) -> Option<Node<'t>> {
        self.children().filter(Node::is_named).nth(index)
    }

    /// The field the enclosing production assigned to this node, if any.
    #[must_use]
    pub fn field_id(&self) -> Option<FieldId> {
        let parent = self.cursor.parent_frame()?;
        parent
            .subtree
            .field_for_child(self.cursor.top().index_in_parent)
    }

    #[must_use]
    pub fn field_name(&self) -> Option<&'t str> {
        self.field_id().map(|id| self.language().field_name(id))
    }

    #[must_use]
    pub fn child_by_field_id(&self, field: FieldId) -> Option<Node<'t>> {
        let subtree = self.subtree();
        (0..subtree.child_count())
            .find(|&i| subtree.field_for_child(i) == Some(field))
            .and_then(|i| self.child(i))
    }

    #[must_use]
    pub fn child_by_field_name(&self, name: &str) -> Option<Node<'t>> {
        self.child_by_field_id(self.language().field_id(name)?)
    }

    #[must_use]
    pub fn parent(&self) -> Option<Node<'t>> {
        let mut cursor = self.cursor.clone();
        cursor.goto_parent().then(|| Node::from_cursor(cursor))
    }

    #[must_use]
    pub fn next_sibling(&self) -> Option<Node<'t>> {
        let mut cursor = self.cursor.clone();
        cursor
            .goto_next_sibling()
            .then(|| Node::from_cursor(cursor))
    }

    #[must_use]
    pub fn prev_sibling(&self) -> Option<Node<'t>> {
        let index = self.cursor.top().index_in_parent;
        if index == 0 {
            return None;
        }
        self.parent()?.child(index - 1)
    }

    /// Total node count of this node's subtree, itself included.
    #[must_use]
    pub fn descendant_count(&self) -> usize {
        self.subtree().descendant_count()
    }

    /// Pre-order traversal of this node's subtree, this node first. Every
    /// node (named or not) is visited exactly once.
    #[must_use]
    pub fn descendants(&self) -> Descendants<'t> {
        Descendants {
            cursor: self.cursor.clone(),
            base_depth: self.cursor.depth(),
            done: false,
        }
    }

    /// Render the named derivation structure as an s-expression, the
    /// conventional compact form for asserting tree shape. Extras
    /// (whitespace, comments) are omitted; MISSING leaves are shown.
    #[must_use]
    pub fn to_sexp(&self) -> String {
        let mut out = String::new();
        self.write_sexp(&mut out);
        out
    }

    fn write_sexp(&self, out: &mut String) {
        if self.is_missing() {
            if self.is_named() {
                let _ = write!(out, "(MISSING {})", self.kind_name());
            } else {
                let _ = write!(out, "(MISSING \"{}\")", self.kind_name());
            }
            return;
        }
        let _ = write!(out, "({}", self.kind_name());
        for child in self.children() {
            if (child.is_named() && !child.is_extra()) || child.is_missing() {
                out.push(' ');
                if let Some(field) = child.field_name() {
                    let _ = write!(out, "{field}: ");
                }
                child.write_sexp(out);
            }
        }
        out.push(')');
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.subtree().ptr_eq(other.subtree())
            && self.cursor.raw_start_byte() == other.cursor.raw_start_byte()
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.kind_name(), self.byte_range())
    }
}

/// Iterator returned by [`Node::descendants`].
pub struct Descendants<'t> {
    cursor: TreeCursor<'t>,
    base_depth: usize,
    done: bool,
}

impl<'t> Iterator for Descendants<'t> {
    type Item = Node<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let node = self.cursor.node();
        if !self.cursor.goto_first_child() {
            loop {
                if self.cursor.depth() == self.base_depth {
                    self.done = true;
                    break;
                }
                if self.cursor.goto_next_sibling() {
                    break;
                }
                if !self.cursor.goto_parent() {
                    self.done = true;
                    break;
                }
            }
        }
        Some(node)
    }
}
