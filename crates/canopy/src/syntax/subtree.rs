//! # Immutable shared subtrees
//!
//! A [`Subtree`] is one node of the concrete syntax tree together with all
//! of its descendants, frozen behind an `Arc`. Lengths are stored relative
//! to the subtree's own start (a byte length plus a [`PointDelta`]), never
//! as absolute positions, so a subtree can be shared between trees and
//! spliced into a reparse at a different offset without being rewritten.
//!
//! Absolute positions are reconstructed by cursors while walking down from
//! the root.

use crate::language::{FieldId, StateId, Symbol};
use crate::syntax::text::{PointDelta, TextSize};
use compact_str::CompactString;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Per-node flag bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubtreeFlags(u8);

impl SubtreeFlags {
    /// This node or one of its descendants is an ERROR or MISSING node.
    pub const HAS_ERROR: Self = Self(1 << 0);
    /// This node is itself an ERROR node (or an unrecognized-input leaf).
    pub const IS_ERROR: Self = Self(1 << 1);
    /// Zero-width leaf synthesized by recovery.
    pub const IS_MISSING: Self = Self(1 << 2);
    /// Extra symbol attached outside the derivation (whitespace, comment).
    pub const IS_EXTRA: Self = Self(1 << 3);
    /// Named symbols surface in named-child traversal.
    pub const IS_NAMED: Self = Self(1 << 4);
    /// Leaf produced by keyword correction.
    pub const IS_KEYWORD: Self = Self(1 << 5);

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn when(self, condition: bool) -> Self {
        if condition {
            self
        } else {
            Self(0)
        }
    }

    #[must_use]
    pub const fn minus(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl std::ops::BitOr for SubtreeFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for SubtreeFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Child storage. Most interior nodes are small, so up to four children
/// live inline; larger lists are frozen into a shared slice.
#[derive(Clone)]
enum Children {
    Leaf(CompactString),
    Inline(SmallVec<[Subtree; 4]>),
    Many(Arc<[Subtree]>),
}

/// The heap payload of one subtree. Reference-counted and never mutated
/// after construction.
pub struct SubtreeData {
    symbol: Symbol,
    flags: SubtreeFlags,
    byte_len: TextSize,
    point_len: PointDelta,
    /// For leaves: the parser state the token was shifted from. For
    /// interior nodes: the state the node's goto lands from. Compared
    /// during incremental reuse; excluded from structural equality.
    parse_state: StateId,
    /// Index of the reducing production, `u16::MAX` for leaves and for
    /// synthesized ERROR nodes.
    production_id: u16,
    /// Field assignments keyed by final child index, sorted.
    child_fields: SmallVec<[(u16, FieldId); 2]>,
    /// Alias assignments keyed by final child index, sorted.
    child_aliases: SmallVec<[(u16, Symbol); 1]>,
    children: Children,
}

/// A cheaply clonable handle to an immutable subtree.
#[derive(Clone)]
pub struct Subtree {
    data: Arc<SubtreeData>,
}

pub(crate) const NO_PRODUCTION: u16 = u16::MAX;

impl Subtree {
    /// A leaf token holding its own text.
    #[must_use]
    pub(crate) fn leaf(
        symbol: Symbol,
        text: &str,
        parse_state: StateId,
        flags: SubtreeFlags,
    ) -> Self {
        Self::leaf_with_extent(
            symbol,
            text.into(),
            TextSize::of_text(text),
            PointDelta::of_text(text),
            parse_state,
            flags,
        )
    }

    /// A leaf over raw scanned bytes. The stored text is a lossy UTF-8
    /// rendering, but the extent is always the scanned byte count, so
    /// invalid bytes in the input never shift later positions.
    #[must_use]
    pub(crate) fn scanned(
        symbol: Symbol,
        raw: &[u8],
        parse_state: StateId,
        flags: SubtreeFlags,
    ) -> Self {
        Self::leaf_with_extent(
            symbol,
            CompactString::from_utf8_lossy(raw),
            TextSize::from(u32::try_from(raw.len()).unwrap_or(u32::MAX)),
            PointDelta::of_bytes(raw),
            parse_state,
            flags,
        )
    }

    fn leaf_with_extent(
        symbol: Symbol,
        text: CompactString,
        byte_len: TextSize,
        point_len: PointDelta,
        parse_state: StateId,
        flags: SubtreeFlags,
    ) -> Self {
        Self {
            data: Arc::new(SubtreeData {
                symbol,
                flags: flags
                    .union(SubtreeFlags::HAS_ERROR.when(
                        flags.contains(SubtreeFlags::IS_ERROR)
                            || flags.contains(SubtreeFlags::IS_MISSING),
                    )),
                byte_len,
                point_len,
                parse_state,
                production_id: NO_PRODUCTION,
                child_fields: SmallVec::new(),
                child_aliases: SmallVec::new(),
                children: Children::Leaf(text),
            }),
        }
    }

    /// A zero-width leaf standing in for a token the input lacked.
    #[must_use]
    pub(crate) fn missing(symbol: Symbol, named: bool, parse_state: StateId) -> Self {
        Self::leaf(
            symbol,
            "",
            parse_state,
            SubtreeFlags::IS_MISSING.union(SubtreeFlags::IS_NAMED.when(named)),
        )
    }

    /// A leaf covering input bytes no token rule accepted.
    #[must_use]
    pub(crate) fn unrecognized(raw: &[u8], parse_state: StateId) -> Self {
        Self::scanned(
            Symbol::ERROR,
            raw,
            parse_state,
            SubtreeFlags::IS_ERROR.union(SubtreeFlags::IS_NAMED),
        )
    }

    /// An interior node over already-built children. Length, point span,
    /// and the error bit are derived from the children.
    #[must_use]
    pub(crate) fn interior(
        symbol: Symbol,
        children: Vec<Subtree>,
        parse_state: StateId,
        production_id: u16,
        child_fields: SmallVec<[(u16, FieldId); 2]>,
        child_aliases: SmallVec<[(u16, Symbol); 1]>,
        flags: SubtreeFlags,
    ) -> Self {
        let mut byte_len = TextSize::zero();
        let mut point_len = PointDelta::zero();
        let mut derived = flags;
        if flags.contains(SubtreeFlags::IS_ERROR) || flags.contains(SubtreeFlags::IS_MISSING) {
            derived |= SubtreeFlags::HAS_ERROR;
        }
        for child in &children {
            byte_len += child.byte_len();
            point_len += child.point_len();
            if child.has_error() {
                derived |= SubtreeFlags::HAS_ERROR;
            }
        }
        let children = if children.len() <= 4 {
            Children::Inline(SmallVec::from_vec(children))
        } else {
            Children::Many(children.into())
        };
        Self {
            data: Arc::new(SubtreeData {
                symbol,
                flags: derived,
                byte_len,
                point_len,
                parse_state,
                production_id,
                child_fields,
                child_aliases,
                children,
            }),
        }
    }

    #[must_use]
    pub fn symbol(&self) -> Symbol {
        self.data.symbol
    }

    #[must_use]
    pub fn byte_len(&self) -> TextSize {
        self.data.byte_len
    }

    #[must_use]
    pub fn point_len(&self) -> PointDelta {
        self.data.point_len
    }

    #[must_use]
    pub(crate) fn parse_state(&self) -> StateId {
        self.data.parse_state
    }

    #[must_use]
    pub(crate) fn production_id(&self) -> u16 {
        self.data.production_id
    }

    #[must_use]
    pub fn flags(&self) -> SubtreeFlags {
        self.data.flags
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        self.data.flags.contains(SubtreeFlags::HAS_ERROR)
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.data.flags.contains(SubtreeFlags::IS_ERROR)
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        self.data.flags.contains(SubtreeFlags::IS_MISSING)
    }

    #[must_use]
    pub fn is_extra(&self) -> bool {
        self.data.flags.contains(SubtreeFlags::IS_EXTRA)
    }

    #[must_use]
    pub fn is_named(&self) -> bool {
        self.data.flags.contains(SubtreeFlags::IS_NAMED)
    }

    #[must_use]
    pub fn is_keyword(&self) -> bool {
        self.data.flags.contains(SubtreeFlags::IS_KEYWORD)
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self.data.children, Children::Leaf(_))
    }

    /// Leaf text, if this is a leaf.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.data.children {
            Children::Leaf(text) => Some(text.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn children(&self) -> &[Subtree] {
        match &self.data.children {
            Children::Leaf(_) => &[],
            Children::Inline(list) => list,
            Children::Many(list) => list,
        }
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children().len()
    }

    #[must_use]
    pub fn child(&self, index: usize) -> Option<&Subtree> {
        self.children().get(index)
    }

    /// The field assigned to the child at `index`, if any.
    #[must_use]
    pub fn field_for_child(&self, index: usize) -> Option<FieldId> {
        let key = u16::try_from(index).ok()?;
        self.data
            .child_fields
            .binary_search_by_key(&key, |(slot, _)| *slot)
            .ok()
            .map(|i| self.data.child_fields[i].1)
    }

    /// The alias symbol the child at `index` should surface as, if any.
    #[must_use]
    pub fn alias_for_child(&self, index: usize) -> Option<Symbol> {
        let key = u16::try_from(index).ok()?;
        self.data
            .child_aliases
            .binary_search_by_key(&key, |(slot, _)| *slot)
            .ok()
            .map(|i| self.data.child_aliases[i].1)
    }

    /// Rebuild this node with extra nodes inserted before and after its
    /// children, keeping field and alias assignments aligned. Used when an
    /// accepted root has leading or trailing extras to absorb.
    #[must_use]
    pub(crate) fn with_surrounding(&self, leading: Vec<Subtree>, trailing: Vec<Subtree>) -> Self {
        if leading.is_empty() && trailing.is_empty() {
            return self.clone();
        }
        let shift = u16::try_from(leading.len()).unwrap_or(u16::MAX);
        let mut children = leading;
        children.extend(self.children().iter().cloned());
        children.extend(trailing);
        let fields = self
            .data
            .child_fields
            .iter()
            .map(|&(slot, field)| (slot + shift, field))
            .collect();
        let aliases = self
            .data
            .child_aliases
            .iter()
            .map(|&(slot, alias)| (slot + shift, alias))
            .collect();
        Self::interior(
            self.data.symbol,
            children,
            self.data.parse_state,
            self.data.production_id,
            fields,
            aliases,
            self.data.flags.minus(SubtreeFlags::HAS_ERROR),
        )
    }

    /// Pointer identity, used to detect reuse in tests and metrics.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Total node count of this subtree, itself included.
    #[must_use]
    pub fn descendant_count(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(Subtree::descendant_count)
            .sum::<usize>()
    }
}

/// Structural equality: symbol, flags, extent, text, and children. The
/// parse state and production id are bookkeeping for reuse, not structure,
/// so two trees built by different action sequences can still compare equal.
impl PartialEq for Subtree {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        self.data.symbol == other.data.symbol
            && self.data.flags == other.data.flags
            && self.data.byte_len == other.data.byte_len
            && self.data.point_len == other.data.point_len
            && self.text() == other.text()
            && self.children() == other.children()
    }
}

impl Eq for Subtree {}

impl fmt::Debug for Subtree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Subtree");
        s.field("symbol", &self.data.symbol)
            .field("byte_len", &self.data.byte_len);
        if let Some(text) = self.text() {
            s.field("text", &text);
        } else {
            s.field("children", &self.child_count());
        }
        if self.has_error() {
            s.field("has_error", &true);
        }
        s.finish()
    }
}
