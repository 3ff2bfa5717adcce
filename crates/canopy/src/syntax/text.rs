#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Text size in bytes (UTF-8)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct TextSize(u32);

/// Text range representing a half-open byte span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct TextRange {
    start: TextSize,
    end: TextSize,
}

impl TextSize {
    #[must_use]
    pub const fn from(offset: u32) -> Self {
        Self(offset)
    }

    #[must_use]
    pub const fn into(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    #[must_use]
    pub fn of_text(text: &str) -> Self {
        Self(u32::try_from(text.len()).unwrap_or(u32::MAX))
    }

    #[must_use]
    pub const fn checked_sub(self, rhs: Self) -> Option<Self> {
        if self.0 >= rhs.0 {
            Some(Self(self.0 - rhs.0))
        } else {
            None
        }
    }
}

impl std::ops::Add<Self> for TextSize {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign<Self> for TextSize {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::ops::Sub<Self> for TextSize {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for TextSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TextRange {
    #[must_use]
    pub const fn new(start: TextSize, end: TextSize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn at(start: TextSize, len: TextSize) -> Self {
        Self::new(start, TextSize(start.0 + len.0))
    }

    #[must_use]
    pub const fn empty(offset: TextSize) -> Self {
        Self::new(offset, offset)
    }

    #[must_use]
    pub const fn start(self) -> TextSize {
        self.start
    }

    #[must_use]
    pub const fn end(self) -> TextSize {
        self.end
    }

    #[must_use]
    pub const fn len(self) -> TextSize {
        TextSize(self.end.0 - self.start.0)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start.0 == self.end.0
    }

    #[must_use]
    pub const fn contains(self, offset: TextSize) -> bool {
        offset.0 >= self.start.0 && offset.0 < self.end.0
    }

    #[must_use]
    pub const fn contains_range(self, other: Self) -> bool {
        other.start.0 >= self.start.0 && other.end.0 <= self.end.0
    }

    #[must_use]
    pub fn intersect(self, other: Self) -> Option<Self> {
        let start = self.start.0.max(other.start.0);
        let end = self.end.0.min(other.end.0);

        if start < end {
            Some(Self::new(TextSize(start), TextSize(end)))
        } else {
            None
        }
    }

    /// Like [`Self::intersect`], but treats touching endpoints as overlap.
    /// Token boundaries can extend across an edit, so invalidation checks
    /// use this rather than strict intersection.
    #[must_use]
    pub const fn touches(self, other: Self) -> bool {
        self.start.0 <= other.end.0 && other.start.0 <= self.end.0
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start.0, self.end.0)
    }
}

#[cfg(feature = "diagnostics")]
impl From<TextRange> for miette::SourceSpan {
    fn from(range: TextRange) -> Self {
        use miette::SourceOffset;
        Self::new(
            SourceOffset::from(range.start().into() as usize),
            range.len().into() as usize,
        )
    }
}

/// A row/column position. Rows and columns are zero-based; the column is a
/// byte offset within its row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Point {
    pub row: u32,
    pub column: u32,
}

impl Point {
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self { row: 0, column: 0 }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// A relative row/column advance: the number of rows spanned and the byte
/// length of the final row. Composes associatively, which is what lets
/// subtrees store points relative to their own start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct PointDelta {
    pub rows: u32,
    pub columns: u32,
}

impl PointDelta {
    #[must_use]
    pub const fn new(rows: u32, columns: u32) -> Self {
        Self { rows, columns }
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self {
            rows: 0,
            columns: 0,
        }
    }

    /// Measure the rows/columns spanned by a chunk of text.
    #[must_use]
    pub fn of_text(text: &str) -> Self {
        Self::of_bytes(text.as_bytes())
    }

    /// Byte-level variant of [`Self::of_text`]. Columns count raw bytes,
    /// so positions stay aligned even when the input is not valid UTF-8.
    #[must_use]
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut rows = 0u32;
        let mut last_newline = None;
        let mut search_from = 0;
        while let Some(i) = memchr::memchr(b'\n', &bytes[search_from..]) {
            rows += 1;
            last_newline = Some(search_from + i);
            search_from += i + 1;
        }
        let columns = match last_newline {
            Some(i) => u32::try_from(bytes.len() - i - 1).unwrap_or(u32::MAX),
            None => u32::try_from(bytes.len()).unwrap_or(u32::MAX),
        };
        Self { rows, columns }
    }
}

impl std::ops::Add<Self> for PointDelta {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        if rhs.rows == 0 {
            Self::new(self.rows, self.columns + rhs.columns)
        } else {
            Self::new(self.rows + rhs.rows, rhs.columns)
        }
    }
}

impl std::ops::AddAssign<Self> for PointDelta {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::ops::Add<PointDelta> for Point {
    type Output = Self;

    fn add(self, rhs: PointDelta) -> Self::Output {
        if rhs.rows == 0 {
            Self::new(self.row, self.column + rhs.columns)
        } else {
            Self::new(self.row + rhs.rows, rhs.columns)
        }
    }
}

impl std::ops::AddAssign<PointDelta> for Point {
    fn add_assign(&mut self, rhs: PointDelta) {
        *self = *self + rhs;
    }
}

/// An edit to previously parsed text, expressed in both byte and point
/// coordinates. Used only to remap an existing tree's coordinates and mark
/// the invalidated range before reparse; it never itself changes tree shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct InputEdit {
    pub start_byte: TextSize,
    pub old_end_byte: TextSize,
    pub new_end_byte: TextSize,
    pub start_point: Point,
    pub old_end_point: Point,
    pub new_end_point: Point,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_size_math() {
        let a = TextSize::from(10);
        let b = TextSize::from(4);
        assert_eq!((a + b).into(), 14);
        assert_eq!((a - b).into(), 6);
        assert_eq!(b.checked_sub(a), None);
        let mut c = a;
        c += b;
        assert_eq!(c.into(), 14);
    }

    #[test]
    fn text_range_contains() {
        let range = TextRange::new(TextSize::from(10), TextSize::from(20));
        assert!(!range.contains(TextSize::from(9)));
        assert!(range.contains(TextSize::from(10)));
        assert!(range.contains(TextSize::from(19)));
        assert!(!range.contains(TextSize::from(20)));
    }

    #[test]
    fn text_range_touches_adjacent() {
        let a = TextRange::new(TextSize::from(0), TextSize::from(5));
        let b = TextRange::new(TextSize::from(5), TextSize::from(9));
        assert!(a.intersect(b).is_none());
        assert!(a.touches(b));
        let c = TextRange::new(TextSize::from(6), TextSize::from(9));
        assert!(!a.touches(c));
    }

    #[test]
    fn point_delta_of_text() {
        assert_eq!(PointDelta::of_text(""), PointDelta::zero());
        assert_eq!(PointDelta::of_text("abc"), PointDelta::new(0, 3));
        assert_eq!(PointDelta::of_text("ab\n"), PointDelta::new(1, 0));
        assert_eq!(PointDelta::of_text("a\nbb\nc"), PointDelta::new(2, 1));
    }

    #[test]
    fn point_delta_of_bytes_counts_raw_bytes() {
        assert_eq!(PointDelta::of_bytes(b"ab\xff"), PointDelta::new(0, 3));
        assert_eq!(PointDelta::of_bytes(b"\xff\nx"), PointDelta::new(1, 1));
    }

    #[test]
    fn point_delta_composes() {
        let a = PointDelta::of_text("a\nbb");
        let b = PointDelta::of_text("cc\nd");
        let combined = PointDelta::of_text("a\nbbcc\nd");
        assert_eq!(a + b, combined);

        let start = Point::new(3, 7);
        assert_eq!(start + PointDelta::new(0, 2), Point::new(3, 9));
        assert_eq!(start + PointDelta::new(2, 1), Point::new(5, 1));
    }
}
