//! # Parse input
//!
//! Text reaches the parser through [`TextInput`], a pull-based chunk
//! callback: the engine asks for the bytes at a position and the source
//! hands back however much is convenient. An empty chunk means end of
//! input. The engine accumulates chunks in an [`InputBuffer`] so pattern
//! matching always sees contiguous bytes, pulling more only when a token
//! might extend past what has been read.

use crate::syntax::{Point, PointDelta, TextSize};

/// A source of text to parse.
pub trait TextInput {
    /// The chunk of text starting at `byte_offset`. The point is the same
    /// position in row/column form, for sources indexed that way. Return
    /// an empty slice at end of input.
    fn read(&mut self, byte_offset: TextSize, point: Point) -> &[u8];
}

impl TextInput for &str {
    fn read(&mut self, byte_offset: TextSize, _point: Point) -> &[u8] {
        let offset = byte_offset.into() as usize;
        self.as_bytes().get(offset..).unwrap_or(&[])
    }
}

/// A string served in fixed-size chunks. Exercises the buffering path the
/// way an editor rope would.
pub struct ChunkedInput<'a> {
    text: &'a str,
    chunk_size: usize,
}

impl<'a> ChunkedInput<'a> {
    #[must_use]
    pub fn new(text: &'a str, chunk_size: usize) -> Self {
        Self {
            text,
            chunk_size: chunk_size.max(1),
        }
    }
}

impl TextInput for ChunkedInput<'_> {
    fn read(&mut self, byte_offset: TextSize, _point: Point) -> &[u8] {
        let offset = byte_offset.into() as usize;
        let bytes = self.text.as_bytes();
        if offset >= bytes.len() {
            return &[];
        }
        let end = (offset + self.chunk_size).min(bytes.len());
        &bytes[offset..end]
    }
}

/// Accumulated input. Grows monotonically over one parse; never shrinks.
#[derive(Default)]
pub(crate) struct InputBuffer {
    bytes: Vec<u8>,
    end_point: Point,
    end_reached: bool,
}

impl InputBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.bytes.len()
    }

    pub(crate) fn at_end(&self) -> bool {
        self.end_reached
    }

    pub(crate) fn slice_from(&self, offset: usize) -> &[u8] {
        self.bytes.get(offset..).unwrap_or(&[])
    }

    /// Pull one more chunk. Returns false when the source is exhausted.
    pub(crate) fn pull(&mut self, input: &mut dyn TextInput) -> bool {
        if self.end_reached {
            return false;
        }
        let offset = TextSize::from(u32::try_from(self.bytes.len()).unwrap_or(u32::MAX));
        let chunk = input.read(offset, self.end_point);
        if chunk.is_empty() {
            self.end_reached = true;
            return false;
        }
        self.end_point += PointDelta::of_bytes(chunk);
        self.bytes.extend_from_slice(chunk);
        true
    }

    /// Pull until at least `offset + 1` bytes are buffered or the source
    /// ends.
    pub(crate) fn fill_past(&mut self, input: &mut dyn TextInput, offset: usize) {
        while self.bytes.len() <= offset && self.pull(input) {}
    }
}
