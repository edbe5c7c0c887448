//! Text sources for parsing.
//!
//! A parser reads text either from a whole in-memory buffer or through a
//! chunked callback, so virtualized or huge documents never need to be
//! materialized contiguously.

use salix_core::Point;

/// A source of text bytes.
///
/// `read` returns a chunk of bytes beginning at `byte`; an empty slice
/// signals end of input. Chunks may be any non-zero length and are copied
/// by the lexer, so the same buffer may be reused across calls.
pub trait TextInput {
    fn read(&mut self, byte: usize, point: Point) -> &[u8];
}

/// Whole-buffer input.
pub struct SliceInput<'a> {
    bytes: &'a [u8],
}

impl<'a> SliceInput<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }
}

impl TextInput for SliceInput<'_> {
    fn read(&mut self, byte: usize, _point: Point) -> &[u8] {
        &self.bytes[byte.min(self.bytes.len())..]
    }
}

/// Callback input: the closure is handed a byte offset and its point and
/// returns the chunk of text starting there (empty when past the end).
pub struct CallbackInput<F> {
    callback: F,
    buffer: Vec<u8>,
}

impl<F> CallbackInput<F>
where
    F: FnMut(usize, Point) -> Vec<u8>,
{
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            buffer: Vec::new(),
        }
    }
}

impl<F> TextInput for CallbackInput<F>
where
    F: FnMut(usize, Point) -> Vec<u8>,
{
    fn read(&mut self, byte: usize, point: Point) -> &[u8] {
        self.buffer = (self.callback)(byte, point);
        &self.buffer
    }
}
