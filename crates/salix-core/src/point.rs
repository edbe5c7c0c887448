//! Positions, ranges, and edits in a text buffer.
//!
//! Every location carries both a byte offset and a `(row, column)` point.
//! The two coordinate systems always move together; helpers here keep them
//! consistent when an edit shifts everything at or after its start.

use serde::{Deserialize, Serialize};

/// A zero-based `(row, column)` position in source text.
///
/// Columns count bytes within the row, matching byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub row: usize,
    pub column: usize,
}

impl Point {
    pub const ZERO: Point = Point { row: 0, column: 0 };

    #[inline]
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }

    /// Translate `self` by `delta`, where `delta` describes an extent that
    /// begins at `self`. If `delta` stays on one row the columns add;
    /// otherwise the new row wins the column.
    #[inline]
    pub fn offset_by(self, delta: Point) -> Point {
        if delta.row == 0 {
            Point::new(self.row, self.column + delta.column)
        } else {
            Point::new(self.row + delta.row, delta.column)
        }
    }

    /// Extent from `origin` to `self`. Inverse of [`Point::offset_by`].
    ///
    /// # Panics
    /// Panics in debug builds if `self < origin`.
    #[inline]
    pub fn extent_from(self, origin: Point) -> Point {
        debug_assert!(self >= origin);
        if self.row == origin.row {
            Point::new(0, self.column - origin.column)
        } else {
            Point::new(self.row - origin.row, self.column)
        }
    }
}

/// A span of source text in both coordinate systems.
///
/// Invariant: `start <= end` for bytes and points alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_point: Point,
    pub end_point: Point,
}

impl Range {
    pub fn new(start_byte: usize, end_byte: usize, start_point: Point, end_point: Point) -> Self {
        debug_assert!(start_byte <= end_byte);
        debug_assert!(start_point <= end_point);
        Self {
            start_byte,
            end_byte,
            start_point,
            end_point,
        }
    }

    /// The whole-document range.
    pub fn everything() -> Self {
        Self {
            start_byte: 0,
            end_byte: usize::MAX,
            start_point: Point::ZERO,
            end_point: Point::new(usize::MAX, usize::MAX),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start_byte == self.end_byte
    }

    #[inline]
    pub fn contains_byte(&self, byte: usize) -> bool {
        self.start_byte <= byte && byte < self.end_byte
    }

    #[inline]
    pub fn overlaps(&self, other: &Range) -> bool {
        self.start_byte < other.end_byte && other.start_byte < self.end_byte
    }

    /// Smallest range covering both `self` and `other`.
    pub fn cover(&self, other: &Range) -> Range {
        Range {
            start_byte: self.start_byte.min(other.start_byte),
            end_byte: self.end_byte.max(other.end_byte),
            start_point: self.start_point.min(other.start_point),
            end_point: self.end_point.max(other.end_point),
        }
    }
}

/// A single textual replacement.
///
/// The edit replaced `start..old_end` with text ending at `new_end`.
/// Apply edits to a tree one at a time, in the order they were applied to
/// the text, or incremental reuse is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEdit {
    pub start_byte: usize,
    pub old_end_byte: usize,
    pub new_end_byte: usize,
    pub start_point: Point,
    pub old_end_point: Point,
    pub new_end_point: Point,
}

impl InputEdit {
    /// Where a pre-edit byte offset lands after the edit.
    ///
    /// Offsets at or before the edit start are untouched (so a node that
    /// ends exactly where an insertion happens keeps its end); offsets at
    /// or past the old end shift by the edit's length delta; offsets
    /// inside the replaced span collapse to the new end.
    #[inline]
    pub fn transform_byte(&self, byte: usize) -> usize {
        if byte <= self.start_byte {
            byte
        } else if byte >= self.old_end_byte {
            byte - self.old_end_byte + self.new_end_byte
        } else {
            self.new_end_byte
        }
    }

    /// Where a pre-edit point lands after the edit. See [`Self::transform_byte`].
    #[inline]
    pub fn transform_point(&self, point: Point) -> Point {
        if point <= self.start_point {
            point
        } else if point >= self.old_end_point {
            self.new_end_point
                .offset_by(point.extent_from(self.old_end_point))
        } else {
            self.new_end_point
        }
    }

    /// The post-edit span whose lexical content changed.
    pub fn new_range(&self) -> Range {
        Range {
            start_byte: self.start_byte,
            end_byte: self.new_end_byte,
            start_point: self.start_point,
            end_point: self.new_end_point,
        }
    }
}

/// Apply a sequence of edits (oldest first) to a byte offset.
pub(crate) fn transform_byte_through(edits: &[InputEdit], byte: usize) -> usize {
    edits.iter().fold(byte, |b, e| e.transform_byte(b))
}

/// Apply a sequence of edits (oldest first) to a point.
pub(crate) fn transform_point_through(edits: &[InputEdit], point: Point) -> Point {
    edits.iter().fold(point, |p, e| e.transform_point(p))
}

impl Range {
    /// This range's coordinates after a sequence of edits.
    pub fn transform_through(&self, edits: &[InputEdit]) -> Range {
        Range {
            start_byte: transform_byte_through(edits, self.start_byte),
            end_byte: transform_byte_through(edits, self.end_byte),
            start_point: transform_point_through(edits, self.start_point),
            end_point: transform_point_through(edits, self.end_point),
        }
    }
}
