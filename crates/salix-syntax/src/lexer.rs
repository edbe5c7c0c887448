//! Table-driven lexer.
//!
//! The lexer matches the current parse state's lex rules greedily against
//! the input, tracking byte offsets and points together. It never stalls:
//! when no rule matches, it reports an invalid fragment covering at least
//! one character so the parser always makes forward progress.
//!
//! Included ranges confine scanning: bytes outside the ranges are skipped,
//! but token coordinates stay faithful to the whole document.

use salix_core::{LexPattern, LexState, Point, Range, SymbolId};

use crate::input::TextInput;

/// Result of one scan step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scanned {
    /// A terminal matched.
    Token { symbol: SymbolId, range: Range },
    /// No rule matched; the range covers the skipped fragment.
    Invalid { range: Range },
    /// End of input (or of the last included range).
    End { byte: usize, point: Point },
}

/// Streaming lexer over a [`TextInput`].
///
/// Maintains a byte window copied from the input so the source never needs
/// to be contiguous in memory.
pub struct Lexer<'a> {
    input: &'a mut dyn TextInput,
    window: Vec<u8>,
    window_start: usize,
    /// Point at the end of the window, passed to the input callback.
    window_end_point: Point,
    exhausted: bool,

    pos: usize,
    point: Point,

    ranges: Vec<Range>,
    range_idx: usize,
}

fn advance_point_over(mut point: Point, bytes: &[u8]) -> Point {
    for &b in bytes {
        if b == b'\n' {
            point.row += 1;
            point.column = 0;
        } else {
            point.column += 1;
        }
    }
    point
}

fn utf8_len(first: u8) -> usize {
    match first {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => 1,
    }
}

impl<'a> Lexer<'a> {
    /// Create a lexer confined to `ranges` (pass a single
    /// [`Range::everything`] for whole-document parsing).
    pub fn new(input: &'a mut dyn TextInput, ranges: Vec<Range>) -> Self {
        debug_assert!(!ranges.is_empty());
        Self {
            input,
            window: Vec::new(),
            window_start: 0,
            window_end_point: Point::ZERO,
            exhausted: false,
            pos: 0,
            point: Point::ZERO,
            ranges,
            range_idx: 0,
        }
    }

    #[inline]
    pub fn position(&self) -> (usize, Point) {
        (self.pos, self.point)
    }

    /// Jump to an absolute position. Used after adopting a reused subtree.
    pub fn seek(&mut self, byte: usize, point: Point) {
        if byte < self.window_start || byte > self.window_start + self.window.len() {
            self.window.clear();
            self.window_start = byte;
            self.window_end_point = point;
            self.exhausted = false;
        }
        self.pos = byte;
        self.point = point;
        self.range_idx = self
            .ranges
            .iter()
            .position(|r| byte < r.end_byte)
            .unwrap_or(self.ranges.len());
    }

    /// Make sure `offset` is inside the window. Returns false at EOF.
    fn ensure(&mut self, offset: usize) -> bool {
        debug_assert!(offset >= self.window_start);
        while self.window_start + self.window.len() <= offset {
            if self.exhausted {
                return false;
            }
            let end = self.window_start + self.window.len();
            let point = self.window_end_point;
            let chunk = self.input.read(end, point);
            if chunk.is_empty() {
                self.exhausted = true;
                return false;
            }
            self.window_end_point = advance_point_over(point, chunk);
            self.window.extend_from_slice(chunk);
        }
        true
    }

    /// Decode the character at `offset`. Invalid UTF-8 decodes as one
    /// replacement character per byte.
    fn char_at(&mut self, offset: usize) -> Option<(char, usize)> {
        if !self.ensure(offset) {
            return None;
        }
        let first = self.window[offset - self.window_start];
        let len = utf8_len(first);
        for i in 1..len {
            if !self.ensure(offset + i) {
                return Some((char::REPLACEMENT_CHARACTER, 1));
            }
        }
        let start = offset - self.window_start;
        let bytes = &self.window[start..start + len];
        match std::str::from_utf8(bytes) {
            Ok(s) => s.chars().next().map(|c| (c, len)),
            Err(_) => Some((char::REPLACEMENT_CHARACTER, 1)),
        }
    }

    /// Current lookahead character. External scanners use this together
    /// with [`Self::advance`].
    pub fn lookahead(&mut self) -> Option<char> {
        if !self.in_included_range() {
            return None;
        }
        self.char_at(self.pos).map(|(c, _)| c)
    }

    /// Consume one character, keeping byte and point coordinates in sync.
    pub fn advance(&mut self) {
        if let Some((c, len)) = self.char_at(self.pos) {
            if c == '\n' {
                self.point.row += 1;
                self.point.column = 0;
            } else {
                self.point.column += len;
            }
            self.pos += len;
        }
    }

    /// Skip ahead to the next included range if the position fell in a
    /// gap. Returns false when all ranges are exhausted.
    fn skip_to_included_range(&mut self) -> bool {
        loop {
            let Some(range) = self.ranges.get(self.range_idx) else {
                return false;
            };
            if self.pos < range.start_byte {
                self.pos = range.start_byte;
                self.point = range.start_point;
            }
            if self.pos >= range.end_byte {
                self.range_idx += 1;
                continue;
            }
            return true;
        }
    }

    fn in_included_range(&mut self) -> bool {
        self.skip_to_included_range()
    }

    /// Match one pattern starting at `start`, not crossing `limit`.
    /// Returns the end offset of the match.
    fn match_pattern(&mut self, pattern: &LexPattern, start: usize, limit: usize) -> Option<usize> {
        match pattern {
            LexPattern::Literal(text) => {
                let bytes = text.as_bytes();
                if start + bytes.len() > limit {
                    return None;
                }
                for (i, &b) in bytes.iter().enumerate() {
                    if !self.ensure(start + i) {
                        return None;
                    }
                    if self.window[start + i - self.window_start] != b {
                        return None;
                    }
                }
                Some(start + bytes.len())
            }
            LexPattern::Chars { ranges, min, many } => {
                let mut pos = start;
                let mut count: u32 = 0;
                loop {
                    if pos >= limit {
                        break;
                    }
                    let Some((c, len)) = self.char_at(pos) else {
                        break;
                    };
                    if pos + len > limit {
                        break;
                    }
                    if !ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi) {
                        break;
                    }
                    pos += len;
                    count += 1;
                    if !*many && count >= *min {
                        break;
                    }
                }
                (count >= *min).then_some(pos)
            }
            LexPattern::Seq(patterns) => {
                let mut pos = start;
                for pattern in patterns {
                    pos = self.match_pattern(pattern, pos, limit)?;
                }
                Some(pos)
            }
        }
    }

    /// Scan the next token under `lex_state`.
    ///
    /// Longest match wins, ties break toward the earlier rule. Zero-width
    /// matches are discarded so the lexer always advances.
    pub fn scan(&mut self, lex_state: &LexState) -> Scanned {
        if !self.skip_to_included_range() {
            return Scanned::End {
                byte: self.pos,
                point: self.point,
            };
        }
        if !self.ensure(self.pos) {
            return Scanned::End {
                byte: self.pos,
                point: self.point,
            };
        }

        let limit = self.ranges[self.range_idx].end_byte;
        let start = self.pos;
        let start_point = self.point;

        let mut best: Option<(usize, SymbolId)> = None;
        for rule in &lex_state.rules {
            if let Some(end) = self.match_pattern(&rule.pattern, start, limit) {
                if end > start && best.is_none_or(|(best_end, _)| end > best_end) {
                    best = Some((end, rule.symbol));
                }
            }
        }

        match best {
            Some((end, symbol)) => {
                let bytes = &self.window[start - self.window_start..end - self.window_start];
                let end_point = advance_point_over(start_point, bytes);
                self.pos = end;
                self.point = end_point;
                Scanned::Token {
                    symbol,
                    range: Range::new(start, end, start_point, end_point),
                }
            }
            None => {
                // Guaranteed forward progress: consume one character.
                self.advance();
                if self.pos == start {
                    // ensure() said a byte exists, so advance always moves;
                    // belt and braces against a stuck position.
                    self.pos = start + 1;
                    self.point.column += 1;
                }
                Scanned::Invalid {
                    range: Range::new(start, self.pos, start_point, self.point),
                }
            }
        }
    }
}
