//! Structured query-compilation errors.
//!
//! Every error carries the byte offset of the offending construct in the
//! pattern source, so tooling can point at the exact spot.

use thiserror::Error;

/// What went wrong while compiling or mutating a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Malformed pattern syntax.
    Syntax,
    /// A node kind the language does not define.
    NodeKind,
    /// A field name the language does not define.
    Field,
    /// A predicate argument referencing an unknown capture.
    Capture,
    /// A predicate with bad arity, argument types, or an invalid regex.
    Predicate,
    /// A pattern shape the engine does not support.
    Structure,
    /// A pattern index out of range.
    PatternIndex,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("query error at offset {offset}: {message}")]
pub struct QueryError {
    /// Byte offset into the pattern source (or the pattern index for
    /// [`QueryErrorKind::PatternIndex`]).
    pub offset: usize,
    pub kind: QueryErrorKind,
    pub message: String,
}

impl QueryError {
    pub(crate) fn new(offset: usize, kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Self {
            offset,
            kind,
            message: message.into(),
        }
    }
}
