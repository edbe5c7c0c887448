//! Core data structures for the Salix parsing engine.
//!
//! Two layers:
//! - **Value types**: positions, ranges, and edits in a text buffer
//! - **Grammar layer**: the compiled [`Language`] artifact (node kinds,
//!   fields, lex tables, LR parse tables) shared read-only across parsers
//!
//! A `Language` is data, not code: it is deserialized from a binary
//! artifact or assembled programmatically with [`LanguageBuilder`].

mod language;
mod point;

pub mod grammar;


pub use grammar::{
    ArtifactError, FieldId, LexPattern, LexRule, LexState, ParseAction, ParseState, StateId,
    SymbolId, SYM_END,
};
pub use grammar::{BuildError, LanguageBuilder, LanguageData, NodeKind};
pub use language::{Language, LanguageError, LANGUAGE_VERSION, MIN_COMPATIBLE_VERSION};
pub use point::{InputEdit, Point, Range};
