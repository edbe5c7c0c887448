//! Incremental parsing: lexer, LR parser, and syntax trees.
//!
//! A [`Parser`] drives a [`salix_core::Language`]'s tables over a text
//! source and produces an immutable [`Tree`]. Trees are cheap to clone,
//! record edits, and let the next parse reuse unchanged subtrees.

mod cursor;
mod input;
mod lexer;
mod node;
mod parser;
mod tree;

#[cfg(test)]
mod test_grammars;

#[cfg(test)]
mod parser_tests;

pub use cursor::TreeCursor;
pub use input::{CallbackInput, SliceInput, TextInput};
pub use lexer::{Lexer, Scanned};
pub use node::Node;
pub use parser::{
    IncludedRangesError, LogType, Logger, ParseOptions, ParseProgress, Parser, Scanner,
};
pub use tree::Tree;

pub use salix_core::{InputEdit, Language, Point, Range};
