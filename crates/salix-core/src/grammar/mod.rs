//! Compiled grammar tables.
//!
//! A grammar arrives as data: node-kind and field vocabularies, lex tables,
//! and an LR action/goto table. This module defines the table types, their
//! binary artifact framing, programmatic construction, and ingestion of
//! `node-types.json` metadata.

mod binary;
mod builder;
mod raw;
mod types;

#[cfg(test)]
mod binary_tests;
#[cfg(test)]
mod builder_tests;

pub use binary::{ArtifactError, LANGUAGE_VERSION, MIN_COMPATIBLE_VERSION};
pub use builder::{BuildError, LanguageBuilder};
pub use raw::{parse_node_types, RawCardinality, RawNode, RawTypeRef};
pub use types::{
    FieldId, LanguageData, LexPattern, LexRule, LexState, NodeKind, ParseAction, ParseState,
    StateId, SymbolId, SYM_END,
};
