//! Grammar table type definitions.

use std::num::NonZeroU16;

use serde::{Deserialize, Serialize};

/// Symbol ID: index into the node-kind table. Terminals and nonterminals
/// share one namespace.
pub type SymbolId = u16;

/// Field ID: 1-based index into the field-name table.
pub type FieldId = NonZeroU16;

/// Parse state ID: index into the parse-state table. State 0 is the start
/// state.
pub type StateId = u16;

/// The reserved end-of-input symbol.
pub const SYM_END: SymbolId = 0;

/// One entry in the node-kind vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeKind {
    pub name: String,
    /// Named kinds correspond to grammar rules; anonymous kinds are
    /// literal tokens.
    pub named: bool,
    /// Invisible kinds are spliced out of the tree: their children attach
    /// directly to the parent.
    pub visible: bool,
}

/// A lexical pattern, matched greedily against source bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LexPattern {
    /// Exact byte sequence.
    Literal(String),
    /// A run of characters drawn from inclusive ranges.
    ///
    /// Matches at least `min` characters; with `many`, extends as far as
    /// possible.
    Chars {
        ranges: Vec<(char, char)>,
        min: u32,
        many: bool,
    },
    /// Patterns matched back to back.
    Seq(Vec<LexPattern>),
}

/// A lex rule: pattern plus the terminal symbol it produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexRule {
    pub pattern: LexPattern,
    pub symbol: SymbolId,
}

impl LexRule {
    pub fn literal(symbol: SymbolId, text: impl Into<String>) -> Self {
        Self {
            pattern: LexPattern::Literal(text.into()),
            symbol,
        }
    }

    /// One-or-more characters from `ranges`.
    pub fn chars(symbol: SymbolId, ranges: Vec<(char, char)>) -> Self {
        Self {
            pattern: LexPattern::Chars {
                ranges,
                min: 1,
                many: true,
            },
            symbol,
        }
    }

    pub fn seq(symbol: SymbolId, patterns: Vec<LexPattern>) -> Self {
        Self {
            pattern: LexPattern::Seq(patterns),
            symbol,
        }
    }
}

/// Lex rules valid in one lexer state.
///
/// Longest match wins; ties break toward the earlier rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexState {
    pub rules: Vec<LexRule>,
}

/// An LR parse action for one (state, terminal) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseAction {
    Shift(StateId),
    Reduce {
        symbol: SymbolId,
        child_count: u16,
        /// Raw field id per child, 0 for none. May be shorter than
        /// `child_count`; missing entries mean no field.
        fields: Vec<u16>,
    },
    Accept,
}

/// One LR automaton state.
///
/// `actions` and `gotos` are sorted by symbol for binary search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseState {
    pub actions: Vec<(SymbolId, ParseAction)>,
    pub gotos: Vec<(SymbolId, StateId)>,
    /// Which lex table drives tokenization in this state.
    pub lex_state: u16,
}

impl ParseState {
    pub fn action(&self, symbol: SymbolId) -> Option<&ParseAction> {
        self.actions
            .binary_search_by_key(&symbol, |(sym, _)| *sym)
            .ok()
            .map(|idx| &self.actions[idx].1)
    }

    pub fn goto(&self, symbol: SymbolId) -> Option<StateId> {
        self.gotos
            .binary_search_by_key(&symbol, |(sym, _)| *sym)
            .ok()
            .map(|idx| self.gotos[idx].1)
    }

    /// Terminals this state can shift, in table order.
    pub fn shiftable_terminals(&self) -> impl Iterator<Item = (SymbolId, StateId)> + '_ {
        self.actions.iter().filter_map(|(sym, action)| match action {
            ParseAction::Shift(next) => Some((*sym, *next)),
            _ => None,
        })
    }
}

/// The serialized form of a compiled grammar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageData {
    /// Grammar name (e.g. "javascript").
    pub name: String,
    /// Table format version the grammar was built against.
    pub abi_version: u16,
    /// Node kinds, index = symbol id. Entry 0 is the reserved end symbol.
    pub node_kinds: Vec<NodeKind>,
    /// Field names, index + 1 = field id.
    pub field_names: Vec<String>,
    /// Symbols allowed to appear anywhere (comments, whitespace).
    pub extras: Vec<SymbolId>,
    /// Supertype symbol -> concrete subtype symbols.
    pub supertypes: Vec<(SymbolId, Vec<SymbolId>)>,
    /// Terminals produced by an external scanner rather than the lex table.
    pub externals: Vec<SymbolId>,
    /// The built-in ERROR node kind.
    pub error_symbol: SymbolId,
    pub lex_states: Vec<LexState>,
    pub parse_states: Vec<ParseState>,
}
