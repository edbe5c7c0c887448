//! Programmatic grammar assembly.
//!
//! The builder assembles the same tables an artifact would carry. It does
//! not generate parse tables from a grammar definition; callers supply
//! states directly (typically emitted by an external table generator).

use std::collections::HashMap;
use std::num::NonZeroU16;

use crate::language::Language;

use super::binary::LANGUAGE_VERSION;
use super::raw::RawNode;
use super::types::{
    FieldId, LanguageData, LexState, NodeKind, ParseAction, ParseState, StateId, SymbolId,
};

/// Errors detected while assembling a grammar.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BuildError {
    #[error("symbol {0} out of range (have {1} node kinds)")]
    SymbolOutOfRange(SymbolId, usize),

    #[error("parse state {0} references lex state {1} which does not exist")]
    LexStateOutOfRange(StateId, u16),

    #[error("parse state {0} references parse state {1} which does not exist")]
    StateOutOfRange(StateId, StateId),

    #[error("grammar has no parse states")]
    NoStates,
}

/// Assembles a [`Language`] from explicit tables.
#[derive(Debug, Default)]
pub struct LanguageBuilder {
    name: String,
    node_kinds: Vec<NodeKind>,
    kind_lookup: HashMap<(String, bool), SymbolId>,
    field_names: Vec<String>,
    field_lookup: HashMap<String, FieldId>,
    extras: Vec<SymbolId>,
    supertypes: Vec<(SymbolId, Vec<SymbolId>)>,
    externals: Vec<SymbolId>,
    lex_states: Vec<LexState>,
    parse_states: Vec<ParseState>,
}

impl LanguageBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        let mut builder = Self {
            name: name.into(),
            ..Self::default()
        };
        // Symbol 0 is reserved for end-of-input.
        builder.node_kinds.push(NodeKind {
            name: "end".to_string(),
            named: false,
            visible: false,
        });
        builder
    }

    fn intern_kind(&mut self, name: &str, named: bool, visible: bool) -> SymbolId {
        if let Some(&id) = self.kind_lookup.get(&(name.to_string(), named)) {
            return id;
        }
        let id = self.node_kinds.len() as SymbolId;
        self.node_kinds.push(NodeKind {
            name: name.to_string(),
            named,
            visible,
        });
        self.kind_lookup.insert((name.to_string(), named), id);
        id
    }

    /// Register an anonymous terminal (a literal token).
    pub fn token(&mut self, name: &str) -> SymbolId {
        self.intern_kind(name, false, true)
    }

    /// Register a named rule. Rules whose name starts with `_` are hidden:
    /// their children splice into the parent node.
    pub fn rule(&mut self, name: &str) -> SymbolId {
        let visible = !name.starts_with('_');
        self.intern_kind(name, true, visible)
    }

    /// Register a named terminal (e.g. `identifier`).
    pub fn named_token(&mut self, name: &str) -> SymbolId {
        self.intern_kind(name, true, true)
    }

    pub fn field(&mut self, name: &str) -> FieldId {
        if let Some(&id) = self.field_lookup.get(name) {
            return id;
        }
        self.field_names.push(name.to_string());
        let id = NonZeroU16::new(self.field_names.len() as u16).expect("field ids start at 1");
        self.field_lookup.insert(name.to_string(), id);
        id
    }

    /// Mark a symbol as an extra, allowed to appear anywhere.
    pub fn extra(&mut self, symbol: SymbolId) -> &mut Self {
        if !self.extras.contains(&symbol) {
            self.extras.push(symbol);
        }
        self
    }

    pub fn supertype(&mut self, symbol: SymbolId, subtypes: Vec<SymbolId>) -> &mut Self {
        self.supertypes.push((symbol, subtypes));
        self
    }

    /// Mark a terminal as produced by an external scanner.
    pub fn external(&mut self, symbol: SymbolId) -> &mut Self {
        if !self.externals.contains(&symbol) {
            self.externals.push(symbol);
        }
        self
    }

    pub fn lex_state(&mut self, state: LexState) -> u16 {
        self.lex_states.push(state);
        (self.lex_states.len() - 1) as u16
    }

    /// Append a parse state, returning its id. Actions and gotos are
    /// sorted here so lookups can binary search.
    pub fn parse_state(&mut self, mut state: ParseState) -> StateId {
        state.actions.sort_by_key(|(sym, _)| *sym);
        state.gotos.sort_by_key(|(sym, _)| *sym);
        self.parse_states.push(state);
        (self.parse_states.len() - 1) as StateId
    }

    /// Fold `node-types.json` metadata into the vocabulary: extras,
    /// supertypes, and field names not yet registered.
    pub fn apply_node_types(&mut self, raw_nodes: &[RawNode]) {
        for raw in raw_nodes {
            let Some(&id) = self
                .kind_lookup
                .get(&(raw.type_name.clone(), raw.named))
            else {
                continue;
            };

            if raw.extra {
                self.extra(id);
            }
            if let Some(subtypes) = &raw.subtypes {
                let subs: Vec<SymbolId> = subtypes
                    .iter()
                    .filter_map(|t| {
                        self.kind_lookup.get(&(t.type_name.clone(), t.named)).copied()
                    })
                    .collect();
                if !subs.is_empty() {
                    self.supertype(id, subs);
                }
            }
            for field_name in raw.fields.keys() {
                self.field(field_name);
            }
        }
    }

    /// Validate cross-references and produce the immutable [`Language`].
    pub fn build(mut self) -> Result<Language, BuildError> {
        if self.parse_states.is_empty() {
            return Err(BuildError::NoStates);
        }

        let error_symbol = self.intern_kind("ERROR", true, true);
        let kind_count = self.node_kinds.len();
        let lex_count = self.lex_states.len();
        let state_count = self.parse_states.len();

        for (idx, state) in self.parse_states.iter().enumerate() {
            let id = idx as StateId;
            if state.lex_state as usize >= lex_count {
                return Err(BuildError::LexStateOutOfRange(id, state.lex_state));
            }
            for (sym, action) in &state.actions {
                if *sym as usize >= kind_count {
                    return Err(BuildError::SymbolOutOfRange(*sym, kind_count));
                }
                match action {
                    ParseAction::Shift(next) if *next as usize >= state_count => {
                        return Err(BuildError::StateOutOfRange(id, *next));
                    }
                    ParseAction::Reduce { symbol, .. } if *symbol as usize >= kind_count => {
                        return Err(BuildError::SymbolOutOfRange(*symbol, kind_count));
                    }
                    _ => {}
                }
            }
            for (sym, next) in &state.gotos {
                if *sym as usize >= kind_count {
                    return Err(BuildError::SymbolOutOfRange(*sym, kind_count));
                }
                if *next as usize >= state_count {
                    return Err(BuildError::StateOutOfRange(id, *next));
                }
            }
        }

        let data = LanguageData {
            name: self.name,
            abi_version: LANGUAGE_VERSION,
            node_kinds: self.node_kinds,
            field_names: self.field_names,
            extras: self.extras,
            supertypes: self.supertypes,
            externals: self.externals,
            error_symbol,
            lex_states: self.lex_states,
            parse_states: self.parse_states,
        };
        Ok(Language::from_data(data))
    }
}
