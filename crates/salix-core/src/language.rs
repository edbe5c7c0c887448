//! The immutable, shareable [`Language`] handle.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::grammar::{
    ArtifactError, FieldId, LanguageData, LexState, ParseState, StateId, SymbolId,
};

pub use crate::grammar::{LANGUAGE_VERSION, MIN_COMPATIBLE_VERSION};

/// Errors loading or installing a language.
#[derive(Debug, thiserror::Error)]
pub enum LanguageError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("failed to read grammar artifact: {0}")]
    Io(#[from] std::io::Error),
}

struct Inner {
    data: LanguageData,
    kind_lookup: HashMap<(String, bool), SymbolId>,
    field_lookup: HashMap<String, FieldId>,
}

/// An immutable compiled grammar.
///
/// Cheap to clone (`Arc` internally) and safe to share read-only across
/// threads; each thread drives its own parser or query cursor against it.
#[derive(Clone)]
pub struct Language {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Language")
            .field("name", &self.inner.data.name)
            .field("node_kinds", &self.inner.data.node_kinds.len())
            .field("parse_states", &self.inner.data.parse_states.len())
            .finish()
    }
}

impl Language {
    /// Wrap raw tables, building the name lookup maps.
    pub fn from_data(data: LanguageData) -> Self {
        let mut kind_lookup = HashMap::new();
        for (idx, kind) in data.node_kinds.iter().enumerate() {
            kind_lookup
                .entry((kind.name.clone(), kind.named))
                .or_insert(idx as SymbolId);
        }
        let mut field_lookup = HashMap::new();
        for (idx, name) in data.field_names.iter().enumerate() {
            let id = FieldId::new((idx + 1) as u16).expect("field ids start at 1");
            field_lookup.entry(name.clone()).or_insert(id);
        }
        Self {
            inner: Arc::new(Inner {
                data,
                kind_lookup,
                field_lookup,
            }),
        }
    }

    /// Load from a binary grammar artifact.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LanguageError> {
        Ok(Self::from_data(LanguageData::from_artifact(bytes)?))
    }

    /// Load from a grammar artifact on disk (memory-mapped).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LanguageError> {
        let file = std::fs::File::open(path)?;
        // Safety: the map is read before return and not retained; callers
        // are expected not to truncate grammar artifacts mid-load.
        let map = unsafe { memmap2::Mmap::map(&file)? };
        Self::from_bytes(&map)
    }

    /// Serialize to the binary artifact format.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.inner.data.to_artifact()
    }

    pub fn name(&self) -> &str {
        &self.inner.data.name
    }

    /// Table format version this grammar was built against.
    pub fn abi_version(&self) -> u16 {
        self.inner.data.abi_version
    }

    /// Check this grammar's table format against the supported range.
    pub fn check_compatible(&self) -> Result<(), LanguageError> {
        let found = self.inner.data.abi_version;
        if !(MIN_COMPATIBLE_VERSION..=LANGUAGE_VERSION).contains(&found) {
            return Err(ArtifactError::IncompatibleVersion { found }.into());
        }
        Ok(())
    }

    /// Number of node kinds, including the reserved end and ERROR kinds.
    pub fn node_kind_count(&self) -> usize {
        self.inner.data.node_kinds.len()
    }

    pub fn node_kind_for_id(&self, id: SymbolId) -> Option<&str> {
        self.inner
            .data
            .node_kinds
            .get(id as usize)
            .map(|k| k.name.as_str())
    }

    pub fn id_for_node_kind(&self, name: &str, named: bool) -> Option<SymbolId> {
        self.inner
            .kind_lookup
            .get(&(name.to_string(), named))
            .copied()
    }

    pub fn node_kind_is_named(&self, id: SymbolId) -> bool {
        self.inner
            .data
            .node_kinds
            .get(id as usize)
            .is_some_and(|k| k.named)
    }

    pub fn node_kind_is_visible(&self, id: SymbolId) -> bool {
        self.inner
            .data
            .node_kinds
            .get(id as usize)
            .is_some_and(|k| k.visible)
    }

    pub fn field_count(&self) -> usize {
        self.inner.data.field_names.len()
    }

    pub fn field_name_for_id(&self, id: FieldId) -> Option<&str> {
        self.inner
            .data
            .field_names
            .get(id.get() as usize - 1)
            .map(|s| s.as_str())
    }

    pub fn field_id_for_name(&self, name: &str) -> Option<FieldId> {
        self.inner.field_lookup.get(name).copied()
    }

    pub fn is_extra(&self, id: SymbolId) -> bool {
        self.inner.data.extras.contains(&id)
    }

    pub fn extras(&self) -> &[SymbolId] {
        &self.inner.data.extras
    }

    pub fn node_kind_is_supertype(&self, id: SymbolId) -> bool {
        self.inner.data.supertypes.iter().any(|(sym, _)| *sym == id)
    }

    pub fn subtypes_for_supertype(&self, id: SymbolId) -> &[SymbolId] {
        self.inner
            .data
            .supertypes
            .iter()
            .find(|(sym, _)| *sym == id)
            .map(|(_, subs)| subs.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_external(&self, id: SymbolId) -> bool {
        self.inner.data.externals.contains(&id)
    }

    pub fn error_symbol(&self) -> SymbolId {
        self.inner.data.error_symbol
    }

    pub fn parse_state(&self, id: StateId) -> &ParseState {
        &self.inner.data.parse_states[id as usize]
    }

    pub fn parse_state_count(&self) -> usize {
        self.inner.data.parse_states.len()
    }

    pub fn lex_state(&self, id: u16) -> &LexState {
        &self.inner.data.lex_states[id as usize]
    }

    /// Two handles are the same language iff they share storage.
    pub fn ptr_eq(&self, other: &Language) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
