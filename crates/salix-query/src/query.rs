//! A compiled query: a set of patterns, a capture table, and the
//! compile-time analyses over them.

use indexmap::IndexSet;
use salix_core::Language;

use crate::compile::{self, CompiledPattern};
use crate::error::{QueryError, QueryErrorKind};
use crate::parser;

/// How many times a capture may bind within a single match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureQuantifier {
    Zero,
    ZeroOrOne,
    ZeroOrMore,
    One,
    OneOrMore,
}

/// A predicate the engine does not interpret, preserved for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPredicate {
    pub operator: Box<str>,
    pub args: Vec<QueryPredicateArg>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPredicateArg {
    /// A capture id, resolvable through [`Query::capture_names`].
    Capture(u32),
    String(Box<str>),
}

/// A key/value attached to a pattern by `#set!`, `#is?`, or `#is-not?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryProperty {
    pub key: Box<str>,
    pub value: Option<Box<str>>,
    pub capture_id: Option<u32>,
}

/// A compiled set of patterns, immutable apart from the enable/disable
/// switches. Shareable across threads; each thread drives its own cursor.
#[derive(Debug)]
pub struct Query {
    language: Language,
    patterns: Vec<CompiledPattern>,
    capture_names: IndexSet<String>,
    capture_enabled: Vec<bool>,
}

impl Query {
    /// Compiles pattern source against a language.
    pub fn new(language: &Language, source: &str) -> Result<Query, QueryError> {
        let asts = parser::parse(source)?;
        let mut capture_names = IndexSet::new();
        let mut patterns = Vec::with_capacity(asts.len());
        for ast in &asts {
            patterns.push(compile::compile(language, ast, &mut capture_names)?);
        }
        // Quantifier tables were sized while captures were still being
        // discovered; pad them all to the final capture count.
        for pattern in &mut patterns {
            pattern
                .quantifiers
                .resize(capture_names.len(), CaptureQuantifier::Zero);
        }
        let capture_enabled = vec![true; capture_names.len()];
        Ok(Query {
            language: language.clone(),
            patterns,
            capture_names,
            capture_enabled,
        })
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Capture names in id order.
    pub fn capture_names(&self) -> Vec<&str> {
        self.capture_names.iter().map(String::as_str).collect()
    }

    pub fn capture_index_for_name(&self, name: &str) -> Option<u32> {
        self.capture_names.get_index_of(name).map(|i| i as u32)
    }

    /// Per-capture quantifiers for one pattern, indexed by capture id.
    /// Captures the pattern never binds report `Zero`.
    pub fn capture_quantifiers(&self, pattern: usize) -> &[CaptureQuantifier] {
        &self.patterns[pattern].quantifiers
    }

    pub fn general_predicates(&self, pattern: usize) -> &[QueryPredicate] {
        &self.patterns[pattern].general_predicates
    }

    pub fn property_settings(&self, pattern: usize) -> &[QueryProperty] {
        &self.patterns[pattern].property_settings
    }

    /// `#is?`/`#is-not?` assertions; the flag is `true` for `#is?`.
    pub fn property_predicates(&self, pattern: usize) -> &[(QueryProperty, bool)] {
        &self.patterns[pattern].property_predicates
    }

    pub fn start_byte_for_pattern(&self, pattern: usize) -> Option<usize> {
        self.patterns.get(pattern).map(|p| p.start_byte)
    }

    pub fn end_byte_for_pattern(&self, pattern: usize) -> Option<usize> {
        self.patterns.get(pattern).map(|p| p.end_byte)
    }

    /// Whether every match of the pattern is contained in one top-level
    /// node.
    pub fn is_pattern_rooted(&self, pattern: usize) -> bool {
        self.patterns[pattern].rooted
    }

    /// Whether a match can span multiple adjacent siblings with no
    /// enclosing node of its own.
    pub fn is_pattern_non_local(&self, pattern: usize) -> bool {
        self.patterns[pattern].non_local
    }

    /// Whether a partial match that has reached the step at `byte_offset`
    /// is guaranteed to complete.
    pub fn is_pattern_guaranteed_at_step(&self, byte_offset: usize) -> bool {
        let Some(pattern) = self
            .patterns
            .iter()
            .find(|p| p.start_byte <= byte_offset && byte_offset < p.end_byte)
        else {
            return false;
        };
        if !pattern.text_predicates.is_empty() || !pattern.general_predicates.is_empty() {
            return false;
        }
        pattern
            .steps
            .iter()
            .filter(|step| step.offset > byte_offset)
            .all(|step| step.optional)
    }

    /// Stops reporting a capture. Matching still runs; the capture is
    /// dropped from results.
    pub fn disable_capture(&mut self, name: &str) {
        if let Some(i) = self.capture_names.get_index_of(name) {
            self.capture_enabled[i] = false;
        }
    }

    /// Stops matching a pattern entirely.
    pub fn disable_pattern(&mut self, index: usize) -> Result<(), QueryError> {
        let Some(pattern) = self.patterns.get_mut(index) else {
            return Err(QueryError::new(
                index,
                QueryErrorKind::PatternIndex,
                format!("pattern index {index} out of range"),
            ));
        };
        pattern.enabled = false;
        Ok(())
    }

    pub(crate) fn patterns(&self) -> &[CompiledPattern] {
        &self.patterns
    }

    pub(crate) fn capture_is_enabled(&self, id: u32) -> bool {
        self.capture_enabled[id as usize]
    }
}
