//! Parsed (but unresolved) pattern syntax.
//!
//! The parser produces one [`PatternAst`] per top-level pattern; the
//! compiler resolves names against a [`salix_core::Language`] and lowers
//! the tree into matchable steps.

/// How many times a step may consume, before capture folding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Quant {
    One,
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
}

#[derive(Debug, Clone)]
pub(crate) struct PatternAst {
    pub root: ItemAst,
    pub predicates: Vec<PredicateAst>,
    /// Byte span of the whole pattern in the query source.
    pub start: usize,
    pub end: usize,
}

/// One pattern item: an expression plus the decorations that attach to it
/// from the outside (field prefix, quantifiers, captures, a leading anchor).
#[derive(Debug, Clone)]
pub(crate) struct ItemAst {
    pub expr: ExprAst,
    pub field: Option<(String, usize)>,
    pub quant: Quant,
    pub anchor_before: bool,
    pub captures: Vec<(String, usize)>,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone)]
pub(crate) enum ExprAst {
    /// Bare `_`: matches any node, named or anonymous.
    AnyNode,
    /// `(kind ...)`, `(_ ...)` when `kind` is `None`, or
    /// `(supertype/subtype ...)`.
    Node {
        kind: Option<(String, usize)>,
        subtype: Option<(String, usize)>,
        children: Vec<ItemAst>,
        negated_fields: Vec<(String, usize)>,
        anchor_end: bool,
    },
    /// A quoted literal: `"+"`.
    Anon { value: String },
    /// `[...]`: any branch may match.
    Alternation { branches: Vec<ItemAst> },
    /// `(... ...)` grouping several sibling items.
    Siblings {
        children: Vec<ItemAst>,
        anchor_end: bool,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct PredicateAst {
    /// Operator name including its trailing `?` or `!`.
    pub operator: String,
    pub args: Vec<PredArgAst>,
    pub start: usize,
}

#[derive(Debug, Clone)]
pub(crate) enum PredArgAst {
    Capture { name: String, offset: usize },
    Literal { value: String, offset: usize },
}
