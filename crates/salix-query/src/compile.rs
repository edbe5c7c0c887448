//! Lowers parsed patterns into matchable steps against a concrete language.
//!
//! Name resolution (node kinds, fields, supertypes), capture-id assignment,
//! per-capture quantifier folding, predicate recognition, and the static
//! pattern analyses all happen here, once, at `Query::new` time.

use indexmap::IndexSet;
use regex_automata::dfa::dense;
use regex_automata::dfa::StartKind;
use salix_core::{FieldId, Language, SymbolId};

use crate::ast::{ExprAst, ItemAst, PatternAst, PredArgAst, PredicateAst, Quant};
use crate::error::{QueryError, QueryErrorKind};
use crate::query::{CaptureQuantifier, QueryPredicate, QueryPredicateArg, QueryProperty};

/// One resolved pattern step: an expression to match against a node plus
/// its field constraint, quantifier, captures, and sibling anchoring.
#[derive(Debug)]
pub(crate) struct Spec {
    pub expr: StepExpr,
    pub field: Option<FieldId>,
    pub quant: Quant,
    pub anchor_before: bool,
    pub captures: Vec<u32>,
}

#[derive(Debug)]
pub(crate) enum StepExpr {
    /// Bare `_`.
    AnyNode,
    /// A named node; `symbol` of `None` is the named wildcard `(_)`.
    /// `subtypes` is non-empty when the symbol is a supertype matched
    /// without an explicit subtype.
    Kind {
        symbol: Option<SymbolId>,
        subtypes: Vec<SymbolId>,
        children: Vec<Spec>,
        negated_fields: Vec<FieldId>,
        anchor_end: bool,
    },
    Anon {
        symbol: SymbolId,
    },
    Alternation {
        branches: Vec<Spec>,
    },
    /// A top-level sibling group; nested groups are limited to one child.
    Siblings {
        children: Vec<Spec>,
        anchor_end: bool,
    },
}

/// Text-comparison predicates evaluated by the cursor at match time.
#[derive(Debug)]
pub(crate) enum TextPredicate {
    EqCapture {
        left: u32,
        right: u32,
        positive: bool,
    },
    EqString {
        capture: u32,
        value: Box<str>,
        positive: bool,
    },
    AnyOfString {
        capture: u32,
        values: Vec<Box<str>>,
        positive: bool,
    },
    MatchesRegex {
        capture: u32,
        dfa: dense::DFA<Vec<u32>>,
        positive: bool,
    },
}

/// Source offset and optionality of one top-level step, for the
/// guaranteed-at-step analysis.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StepInfo {
    pub offset: usize,
    pub optional: bool,
}

#[derive(Debug)]
pub(crate) struct CompiledPattern {
    pub root: Spec,
    pub text_predicates: Vec<TextPredicate>,
    pub general_predicates: Vec<QueryPredicate>,
    pub property_settings: Vec<QueryProperty>,
    pub property_predicates: Vec<(QueryProperty, bool)>,
    /// Indexed by capture id; padded to the query's capture count.
    pub quantifiers: Vec<CaptureQuantifier>,
    pub start_byte: usize,
    pub end_byte: usize,
    pub rooted: bool,
    pub non_local: bool,
    pub enabled: bool,
    pub steps: Vec<StepInfo>,
}

pub(crate) fn compile(
    language: &Language,
    ast: &PatternAst,
    captures: &mut IndexSet<String>,
) -> Result<CompiledPattern, QueryError> {
    let mut compiler = Compiler { language, captures };
    let root = compiler.compile_item(&ast.root, 0)?;

    let rooted = !matches!(
        &root.expr,
        StepExpr::Siblings { children, .. } if children.len() > 1
    );
    let non_local = !rooted || matches!(ast.root.quant, Quant::ZeroOrMore | Quant::OneOrMore);

    let mut quantifiers = vec![Card::ZERO; compiler.captures.len()];
    accumulate_cards(&root, &mut quantifiers);
    let quantifiers = quantifiers.into_iter().map(Card::to_quantifier).collect();

    let mut text_predicates = Vec::new();
    let mut general_predicates = Vec::new();
    let mut property_settings = Vec::new();
    let mut property_predicates = Vec::new();
    for predicate in &ast.predicates {
        compile_predicate(
            predicate,
            compiler.captures,
            &mut text_predicates,
            &mut general_predicates,
            &mut property_settings,
            &mut property_predicates,
        )?;
    }

    Ok(CompiledPattern {
        steps: top_level_steps(&ast.root),
        root,
        text_predicates,
        general_predicates,
        property_settings,
        property_predicates,
        quantifiers,
        start_byte: ast.start,
        end_byte: ast.end,
        rooted,
        non_local,
        enabled: true,
    })
}

struct Compiler<'a> {
    language: &'a Language,
    captures: &'a mut IndexSet<String>,
}

impl Compiler<'_> {
    fn compile_item(&mut self, item: &ItemAst, depth: usize) -> Result<Spec, QueryError> {
        let expr = self.compile_expr(item, depth)?;

        let field = match &item.field {
            Some((name, offset)) => Some(self.resolve_field(name, *offset)?),
            None => None,
        };

        let mut captures = Vec::with_capacity(item.captures.len());
        for (name, _) in &item.captures {
            let (id, _) = self.captures.insert_full(name.clone());
            captures.push(id as u32);
        }

        Ok(Spec {
            expr,
            field,
            quant: item.quant,
            anchor_before: item.anchor_before,
            captures,
        })
    }

    fn compile_expr(&mut self, item: &ItemAst, depth: usize) -> Result<StepExpr, QueryError> {
        match &item.expr {
            ExprAst::AnyNode => Ok(StepExpr::AnyNode),
            ExprAst::Anon { value } => {
                let symbol = self
                    .language
                    .id_for_node_kind(value, false)
                    .ok_or_else(|| {
                        QueryError::new(
                            item.start,
                            QueryErrorKind::NodeKind,
                            format!("unknown token `{value}`"),
                        )
                    })?;
                Ok(StepExpr::Anon { symbol })
            }
            ExprAst::Node {
                kind,
                subtype,
                children,
                negated_fields,
                anchor_end,
            } => {
                let (symbol, subtypes) = self.resolve_kind(kind.as_ref(), subtype.as_ref())?;
                let children = children
                    .iter()
                    .map(|child| self.compile_item(child, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                let negated_fields = negated_fields
                    .iter()
                    .map(|(name, offset)| self.resolve_field(name, *offset))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(StepExpr::Kind {
                    symbol,
                    subtypes,
                    children,
                    negated_fields,
                    anchor_end: *anchor_end,
                })
            }
            ExprAst::Alternation { branches } => {
                let branches = branches
                    .iter()
                    .map(|branch| self.compile_item(branch, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(StepExpr::Alternation { branches })
            }
            ExprAst::Siblings {
                children,
                anchor_end,
            } => {
                if depth > 0 && children.len() > 1 {
                    return Err(QueryError::new(
                        item.start,
                        QueryErrorKind::Structure,
                        "sibling groups are only supported at the top level of a pattern",
                    ));
                }
                let children = children
                    .iter()
                    .map(|child| self.compile_item(child, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(StepExpr::Siblings {
                    children,
                    anchor_end: *anchor_end,
                })
            }
        }
    }

    fn resolve_kind(
        &self,
        kind: Option<&(String, usize)>,
        subtype: Option<&(String, usize)>,
    ) -> Result<(Option<SymbolId>, Vec<SymbolId>), QueryError> {
        let Some((name, offset)) = kind else {
            return Ok((None, Vec::new()));
        };
        let base = self.language.id_for_node_kind(name, true).ok_or_else(|| {
            QueryError::new(
                *offset,
                QueryErrorKind::NodeKind,
                format!("unknown node kind `{name}`"),
            )
        })?;

        match subtype {
            None => {
                let subtypes = self.language.subtypes_for_supertype(base).to_vec();
                Ok((Some(base), subtypes))
            }
            Some((sub_name, sub_offset)) => {
                if !self.language.node_kind_is_supertype(base) {
                    return Err(QueryError::new(
                        *offset,
                        QueryErrorKind::NodeKind,
                        format!("`{name}` is not a supertype"),
                    ));
                }
                let sub = self
                    .language
                    .id_for_node_kind(sub_name, true)
                    .filter(|s| self.language.subtypes_for_supertype(base).contains(s))
                    .ok_or_else(|| {
                        QueryError::new(
                            *sub_offset,
                            QueryErrorKind::NodeKind,
                            format!("`{sub_name}` is not a subtype of `{name}`"),
                        )
                    })?;
                Ok((Some(sub), Vec::new()))
            }
        }
    }

    fn resolve_field(&self, name: &str, offset: usize) -> Result<FieldId, QueryError> {
        self.language.field_id_for_name(name).ok_or_else(|| {
            QueryError::new(
                offset,
                QueryErrorKind::Field,
                format!("unknown field `{name}`"),
            )
        })
    }
}

fn top_level_steps(root: &ItemAst) -> Vec<StepInfo> {
    let items: &[ItemAst] = match &root.expr {
        ExprAst::Siblings { children, .. } if children.len() > 1 => children,
        ExprAst::Node { children, .. } => children,
        _ => std::slice::from_ref(root),
    };
    items
        .iter()
        .map(|item| StepInfo {
            offset: item.start,
            optional: matches!(item.quant, Quant::ZeroOrOne | Quant::ZeroOrMore),
        })
        .collect()
}

fn compile_predicate(
    predicate: &PredicateAst,
    captures: &IndexSet<String>,
    text: &mut Vec<TextPredicate>,
    general: &mut Vec<QueryPredicate>,
    settings: &mut Vec<QueryProperty>,
    assertions: &mut Vec<(QueryProperty, bool)>,
) -> Result<(), QueryError> {
    let op = predicate.operator.as_str();
    match op {
        "eq?" | "not-eq?" => {
            let positive = op == "eq?";
            let [first, second] = exact_args(predicate)?;
            let left = capture_arg(first, captures)?;
            match second {
                PredArgAst::Capture { .. } => text.push(TextPredicate::EqCapture {
                    left,
                    right: capture_arg(second, captures)?,
                    positive,
                }),
                PredArgAst::Literal { value, .. } => text.push(TextPredicate::EqString {
                    capture: left,
                    value: value.clone().into_boxed_str(),
                    positive,
                }),
            }
        }
        "any-of?" | "not-any-of?" => {
            let positive = op == "any-of?";
            let Some((first, rest)) = predicate.args.split_first() else {
                return Err(arity_error(predicate));
            };
            let capture = capture_arg(first, captures)?;
            let values = rest
                .iter()
                .map(|arg| literal_arg(arg).map(|v| v.to_owned().into_boxed_str()))
                .collect::<Result<Vec<_>, _>>()?;
            if values.is_empty() {
                return Err(arity_error(predicate));
            }
            text.push(TextPredicate::AnyOfString {
                capture,
                values,
                positive,
            });
        }
        "match?" | "not-match?" => {
            let positive = op == "match?";
            let [first, second] = exact_args(predicate)?;
            let capture = capture_arg(first, captures)?;
            let pattern = literal_arg(second)?;
            let dfa = dense::DFA::builder()
                .configure(
                    dense::DFA::config()
                        .start_kind(StartKind::Unanchored)
                        .minimize(true),
                )
                .build(pattern)
                .map_err(|e| {
                    QueryError::new(
                        predicate.start,
                        QueryErrorKind::Predicate,
                        format!("invalid regex: {e}"),
                    )
                })?;
            text.push(TextPredicate::MatchesRegex {
                capture,
                dfa,
                positive,
            });
        }
        "is?" | "is-not?" | "set!" => {
            let property = parse_property(predicate, captures)?;
            if op == "set!" {
                settings.push(property);
            } else {
                assertions.push((property, op == "is?"));
            }
        }
        _ => {
            let args = predicate
                .args
                .iter()
                .map(|arg| match arg {
                    PredArgAst::Capture { .. } => {
                        capture_arg(arg, captures).map(QueryPredicateArg::Capture)
                    }
                    PredArgAst::Literal { value, .. } => {
                        Ok(QueryPredicateArg::String(value.clone().into_boxed_str()))
                    }
                })
                .collect::<Result<Vec<_>, _>>()?;
            general.push(QueryPredicate {
                operator: predicate.operator.clone().into_boxed_str(),
                args,
            });
        }
    }
    Ok(())
}

/// `(#is? key value)`, `(#set! @cap key value)` and friends: an optional
/// leading capture, a key, and an optional value.
fn parse_property(
    predicate: &PredicateAst,
    captures: &IndexSet<String>,
) -> Result<QueryProperty, QueryError> {
    let mut args = predicate.args.iter();
    let mut capture_id = None;
    let mut first = args.next().ok_or_else(|| arity_error(predicate))?;
    if matches!(first, PredArgAst::Capture { .. }) {
        capture_id = Some(capture_arg(first, captures)?);
        first = args.next().ok_or_else(|| arity_error(predicate))?;
    }
    let key = literal_arg(first)?.to_owned().into_boxed_str();
    let value = match args.next() {
        Some(arg) => Some(literal_arg(arg)?.to_owned().into_boxed_str()),
        None => None,
    };
    if args.next().is_some() {
        return Err(arity_error(predicate));
    }
    Ok(QueryProperty {
        key,
        value,
        capture_id,
    })
}

fn exact_args(predicate: &PredicateAst) -> Result<[&PredArgAst; 2], QueryError> {
    match predicate.args.as_slice() {
        [a, b] => Ok([a, b]),
        _ => Err(arity_error(predicate)),
    }
}

fn arity_error(predicate: &PredicateAst) -> QueryError {
    QueryError::new(
        predicate.start,
        QueryErrorKind::Predicate,
        format!("wrong number of arguments to `#{}`", predicate.operator),
    )
}

fn capture_arg(arg: &PredArgAst, captures: &IndexSet<String>) -> Result<u32, QueryError> {
    match arg {
        PredArgAst::Capture { name, offset } => captures
            .get_index_of(name.as_str())
            .map(|i| i as u32)
            .ok_or_else(|| {
                QueryError::new(
                    *offset,
                    QueryErrorKind::Capture,
                    format!("unknown capture `@{name}`"),
                )
            }),
        PredArgAst::Literal { offset, .. } => Err(QueryError::new(
            *offset,
            QueryErrorKind::Predicate,
            "expected a capture argument",
        )),
    }
}

fn literal_arg(arg: &PredArgAst) -> Result<&str, QueryError> {
    match arg {
        PredArgAst::Literal { value, .. } => Ok(value),
        PredArgAst::Capture { offset, .. } => Err(QueryError::new(
            *offset,
            QueryErrorKind::Predicate,
            "expected a string argument",
        )),
    }
}

/// Capture cardinality as a (lower, upper) bound pair, with 2 standing in
/// for "unbounded". Sequencing adds, alternation takes the envelope, and
/// an enclosing quantifier multiplies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Card {
    lo: u8,
    hi: u8,
}

impl Card {
    const ZERO: Card = Card { lo: 0, hi: 0 };
    const ONE: Card = Card { lo: 1, hi: 1 };

    fn add(self, other: Card) -> Card {
        Card {
            lo: (self.lo + other.lo).min(2),
            hi: (self.hi + other.hi).min(2),
        }
    }

    fn union(self, other: Card) -> Card {
        Card {
            lo: self.lo.min(other.lo),
            hi: self.hi.max(other.hi),
        }
    }

    fn mul(self, other: Card) -> Card {
        Card {
            lo: (self.lo * other.lo).min(2),
            hi: (self.hi * other.hi).min(2),
        }
    }

    fn of_quant(quant: Quant) -> Card {
        match quant {
            Quant::One => Card { lo: 1, hi: 1 },
            Quant::ZeroOrOne => Card { lo: 0, hi: 1 },
            Quant::ZeroOrMore => Card { lo: 0, hi: 2 },
            Quant::OneOrMore => Card { lo: 1, hi: 2 },
        }
    }

    fn to_quantifier(self) -> CaptureQuantifier {
        match (self.lo, self.hi) {
            (0, 0) => CaptureQuantifier::Zero,
            (0, 1) => CaptureQuantifier::ZeroOrOne,
            (0, _) => CaptureQuantifier::ZeroOrMore,
            (_, 1) => CaptureQuantifier::One,
            (_, _) => CaptureQuantifier::OneOrMore,
        }
    }
}

fn accumulate_cards(spec: &Spec, table: &mut Vec<Card>) {
    let local = spec_cards(spec, table.len());
    for (slot, card) in table.iter_mut().zip(local) {
        *slot = slot.add(card);
    }
}

fn spec_cards(spec: &Spec, n: usize) -> Vec<Card> {
    let mut cards = vec![Card::ZERO; n];
    for &capture in &spec.captures {
        let slot = &mut cards[capture as usize];
        *slot = slot.add(Card::ONE);
    }

    match &spec.expr {
        StepExpr::Kind { children, .. } | StepExpr::Siblings { children, .. } => {
            for child in children {
                for (slot, card) in cards.iter_mut().zip(spec_cards(child, n)) {
                    *slot = slot.add(card);
                }
            }
        }
        StepExpr::Alternation { branches } => {
            let mut merged = vec![Card::ZERO; n];
            for (i, branch) in branches.iter().enumerate() {
                let branch_cards = spec_cards(branch, n);
                if i == 0 {
                    merged = branch_cards;
                } else {
                    for (slot, card) in merged.iter_mut().zip(branch_cards) {
                        *slot = slot.union(card);
                    }
                }
            }
            for (slot, card) in cards.iter_mut().zip(merged) {
                *slot = slot.add(card);
            }
        }
        StepExpr::AnyNode | StepExpr::Anon { .. } => {}
    }

    let factor = Card::of_quant(spec.quant);
    for slot in &mut cards {
        *slot = slot.mul(factor);
    }
    cards
}
