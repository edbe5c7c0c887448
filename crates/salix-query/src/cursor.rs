//! Query execution: walking a subtree and matching compiled patterns.
//!
//! Matches are reported in discovery order (preorder over anchor nodes,
//! patterns in index order at each anchor). `captures` flattens matches
//! and re-sorts by position instead.

use std::time::{Duration, Instant};

use regex_automata::dfa::Automaton;
use regex_automata::Input;
use salix_core::Point;
use salix_syntax::Node;

use crate::ast::Quant;
use crate::compile::{CompiledPattern, Spec, StepExpr, TextPredicate};
use crate::query::Query;

/// One pattern matched at one place in the tree.
#[derive(Debug, Clone)]
pub struct QueryMatch<'t> {
    pub pattern_index: usize,
    /// Captures in binding order.
    pub captures: Vec<QueryCapture<'t>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryCapture<'t> {
    pub node: Node<'t>,
    /// Capture id, resolvable through [`Query::capture_names`].
    pub index: u32,
}

/// Snapshot handed to the progress callback.
#[derive(Debug, Clone, Copy)]
pub struct QueryProgress {
    pub current_byte: usize,
}

/// Options for one `matches`/`captures` run.
#[derive(Default)]
pub struct QueryOptions<'a> {
    /// Invoked at each visited node; return `true` to cancel the run and
    /// keep the matches found so far.
    pub progress: Option<&'a mut dyn FnMut(&QueryProgress) -> bool>,
}

const MAX_MATCH_LIMIT: u32 = 65536;

/// Drives query execution over a subtree. One cursor per thread; the
/// query itself is shareable.
pub struct QueryCursor {
    match_limit: u32,
    did_exceed: bool,
    byte_range: Option<(usize, usize)>,
    point_range: Option<(Point, Point)>,
    max_start_depth: Option<u32>,
    timeout_micros: Option<u64>,
}

impl Default for QueryCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCursor {
    pub fn new() -> Self {
        Self {
            match_limit: MAX_MATCH_LIMIT,
            did_exceed: false,
            byte_range: None,
            point_range: None,
            max_start_depth: None,
            timeout_micros: None,
        }
    }

    /// Caps how many matches a single run may produce.
    pub fn set_match_limit(&mut self, limit: u32) {
        self.match_limit = limit.clamp(1, MAX_MATCH_LIMIT);
    }

    pub fn match_limit(&self) -> u32 {
        self.match_limit
    }

    /// Whether the last run dropped matches because of the limit.
    pub fn did_exceed_match_limit(&self) -> bool {
        self.did_exceed
    }

    /// Restricts matching to nodes overlapping the byte range.
    pub fn set_byte_range(&mut self, range: std::ops::Range<usize>) {
        self.byte_range = Some((range.start, range.end));
    }

    /// Restricts matching to nodes overlapping the point range.
    pub fn set_point_range(&mut self, range: std::ops::Range<Point>) {
        self.point_range = Some((range.start, range.end));
    }

    /// Bounds how deep below the search node a pattern may anchor; zero
    /// anchors patterns at the search node itself. Nested parts of a
    /// pattern still match at any depth below the anchor.
    pub fn set_max_start_depth(&mut self, depth: Option<u32>) {
        self.max_start_depth = depth;
    }

    #[deprecated(note = "use QueryOptions::progress instead")]
    pub fn set_timeout_micros(&mut self, timeout: u64) {
        self.timeout_micros = (timeout > 0).then_some(timeout);
    }

    pub fn timeout_micros(&self) -> u64 {
        self.timeout_micros.unwrap_or(0)
    }

    /// All pattern matches in the subtree of `node`, in discovery order.
    pub fn matches<'t>(
        &mut self,
        query: &Query,
        node: Node<'t>,
        source: &str,
    ) -> Vec<QueryMatch<'t>> {
        self.matches_with(query, node, source, QueryOptions::default())
    }

    pub fn matches_with<'a, 't>(
        &mut self,
        query: &'a Query,
        node: Node<'t>,
        source: &'a str,
        options: QueryOptions<'a>,
    ) -> Vec<QueryMatch<'t>> {
        self.did_exceed = false;
        let mut search = Search {
            query,
            source,
            byte_range: self.byte_range,
            point_range: self.point_range,
            max_start_depth: self.max_start_depth,
            match_limit: self.match_limit as usize,
            deadline: self
                .timeout_micros
                .map(|t| Instant::now() + Duration::from_micros(t)),
            progress: options.progress,
            out: Vec::new(),
            did_exceed: false,
            stopped: false,
        };
        search.visit(node, 0);
        self.did_exceed = search.did_exceed;
        search.out
    }

    /// All captures in the subtree of `node`, ordered by position.
    pub fn captures<'t>(
        &mut self,
        query: &Query,
        node: Node<'t>,
        source: &str,
    ) -> Vec<QueryCapture<'t>> {
        self.captures_with(query, node, source, QueryOptions::default())
    }

    pub fn captures_with<'a, 't>(
        &mut self,
        query: &'a Query,
        node: Node<'t>,
        source: &'a str,
        options: QueryOptions<'a>,
    ) -> Vec<QueryCapture<'t>> {
        let matches = self.matches_with(query, node, source, options);
        let mut captures: Vec<QueryCapture<'t>> =
            matches.into_iter().flat_map(|m| m.captures).collect();
        captures.sort_by_key(|c| (c.node.start_byte(), c.node.end_byte()));
        captures
    }
}

struct Search<'a, 't> {
    query: &'a Query,
    source: &'a str,
    byte_range: Option<(usize, usize)>,
    point_range: Option<(Point, Point)>,
    max_start_depth: Option<u32>,
    match_limit: usize,
    deadline: Option<Instant>,
    progress: Option<&'a mut dyn FnMut(&QueryProgress) -> bool>,
    out: Vec<QueryMatch<'t>>,
    did_exceed: bool,
    stopped: bool,
}

impl<'t> Search<'_, 't> {
    fn visit(&mut self, node: Node<'t>, depth: u32) {
        if self.stopped || !self.overlaps(node) {
            return;
        }

        let cancelled = self.progress.as_mut().is_some_and(|cb| {
            cb(&QueryProgress {
                current_byte: node.start_byte(),
            })
        }) || self.deadline.is_some_and(|d| Instant::now() >= d);
        if cancelled {
            self.stopped = true;
            return;
        }

        for (pattern_index, pattern) in self.query.patterns().iter().enumerate() {
            if !pattern.enabled {
                continue;
            }
            let mut captures = Vec::new();
            if !match_pattern_root(pattern, node, &mut captures) {
                continue;
            }
            if !predicates_pass(pattern, &captures, self.source) {
                continue;
            }
            if self.out.len() >= self.match_limit {
                self.did_exceed = true;
                self.stopped = true;
                return;
            }
            captures.retain(|c| self.query.capture_is_enabled(c.index));
            self.out.push(QueryMatch {
                pattern_index,
                captures,
            });
        }

        if self.max_start_depth.is_none_or(|max| depth < max) {
            for child in node.children() {
                self.visit(child, depth + 1);
            }
        }
    }

    fn overlaps(&self, node: Node<'t>) -> bool {
        if let Some((start, end)) = self.byte_range {
            if node.end_byte() <= start || node.start_byte() >= end {
                return false;
            }
        }
        if let Some((start, end)) = self.point_range {
            if node.end_position() <= start || node.start_position() >= end {
                return false;
            }
        }
        true
    }
}

fn match_pattern_root<'t>(
    pattern: &CompiledPattern,
    node: Node<'t>,
    captures: &mut Vec<QueryCapture<'t>>,
) -> bool {
    let root = &pattern.root;
    if let StepExpr::Siblings {
        children,
        anchor_end,
    } = &root.expr
    {
        if children.len() > 1 {
            // A sibling pattern anchors at the parent and matches among
            // its children.
            let kids: Vec<Node<'t>> = node.children().collect();
            return match_seq(children, *anchor_end, &kids, 0, 0, captures);
        }
    }

    match root.quant {
        Quant::One | Quant::ZeroOrOne => match_single(root, node, captures),
        Quant::OneOrMore | Quant::ZeroOrMore => {
            if !match_single(root, node, captures) {
                return false;
            }
            // Greedily extend the repetition over following siblings.
            let mut next = node.next_named_sibling();
            while let Some(sibling) = next {
                let mark = captures.len();
                if !match_single(root, sibling, captures) {
                    captures.truncate(mark);
                    break;
                }
                next = sibling.next_named_sibling();
            }
            true
        }
    }
}

fn match_single<'t>(spec: &Spec, node: Node<'t>, captures: &mut Vec<QueryCapture<'t>>) -> bool {
    if let Some(field) = spec.field {
        if node.field_id() != Some(field) {
            return false;
        }
    }
    let mark = captures.len();
    if !match_expr(&spec.expr, node, captures) {
        captures.truncate(mark);
        return false;
    }
    for &index in &spec.captures {
        captures.push(QueryCapture { node, index });
    }
    true
}

fn match_expr<'t>(expr: &StepExpr, node: Node<'t>, captures: &mut Vec<QueryCapture<'t>>) -> bool {
    match expr {
        StepExpr::AnyNode => true,
        StepExpr::Anon { symbol } => !node.is_named() && node.kind_id() == *symbol,
        StepExpr::Kind {
            symbol,
            subtypes,
            children,
            negated_fields,
            anchor_end,
        } => {
            if !node.is_named() {
                return false;
            }
            if let Some(symbol) = symbol {
                if node.kind_id() != *symbol && !subtypes.contains(&node.kind_id()) {
                    return false;
                }
            }
            for &field in negated_fields {
                if node.child_by_field_id(field).is_some() {
                    return false;
                }
            }
            if children.is_empty() {
                return true;
            }
            let kids: Vec<Node<'t>> = node.children().collect();
            match_seq(children, *anchor_end, &kids, 0, 0, captures)
        }
        StepExpr::Alternation { branches } => branches
            .iter()
            .any(|branch| match_single(branch, node, captures)),
        StepExpr::Siblings { children, .. } => {
            children.len() == 1 && match_single(&children[0], node, captures)
        }
    }
}

/// Matches a sequence of child specs against a sibling list, backtracking
/// over positions. Unanchored steps may skip siblings; an anchored step
/// must match the next named, non-extra sibling.
fn match_seq<'t>(
    specs: &[Spec],
    anchor_end: bool,
    kids: &[Node<'t>],
    si: usize,
    ci: usize,
    captures: &mut Vec<QueryCapture<'t>>,
) -> bool {
    let Some(spec) = specs.get(si) else {
        return !anchor_end || next_named(kids, ci).is_none();
    };
    match spec.quant {
        Quant::One => try_positions(specs, anchor_end, kids, si, ci, captures, false),
        Quant::ZeroOrOne => {
            try_positions(specs, anchor_end, kids, si, ci, captures, false)
                || match_seq(specs, anchor_end, kids, si + 1, ci, captures)
        }
        Quant::OneOrMore => try_positions(specs, anchor_end, kids, si, ci, captures, true),
        Quant::ZeroOrMore => {
            try_positions(specs, anchor_end, kids, si, ci, captures, true)
                || match_seq(specs, anchor_end, kids, si + 1, ci, captures)
        }
    }
}

fn try_positions<'t>(
    specs: &[Spec],
    anchor_end: bool,
    kids: &[Node<'t>],
    si: usize,
    ci: usize,
    captures: &mut Vec<QueryCapture<'t>>,
    repeat: bool,
) -> bool {
    let spec = &specs[si];
    let positions: Vec<usize> = if spec.anchor_before {
        next_named(kids, ci).into_iter().collect()
    } else {
        (ci..kids.len()).collect()
    };
    for p in positions {
        let mark = captures.len();
        if match_single(spec, kids[p], captures) {
            let rest = if repeat {
                try_positions(specs, anchor_end, kids, si, p + 1, captures, true)
                    || match_seq(specs, anchor_end, kids, si + 1, p + 1, captures)
            } else {
                match_seq(specs, anchor_end, kids, si + 1, p + 1, captures)
            };
            if rest {
                return true;
            }
        }
        captures.truncate(mark);
    }
    false
}

fn next_named(kids: &[Node<'_>], from: usize) -> Option<usize> {
    kids[from..]
        .iter()
        .position(|k| k.is_named() && !k.is_extra())
        .map(|offset| from + offset)
}

fn predicates_pass(pattern: &CompiledPattern, captures: &[QueryCapture<'_>], source: &str) -> bool {
    pattern.text_predicates.iter().all(|predicate| {
        match predicate {
            TextPredicate::EqString {
                capture,
                value,
                positive,
            } => texts(captures, *capture, source).all(|t| (t == &**value) == *positive),
            TextPredicate::EqCapture {
                left,
                right,
                positive,
            } => {
                let rights: Vec<&str> = texts(captures, *right, source).collect();
                texts(captures, *left, source)
                    .all(|l| rights.iter().all(|r| (l == *r) == *positive))
            }
            TextPredicate::AnyOfString {
                capture,
                values,
                positive,
            } => texts(captures, *capture, source)
                .all(|t| values.iter().any(|v| &**v == t) == *positive),
            TextPredicate::MatchesRegex {
                capture,
                dfa,
                positive,
            } => texts(captures, *capture, source).all(|t| {
                let found = dfa
                    .try_search_fwd(&Input::new(t))
                    .ok()
                    .flatten()
                    .is_some();
                found == *positive
            }),
        }
    })
}

fn texts<'a>(
    captures: &'a [QueryCapture<'_>],
    id: u32,
    source: &'a str,
) -> impl Iterator<Item = &'a str> {
    captures
        .iter()
        .filter(move |c| c.index == id)
        .map(move |c| c.node.utf8_text(source))
}
