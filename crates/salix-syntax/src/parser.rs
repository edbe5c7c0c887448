//! Incremental LR parser.
//!
//! Drives a table-based shift-reduce automaton over lexer output, building
//! an arena-backed [`Tree`]. Supports reuse of unchanged subtrees from a
//! previous (edited) tree, error recovery via ERROR and MISSING nodes,
//! restriction to included ranges, and cooperative cancellation with a
//! resumable checkpoint.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use salix_core::{
    Language, ParseAction, Point, Range, StateId, SymbolId, SYM_END,
};

use crate::input::{SliceInput, TextInput};
use crate::lexer::{Lexer, Scanned};
use crate::tree::{flags, NodeData, Tree, NO_PARENT};

/// Distinguishes parser log messages from lexer ones in the logging sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogType {
    Parse,
    Lex,
}

/// Logging sink receiving (message kind, message) pairs.
pub type Logger = Box<dyn FnMut(LogType, &str)>;

/// Snapshot handed to the progress callback.
#[derive(Debug, Clone, Copy)]
pub struct ParseProgress {
    pub current_byte: usize,
}

/// Options for one parse call.
#[derive(Default)]
pub struct ParseOptions<'a> {
    /// Invoked at token boundaries; return `true` to cancel the parse.
    pub progress: Option<&'a mut dyn FnMut(&ParseProgress) -> bool>,
}

/// An included range was unordered or overlapping; carries its index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("included range at index {0} is unordered or overlapping")]
pub struct IncludedRangesError(pub usize);

/// External token scanner hook for context-sensitive tokens.
///
/// Called before table-driven lexing whenever the current state admits an
/// external terminal. The scanner advances the lexer and returns the
/// recognized symbol, or declines by returning `None` (the lexer position
/// is then restored by the parser).
pub trait Scanner {
    fn scan(&mut self, lexer: &mut Lexer<'_>, valid_symbols: &[SymbolId]) -> Option<SymbolId>;
}

static NEXT_NODE_ID: AtomicU32 = AtomicU32::new(1);

fn alloc_node_id() -> u32 {
    NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Tree under construction.
#[derive(Debug, Clone)]
struct BuildNode {
    symbol: SymbolId,
    id: u32,
    field: u16,
    flags: u8,
    range: Range,
    children: Vec<BuildNode>,
}

impl BuildNode {
    fn leaf(symbol: SymbolId, range: Range, flags: u8) -> Self {
        Self {
            symbol,
            id: alloc_node_id(),
            field: 0,
            flags,
            range,
            children: Vec::new(),
        }
    }

    fn carries_error(&self, error_symbol: SymbolId) -> bool {
        self.symbol == error_symbol || self.flags & (flags::MISSING | flags::HAS_ERROR) != 0
    }
}

#[derive(Debug, Clone)]
struct StackEntry {
    state: StateId,
    node: Option<BuildNode>,
    /// Extra entries (extras, skipped-input ERROR nodes) sit on the stack
    /// without consuming grammar positions.
    is_extra: bool,
}

#[derive(Debug, Clone)]
enum Lookahead {
    Token { symbol: SymbolId, range: Range },
    End { byte: usize, point: Point },
}

impl Lookahead {
    fn symbol(&self) -> SymbolId {
        match self {
            Lookahead::Token { symbol, .. } => *symbol,
            Lookahead::End { .. } => SYM_END,
        }
    }

    fn start(&self) -> (usize, Point) {
        match self {
            Lookahead::Token { range, .. } => (range.start_byte, range.start_point),
            Lookahead::End { byte, point } => (*byte, *point),
        }
    }
}

/// Saved state of a cancelled parse, resumed by the next parse call.
struct Checkpoint {
    stack: Vec<StackEntry>,
    lookahead: Option<Lookahead>,
    byte: usize,
    point: Point,
}

/// A reusable incremental parser.
///
/// One parser drives one parse at a time; share a [`Language`] across
/// parsers rather than a parser across threads.
#[derive(Default)]
pub struct Parser {
    language: Option<Language>,
    included_ranges: Vec<Range>,
    scanner: Option<Box<dyn Scanner>>,
    logger: Option<Logger>,
    timeout_micros: Option<u64>,
    saved: Option<Checkpoint>,
    /// Position where the external scanner was invoked last.
    external_start: (usize, Point),
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the language to parse with.
    ///
    /// Fails if the language's table format version is outside the
    /// supported range.
    pub fn set_language(&mut self, language: &Language) -> Result<(), salix_core::LanguageError> {
        language.check_compatible()?;
        self.language = Some(language.clone());
        self.saved = None;
        Ok(())
    }

    pub fn clear_language(&mut self) {
        self.language = None;
        self.saved = None;
    }

    pub fn language(&self) -> Option<&Language> {
        self.language.as_ref()
    }

    /// Restrict parsing to `ranges` (ordered, non-overlapping). An empty
    /// slice restores whole-document parsing.
    pub fn set_included_ranges(&mut self, ranges: &[Range]) -> Result<(), IncludedRangesError> {
        for (i, r) in ranges.iter().enumerate() {
            if r.start_byte > r.end_byte || r.start_point > r.end_point {
                return Err(IncludedRangesError(i));
            }
            if i > 0 && ranges[i - 1].end_byte > r.start_byte {
                return Err(IncludedRangesError(i));
            }
        }
        self.included_ranges = ranges.to_vec();
        Ok(())
    }

    pub fn included_ranges(&self) -> &[Range] {
        &self.included_ranges
    }

    /// Install an external scanner for context-sensitive tokens.
    pub fn set_scanner(&mut self, scanner: Option<Box<dyn Scanner>>) {
        self.scanner = scanner;
    }

    /// Install a logging sink receiving parser and lexer messages.
    pub fn set_logger(&mut self, logger: Option<Logger>) {
        self.logger = logger;
    }

    #[deprecated(note = "use ParseOptions::progress instead")]
    pub fn set_timeout_micros(&mut self, timeout: u64) {
        self.timeout_micros = (timeout > 0).then_some(timeout);
    }

    pub fn timeout_micros(&self) -> u64 {
        self.timeout_micros.unwrap_or(0)
    }

    /// Discard any saved mid-parse state; the next parse starts fresh.
    pub fn reset(&mut self) {
        self.saved = None;
    }

    /// Parse an in-memory buffer. Returns `None` if no language is set or
    /// the parse was cancelled.
    pub fn parse(&mut self, text: impl AsRef<[u8]>, old_tree: Option<&Tree>) -> Option<Tree> {
        let mut input = SliceInput::new(text.as_ref());
        self.parse_with(&mut input, old_tree, ParseOptions::default())
    }

    /// Parse from an arbitrary [`TextInput`] with options.
    ///
    /// If the previous call on this parser was cancelled, parsing resumes
    /// from the cancellation point unless [`Parser::reset`] was called.
    pub fn parse_with(
        &mut self,
        input: &mut dyn TextInput,
        old_tree: Option<&Tree>,
        mut options: ParseOptions<'_>,
    ) -> Option<Tree> {
        let language = self.language.clone()?;

        let ranges = if self.included_ranges.is_empty() {
            vec![Range::everything()]
        } else {
            self.included_ranges.clone()
        };

        let mut lexer = Lexer::new(input, ranges.clone());
        let mut stack: Vec<StackEntry>;
        let mut lookahead: Option<Lookahead>;
        if let Some(cp) = self.saved.take() {
            stack = cp.stack;
            lookahead = cp.lookahead;
            lexer.seek(cp.byte, cp.point);
        } else {
            stack = vec![StackEntry {
                state: 0,
                node: None,
                is_extra: false,
            }];
            lookahead = None;
        }

        // Subtree reuse only applies when the previous tree speaks the
        // same language.
        let old = old_tree.filter(|t| t.language().ptr_eq(&language));
        let changed_spans = old.map(|t| changed_spans(&t.edits)).unwrap_or_default();

        let deadline = self
            .timeout_micros
            .map(|t| Instant::now() + Duration::from_micros(t));

        loop {
            let (byte, point) = lexer.position();

            let cancelled = options
                .progress
                .as_mut()
                .is_some_and(|cb| cb(&ParseProgress { current_byte: byte }))
                || deadline.is_some_and(|d| Instant::now() >= d);
            if cancelled {
                self.log(LogType::Parse, &format!("cancel at byte {byte}"));
                self.saved = Some(Checkpoint {
                    stack,
                    lookahead,
                    byte,
                    point,
                });
                return None;
            }

            let state = stack.last().expect("stack never empty").state;

            // Incremental reuse: adopt an unchanged subtree from the old
            // tree when one starts exactly here and fits this state.
            if lookahead.is_none() {
                if let Some(old_tree) = old {
                    if let Some((node, next_state, extra)) =
                        reusable_subtree(old_tree, byte, state, &changed_spans, &language, &mut lexer)
                    {
                        self.log(
                            LogType::Parse,
                            &format!(
                                "reuse {} [{}, {})",
                                language.node_kind_for_id(node.symbol).unwrap_or("?"),
                                node.range.start_byte,
                                node.range.end_byte
                            ),
                        );
                        lexer.seek(node.range.end_byte, node.range.end_point);
                        stack.push(StackEntry {
                            state: if extra { state } else { next_state },
                            node: Some(node),
                            is_extra: extra,
                        });
                        continue;
                    }
                }
            }

            let tok = match lookahead.take() {
                Some(tok) => tok,
                None => self.next_lookahead(&mut lexer, &language, &mut stack),
            };

            let sym = tok.symbol();
            let action = language.parse_state(state).action(sym).cloned();
            match action {
                Some(ParseAction::Shift(next)) => {
                    let Lookahead::Token { symbol, range } = tok else {
                        unreachable!("end-of-input is never shifted");
                    };
                    self.log(
                        LogType::Parse,
                        &format!(
                            "shift {} -> state {next}",
                            language.node_kind_for_id(symbol).unwrap_or("?")
                        ),
                    );
                    stack.push(StackEntry {
                        state: next,
                        node: Some(BuildNode::leaf(symbol, range, 0)),
                        is_extra: false,
                    });
                }
                Some(ParseAction::Reduce {
                    symbol,
                    child_count,
                    fields,
                }) => {
                    self.log(
                        LogType::Parse,
                        &format!(
                            "reduce {} ({child_count})",
                            language.node_kind_for_id(symbol).unwrap_or("?")
                        ),
                    );
                    reduce(&mut stack, &language, symbol, child_count, &fields, byte, point);
                    lookahead = Some(tok);
                }
                Some(ParseAction::Accept) => {
                    self.log(LogType::Parse, "accept");
                    let root = finish_root(stack, &language, byte, point);
                    return Some(build_tree(language, root, ranges));
                }
                None => {
                    match self.recover(&mut stack, &mut lexer, &language, tok) {
                        Recovery::Continue(next_lookahead) => {
                            lookahead = next_lookahead;
                        }
                        Recovery::Finished => {
                            let (byte, point) = lexer.position();
                            let root = finish_root(stack, &language, byte, point);
                            return Some(build_tree(language, root, ranges));
                        }
                    }
                }
            }
        }
    }

    fn log(&mut self, kind: LogType, message: &str) {
        log::trace!("{message}");
        if let Some(logger) = &mut self.logger {
            logger(kind, message);
        }
    }

    /// Lex the next real token, absorbing extras and invalid fragments
    /// onto the stack as extra entries along the way.
    fn next_lookahead(
        &mut self,
        lexer: &mut Lexer<'_>,
        language: &Language,
        stack: &mut Vec<StackEntry>,
    ) -> Lookahead {
        let error_symbol = language.error_symbol();
        loop {
            let state = stack.last().expect("stack never empty").state;

            if let Some(symbol) = self.scan_external(lexer, language, state) {
                let (end_byte, end_point) = lexer.position();
                // The scanner advanced from the pre-scan position.
                let range = self.external_range(end_byte, end_point);
                if language.parse_state(state).action(symbol).is_some() {
                    return Lookahead::Token { symbol, range };
                }
                if language.is_extra(symbol) {
                    stack.push(StackEntry {
                        state,
                        node: Some(BuildNode::leaf(symbol, range, flags::EXTRA)),
                        is_extra: true,
                    });
                    continue;
                }
                return Lookahead::Token { symbol, range };
            }

            let lex_state = language.lex_state(language.parse_state(state).lex_state);
            match lexer.scan(lex_state) {
                Scanned::Token { symbol, range } => {
                    self.log(
                        LogType::Lex,
                        &format!(
                            "token {} [{}, {})",
                            language.node_kind_for_id(symbol).unwrap_or("?"),
                            range.start_byte,
                            range.end_byte
                        ),
                    );
                    if language.parse_state(state).action(symbol).is_some() {
                        return Lookahead::Token { symbol, range };
                    }
                    if language.is_extra(symbol) {
                        stack.push(StackEntry {
                            state,
                            node: Some(BuildNode::leaf(symbol, range, flags::EXTRA)),
                            is_extra: true,
                        });
                        continue;
                    }
                    return Lookahead::Token { symbol, range };
                }
                Scanned::Invalid { range } => {
                    self.log(
                        LogType::Lex,
                        &format!("invalid input [{}, {})", range.start_byte, range.end_byte),
                    );
                    // Lexical garbage becomes an ERROR leaf; the parse
                    // state machine never sees it.
                    stack.push(StackEntry {
                        state,
                        node: Some(BuildNode::leaf(error_symbol, range, 0)),
                        is_extra: true,
                    });
                }
                Scanned::End { byte, point } => return Lookahead::End { byte, point },
            }
        }
    }

    fn scan_external(
        &mut self,
        lexer: &mut Lexer<'_>,
        language: &Language,
        state: StateId,
    ) -> Option<SymbolId> {
        let scanner = self.scanner.as_mut()?;
        let parse_state = language.parse_state(state);
        let valid: Vec<SymbolId> = parse_state
            .actions
            .iter()
            .map(|(sym, _)| *sym)
            .chain(language.extras().iter().copied())
            .filter(|sym| language.is_external(*sym))
            .collect();
        if valid.is_empty() {
            return None;
        }
        let (start_byte, start_point) = lexer.position();
        self.external_start = (start_byte, start_point);
        let result = scanner.scan(lexer, &valid);
        if result.is_none() {
            lexer.seek(start_byte, start_point);
        }
        result
    }

    fn external_range(&self, end_byte: usize, end_point: Point) -> Range {
        let (start_byte, start_point) = self.external_start;
        Range::new(start_byte, end_byte, start_point, end_point)
    }

    /// Error recovery at a token with no action in the current state.
    fn recover(
        &mut self,
        stack: &mut Vec<StackEntry>,
        lexer: &mut Lexer<'_>,
        language: &Language,
        tok: Lookahead,
    ) -> Recovery {
        let state = stack.last().expect("stack never empty").state;
        let parse_state = language.parse_state(state);
        let sym = tok.symbol();

        // Deterministic MISSING insertion: exactly one shiftable terminal
        // leads to a state where the lookahead has an action.
        let mut candidates = parse_state
            .shiftable_terminals()
            .filter(|(_, next)| language.parse_state(*next).action(sym).is_some());
        if let (Some((missing_sym, next)), None) = (candidates.next(), candidates.next()) {
            let (byte, point) = tok.start();
            self.log(
                LogType::Parse,
                &format!(
                    "insert MISSING {}",
                    language.node_kind_for_id(missing_sym).unwrap_or("?")
                ),
            );
            stack.push(StackEntry {
                state: next,
                node: Some(BuildNode::leaf(
                    missing_sym,
                    Range::new(byte, byte, point, point),
                    flags::MISSING,
                )),
                is_extra: false,
            });
            return Recovery::Continue(Some(tok));
        }

        if let Lookahead::End { .. } = tok {
            // At end of input: complete what we can by reducing, else
            // finalize with an ERROR root.
            let reduce_action = parse_state.actions.iter().find_map(|(_, a)| match a {
                ParseAction::Reduce {
                    symbol,
                    child_count,
                    fields,
                } if *child_count > 0 => Some((*symbol, *child_count, fields.clone())),
                _ => None,
            });
            if let Some((symbol, child_count, fields)) = reduce_action {
                let (byte, point) = tok.start();
                self.log(LogType::Parse, "reduce at end of input for recovery");
                reduce(stack, language, symbol, child_count, &fields, byte, point);
                return Recovery::Continue(Some(tok));
            }
            return Recovery::Finished;
        }

        // Skip tokens into an ERROR node until one resynchronizes.
        self.log(LogType::Parse, "skipping unexpected input");
        let error_symbol = language.error_symbol();
        let mut skipped = Vec::new();
        let next_lookahead;
        if let Lookahead::Token { symbol, range } = tok {
            skipped.push(BuildNode::leaf(symbol, range, 0));
        }
        loop {
            let tok = self.next_lookahead(lexer, language, stack);
            match tok {
                Lookahead::End { .. } => {
                    next_lookahead = Some(tok);
                    break;
                }
                Lookahead::Token { symbol, range } => {
                    if language.parse_state(state).action(symbol).is_some() {
                        next_lookahead = Some(Lookahead::Token { symbol, range });
                        break;
                    }
                    skipped.push(BuildNode::leaf(symbol, range, 0));
                }
            }
        }

        if !skipped.is_empty() {
            let range = skipped
                .iter()
                .skip(1)
                .fold(skipped[0].range, |acc, n| acc.cover(&n.range));
            let mut node = BuildNode::leaf(error_symbol, range, 0);
            node.children = skipped;
            stack.push(StackEntry {
                state,
                node: Some(node),
                is_extra: true,
            });
        }
        Recovery::Continue(next_lookahead)
    }
}

enum Recovery {
    /// Keep parsing with this lookahead (None means lex a fresh one).
    Continue(Option<Lookahead>),
    /// Input exhausted beyond repair; finalize the partial tree.
    Finished,
}

/// Post-edit spans whose lexical content changed, in final coordinates.
/// Empty spans (pure deletions) are widened so nodes straddling the
/// deletion point still count as affected.
fn changed_spans(edits: &[salix_core::InputEdit]) -> Vec<Range> {
    edits
        .iter()
        .enumerate()
        .map(|(i, edit)| {
            let mut span = edit.new_range().transform_through(&edits[i + 1..]);
            if span.is_empty() {
                span.end_byte += 1;
            }
            span
        })
        .collect()
}

/// Find the topmost old-tree subtree starting exactly at `byte` that is
/// untouched by every edit and adoptable in `state`. Returns the copied
/// subtree (ids preserved, coordinates adjusted), the state to enter, and
/// whether it is adopted as an extra.
///
/// A subtree ending exactly where a changed span starts may have its last
/// token lexically extended by the new text, so it only qualifies when it
/// is a single token that re-lexes to the same symbol and end; interior
/// nodes at such a boundary are rejected and their leading children are
/// considered instead.
fn reusable_subtree(
    old: &Tree,
    byte: usize,
    state: StateId,
    changed_spans: &[Range],
    language: &Language,
    lexer: &mut Lexer<'_>,
) -> Option<(BuildNode, StateId, bool)> {
    let error_symbol = language.error_symbol();
    let mut idx = 0u32;
    loop {
        let range = old.adjusted_range(idx);
        let data = old.node_data(idx);

        if range.start_byte == byte && !range.is_empty() {
            let clean = data.flags & (flags::MISSING | flags::HAS_ERROR) == 0
                && data.symbol != error_symbol;
            let untouched = changed_spans.iter().all(|span| !span.overlaps(&range));
            let at_boundary = changed_spans
                .iter()
                .any(|span| span.start_byte == range.end_byte);
            let boundary_safe = !at_boundary
                || (data.children.is_empty()
                    && relexes_unchanged(lexer, language, state, data.symbol, range));
            if clean && untouched && boundary_safe {
                let is_extra_node = data.flags & flags::EXTRA != 0;
                if is_extra_node {
                    return Some((copy_subtree(old, idx), state, true));
                }
                if let Some(next) = language.parse_state(state).goto(data.symbol) {
                    return Some((copy_subtree(old, idx), next, false));
                }
                if let Some(ParseAction::Shift(next)) =
                    language.parse_state(state).action(data.symbol)
                {
                    // Terminals re-enter through their shift action.
                    if data.children.is_empty() {
                        return Some((copy_subtree(old, idx), *next, false));
                    }
                }
            }
        }

        // Descend toward the child containing the position.
        let next = data.children.iter().copied().find(|&c| {
            let r = old.adjusted_range(c);
            r.start_byte <= byte && byte < r.end_byte
        });
        match next {
            Some(child) => idx = child,
            None => return None,
        }
    }
}

/// Re-scan an old token sitting at the lexer's current position and check
/// the new text still produces the same symbol with the same end. Restores
/// the lexer position either way.
fn relexes_unchanged(
    lexer: &mut Lexer<'_>,
    language: &Language,
    state: StateId,
    symbol: SymbolId,
    range: Range,
) -> bool {
    let lex_state = language.lex_state(language.parse_state(state).lex_state);
    let same = matches!(
        lexer.scan(lex_state),
        Scanned::Token { symbol: s, range: r } if s == symbol && r.end_byte == range.end_byte
    );
    lexer.seek(range.start_byte, range.start_point);
    same
}

fn copy_subtree(old: &Tree, idx: u32) -> BuildNode {
    let data = old.node_data(idx);
    BuildNode {
        symbol: data.symbol,
        id: data.id,
        field: data.field,
        flags: data.flags,
        range: old.adjusted_range(idx),
        children: data.children.iter().map(|&c| copy_subtree(old, c)).collect(),
    }
}

/// Pop `child_count` grammar children (plus interleaved extras), build the
/// reduced node, and push it through the goto table. Trailing extras stay
/// on the stack for the enclosing rule.
fn reduce(
    stack: &mut Vec<StackEntry>,
    language: &Language,
    symbol: SymbolId,
    child_count: u16,
    fields: &[u16],
    current_byte: usize,
    current_point: Point,
) {
    let error_symbol = language.error_symbol();

    let mut trailing = Vec::new();
    while stack.last().is_some_and(|e| e.is_extra) {
        trailing.push(stack.pop().expect("checked extra on top"));
    }

    let mut picked = Vec::new();
    let mut non_extra = 0u16;
    while non_extra < child_count {
        let Some(entry) = stack.pop() else {
            break;
        };
        if entry.node.is_none() {
            // Hit the stack base: malformed table. Put it back and stop.
            stack.push(entry);
            break;
        }
        if !entry.is_extra {
            non_extra += 1;
        }
        picked.push(entry);
    }
    picked.reverse();

    let mut children: Vec<BuildNode> = Vec::with_capacity(picked.len());
    let mut has_error = false;
    let mut field_slot = 0usize;
    for entry in picked {
        let mut node = entry.node.expect("base entries are never picked");
        if !entry.is_extra {
            if let Some(&field) = fields.get(field_slot) {
                if field != 0 {
                    node.field = field;
                }
            }
            field_slot += 1;
        }
        has_error |= node.carries_error(error_symbol);
        if !language.node_kind_is_visible(node.symbol) && node.symbol != error_symbol {
            // Hidden rules splice their children into the parent.
            for child in node.children {
                has_error |= child.carries_error(error_symbol);
                children.push(child);
            }
        } else {
            children.push(node);
        }
    }

    let range = match (children.first(), children.last()) {
        (Some(first), Some(last)) => Range::new(
            first.range.start_byte,
            last.range.end_byte,
            first.range.start_point,
            last.range.end_point,
        ),
        _ => Range::new(current_byte, current_byte, current_point, current_point),
    };

    let node = BuildNode {
        symbol,
        id: alloc_node_id(),
        field: 0,
        flags: if has_error { flags::HAS_ERROR } else { 0 },
        range,
        children,
    };

    let under = stack.last().expect("stack base survives").state;
    match language.parse_state(under).goto(symbol) {
        Some(next) => stack.push(StackEntry {
            state: next,
            node: Some(node),
            is_extra: false,
        }),
        None => {
            // No goto for this nonterminal here: keep it as an extra so
            // the tree still contains it.
            stack.push(StackEntry {
                state: under,
                node: Some(node),
                is_extra: true,
            });
        }
    }

    // The saved states of the trailing extras predate the reduction;
    // refresh them so the automaton resumes from the goto state.
    while let Some(mut entry) = trailing.pop() {
        entry.state = stack.last().expect("stack base survives").state;
        stack.push(entry);
    }
}

/// Assemble the final root from whatever remains on the stack.
fn finish_root(
    stack: Vec<StackEntry>,
    language: &Language,
    current_byte: usize,
    current_point: Point,
) -> BuildNode {
    let error_symbol = language.error_symbol();
    let nodes: Vec<(BuildNode, bool)> = stack
        .into_iter()
        .filter_map(|e| e.node.map(|n| (n, e.is_extra)))
        .collect();

    let non_extras = nodes.iter().filter(|(_, extra)| !extra).count();
    if non_extras == 1 && nodes.len() == 1 {
        let (node, _) = nodes.into_iter().next().expect("one node present");
        return node;
    }

    if non_extras == 1 {
        // One real root with stray extras around it: absorb them.
        let mut root = None;
        let mut leading = Vec::new();
        let mut trailing = Vec::new();
        for (node, extra) in nodes {
            if !extra {
                root = Some(node);
            } else if root.is_none() {
                leading.push(node);
            } else {
                trailing.push(node);
            }
        }
        let mut root = root.expect("counted one non-extra");
        for node in leading.into_iter().rev() {
            root.range = root.range.cover(&node.range);
            if node.carries_error(error_symbol) {
                root.flags |= flags::HAS_ERROR;
            }
            root.children.insert(0, node);
        }
        for node in trailing {
            root.range = root.range.cover(&node.range);
            if node.carries_error(error_symbol) {
                root.flags |= flags::HAS_ERROR;
            }
            root.children.push(node);
        }
        return root;
    }

    // Zero or several real nodes: wrap everything in an ERROR root.
    let range = nodes
        .iter()
        .map(|(n, _)| n.range)
        .reduce(|a, b| a.cover(&b))
        .unwrap_or(Range::new(
            current_byte,
            current_byte,
            current_point,
            current_point,
        ));
    BuildNode {
        symbol: error_symbol,
        id: alloc_node_id(),
        field: 0,
        flags: flags::HAS_ERROR,
        range,
        children: nodes.into_iter().map(|(n, _)| n).collect(),
    }
}

fn build_tree(language: Language, root: BuildNode, included_ranges: Vec<Range>) -> Tree {
    let mut arena = Vec::new();
    flatten(root, NO_PARENT, &mut arena);
    Tree::new(language, arena, included_ranges)
}

fn flatten(node: BuildNode, parent: u32, arena: &mut Vec<NodeData>) -> u32 {
    let idx = arena.len() as u32;
    arena.push(NodeData {
        symbol: node.symbol,
        id: node.id,
        parent,
        children: Vec::new(),
        field: node.field,
        range: node.range,
        descendant_count: 0,
        flags: node.flags,
    });
    let mut child_indices = Vec::with_capacity(node.children.len());
    for child in node.children {
        child_indices.push(flatten(child, idx, arena));
    }
    let end = arena.len() as u32;
    arena[idx as usize].children = child_indices;
    arena[idx as usize].descendant_count = end - idx - 1;
    idx
}
