//! Recursive-descent parser for the pattern language.
//!
//! Fails fast: the first malformed construct aborts compilation with a
//! [`QueryError`] pointing at its byte offset.

use crate::ast::{ExprAst, ItemAst, PatternAst, PredArgAst, PredicateAst, Quant};
use crate::error::{QueryError, QueryErrorKind};
use crate::lexer::{self, Token, TokenKind};

pub(crate) fn parse(source: &str) -> Result<Vec<PatternAst>, QueryError> {
    let tokens = lexer::lex(source);
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        last_end: 0,
        predicates: Vec::new(),
    };
    parser.parse_query()
}

struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
    last_end: usize,
    /// Predicates collected while parsing the current pattern.
    predicates: Vec<PredicateAst>,
}

impl<'s> Parser<'s> {
    fn parse_query(&mut self) -> Result<Vec<PatternAst>, QueryError> {
        let mut patterns: Vec<PatternAst> = Vec::new();
        while let Some(token) = self.peek() {
            // A bare `(#op ...)` form attaches to the preceding pattern.
            if token.kind == TokenKind::LParen && self.peek_kind_at(1) == Some(TokenKind::Hash) {
                let predicate = self.parse_predicate()?;
                let Some(last) = patterns.last_mut() else {
                    return Err(QueryError::new(
                        predicate.start,
                        QueryErrorKind::Syntax,
                        "predicate before any pattern",
                    ));
                };
                last.end = self.last_end;
                last.predicates.push(predicate);
                continue;
            }

            let root = self.parse_item(false)?;
            let (start, end) = (root.start, self.last_end);
            patterns.push(PatternAst {
                root,
                predicates: std::mem::take(&mut self.predicates),
                start,
                end,
            });
        }
        Ok(patterns)
    }

    fn parse_item(&mut self, anchor_before: bool) -> Result<ItemAst, QueryError> {
        let start = self.next_offset();

        // `name:` prefixes the item with a field.
        let mut field = None;
        if let Some(token) = self.peek() {
            if token.kind == TokenKind::Ident && self.peek_kind_at(1) == Some(TokenKind::Colon) {
                field = Some((lexer::token_text(self.source, &token).to_owned(), token.start()));
                self.bump();
                self.bump();
            }
        }

        let expr = self.parse_expr()?;

        let mut quant = Quant::One;
        let mut captures = Vec::new();
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::Star => {
                    quant = combine(quant, Quant::ZeroOrMore);
                    self.bump();
                }
                TokenKind::Plus => {
                    quant = combine(quant, Quant::OneOrMore);
                    self.bump();
                }
                TokenKind::Question => {
                    quant = combine(quant, Quant::ZeroOrOne);
                    self.bump();
                }
                TokenKind::At => {
                    self.bump();
                    let name = self.expect_ident("capture name")?;
                    captures.push((name, token.start()));
                }
                _ => break,
            }
        }

        Ok(ItemAst {
            expr,
            field,
            quant,
            anchor_before,
            captures,
            start,
            end: self.last_end,
        })
    }

    fn parse_expr(&mut self) -> Result<ExprAst, QueryError> {
        let Some(token) = self.peek() else {
            return Err(self.eof_error("expected a pattern"));
        };
        match token.kind {
            TokenKind::LParen => self.parse_paren(),
            TokenKind::LBracket => {
                self.bump();
                let mut branches = Vec::new();
                while self.peek_kind() != Some(TokenKind::RBracket) {
                    if self.peek().is_none() {
                        return Err(self.eof_error("unclosed alternation"));
                    }
                    branches.push(self.parse_item(false)?);
                }
                self.bump();
                if branches.is_empty() {
                    return Err(QueryError::new(
                        token.start(),
                        QueryErrorKind::Syntax,
                        "empty alternation",
                    ));
                }
                Ok(ExprAst::Alternation { branches })
            }
            TokenKind::StringLiteral => {
                self.bump();
                let raw = lexer::token_text(self.source, &token);
                Ok(ExprAst::Anon {
                    value: lexer::unescape_string(raw),
                })
            }
            TokenKind::Underscore => {
                self.bump();
                Ok(ExprAst::AnyNode)
            }
            TokenKind::Garbage => Err(QueryError::new(
                token.start(),
                QueryErrorKind::Syntax,
                "unrecognized characters in pattern",
            )),
            _ => Err(QueryError::new(
                token.start(),
                QueryErrorKind::Syntax,
                format!("unexpected `{}`", lexer::token_text(self.source, &token)),
            )),
        }
    }

    fn parse_paren(&mut self) -> Result<ExprAst, QueryError> {
        self.bump();
        let Some(token) = self.peek() else {
            return Err(self.eof_error("unclosed `(`"));
        };
        match token.kind {
            TokenKind::Ident => {
                self.bump();
                let kind = Some((lexer::token_text(self.source, &token).to_owned(), token.start()));
                let mut subtype = None;
                if self.peek_kind() == Some(TokenKind::Slash) {
                    self.bump();
                    let sub = self.peek().filter(|t| t.kind == TokenKind::Ident);
                    let Some(sub) = sub else {
                        return Err(self.eof_error("expected a subtype name after `/`"));
                    };
                    self.bump();
                    subtype = Some((lexer::token_text(self.source, &sub).to_owned(), sub.start()));
                }
                self.parse_node_body(kind, subtype)
            }
            TokenKind::Underscore => {
                self.bump();
                self.parse_node_body(None, None)
            }
            _ => {
                // `((a) (b) ...)`: a group of sibling items.
                let mut children = Vec::new();
                let mut anchor_end = false;
                self.parse_children(&mut children, &mut anchor_end)?;
                Ok(ExprAst::Siblings {
                    children,
                    anchor_end,
                })
            }
        }
    }

    fn parse_node_body(
        &mut self,
        kind: Option<(String, usize)>,
        subtype: Option<(String, usize)>,
    ) -> Result<ExprAst, QueryError> {
        let mut children = Vec::new();
        let mut negated_fields = Vec::new();
        let mut anchor_end = false;
        loop {
            let Some(token) = self.peek() else {
                return Err(self.eof_error("unclosed `(`"));
            };
            match token.kind {
                TokenKind::RParen => {
                    self.bump();
                    return Ok(ExprAst::Node {
                        kind,
                        subtype,
                        children,
                        negated_fields,
                        anchor_end,
                    });
                }
                TokenKind::Bang => {
                    self.bump();
                    let name = self.expect_ident("negated field name")?;
                    negated_fields.push((name, token.start()));
                }
                _ => self.parse_child(&mut children, &mut anchor_end)?,
            }
        }
    }

    fn parse_children(
        &mut self,
        children: &mut Vec<ItemAst>,
        anchor_end: &mut bool,
    ) -> Result<(), QueryError> {
        loop {
            let Some(token) = self.peek() else {
                return Err(self.eof_error("unclosed `(`"));
            };
            if token.kind == TokenKind::RParen {
                self.bump();
                return Ok(());
            }
            self.parse_child(children, anchor_end)?;
        }
    }

    fn parse_child(
        &mut self,
        children: &mut Vec<ItemAst>,
        anchor_end: &mut bool,
    ) -> Result<(), QueryError> {
        let Some(token) = self.peek() else {
            return Err(self.eof_error("unclosed `(`"));
        };
        match token.kind {
            TokenKind::Dot => {
                self.bump();
                if self.peek_kind() == Some(TokenKind::RParen) {
                    *anchor_end = true;
                } else {
                    let child = self.parse_item(true)?;
                    children.push(child);
                }
                Ok(())
            }
            TokenKind::LParen if self.peek_kind_at(1) == Some(TokenKind::Hash) => {
                let predicate = self.parse_predicate()?;
                self.predicates.push(predicate);
                Ok(())
            }
            _ => {
                children.push(self.parse_item(false)?);
                Ok(())
            }
        }
    }

    fn parse_predicate(&mut self) -> Result<PredicateAst, QueryError> {
        let start = self.next_offset();
        self.bump();
        self.bump();

        let Some(name) = self.peek().filter(|t| t.kind == TokenKind::Ident) else {
            return Err(QueryError::new(
                start,
                QueryErrorKind::Syntax,
                "expected a predicate name after `#`",
            ));
        };
        self.bump();
        let mut operator = lexer::token_text(self.source, &name).to_owned();

        // `eq` + adjacent `?` is the operator `eq?`; likewise `set` + `!`.
        match self.peek() {
            Some(t) if t.kind == TokenKind::Question && t.start() == name.end() => {
                operator.push('?');
                self.bump();
            }
            Some(t) if t.kind == TokenKind::Bang && t.start() == name.end() => {
                operator.push('!');
                self.bump();
            }
            _ => {
                return Err(QueryError::new(
                    name.start(),
                    QueryErrorKind::Syntax,
                    "predicate name must end with `?` or `!`",
                ));
            }
        }

        let mut args = Vec::new();
        loop {
            let Some(token) = self.peek() else {
                return Err(self.eof_error("unclosed predicate"));
            };
            match token.kind {
                TokenKind::RParen => {
                    self.bump();
                    return Ok(PredicateAst {
                        operator,
                        args,
                        start,
                    });
                }
                TokenKind::At => {
                    self.bump();
                    let name = self.expect_ident("capture name")?;
                    args.push(PredArgAst::Capture {
                        name,
                        offset: token.start(),
                    });
                }
                TokenKind::StringLiteral => {
                    self.bump();
                    let raw = lexer::token_text(self.source, &token);
                    args.push(PredArgAst::Literal {
                        value: lexer::unescape_string(raw),
                        offset: token.start(),
                    });
                }
                TokenKind::Ident => {
                    self.bump();
                    args.push(PredArgAst::Literal {
                        value: lexer::token_text(self.source, &token).to_owned(),
                        offset: token.start(),
                    });
                }
                _ => {
                    return Err(QueryError::new(
                        token.start(),
                        QueryErrorKind::Syntax,
                        "expected a capture or string predicate argument",
                    ));
                }
            }
        }
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn peek_kind_at(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + n).map(|t| t.kind)
    }

    fn bump(&mut self) {
        if let Some(token) = self.tokens.get(self.pos) {
            self.last_end = token.end();
            self.pos += 1;
        }
    }

    fn next_offset(&self) -> usize {
        self.peek().map_or(self.source.len(), |t| t.start())
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, QueryError> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Ident => {
                self.bump();
                Ok(lexer::token_text(self.source, &token).to_owned())
            }
            Some(token) => Err(QueryError::new(
                token.start(),
                QueryErrorKind::Syntax,
                format!("expected a {what}"),
            )),
            None => Err(self.eof_error(format!("expected a {what}"))),
        }
    }

    fn eof_error(&self, message: impl Into<String>) -> QueryError {
        QueryError::new(self.source.len(), QueryErrorKind::Syntax, message)
    }
}

fn combine(a: Quant, b: Quant) -> Quant {
    use Quant::*;
    match (a, b) {
        (One, q) | (q, One) => q,
        (ZeroOrOne, ZeroOrOne) => ZeroOrOne,
        (OneOrMore, OneOrMore) => OneOrMore,
        _ => ZeroOrMore,
    }
}
