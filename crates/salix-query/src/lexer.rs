//! Lexer for the query pattern language.
//!
//! Produces span-based tokens without storing text - text is sliced from
//! source only when needed.
//!
//! ## Error handling
//!
//! The lexer coalesces consecutive error characters into single `Garbage`
//! tokens rather than producing one error per character. The parser turns a
//! `Garbage` token into a syntax error at its offset.

use std::ops::Range;

use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum TokenKind {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("_")]
    Underscore,
    #[token("/")]
    Slash,
    #[token(":")]
    Colon,
    #[token("!")]
    Bang,
    #[token("?")]
    Question,
    #[token("*")]
    Star,
    #[token("+")]
    Plus,
    #[token(".")]
    Dot,
    #[token("@")]
    At,
    #[token("#")]
    Hash,

    #[regex(r#""(?:[^"\\\n]|\\.)*""#)]
    StringLiteral,

    #[regex(r"[a-zA-Z][a-zA-Z0-9_.\-]*")]
    Ident,

    /// `;` line comment, dropped during tokenization.
    #[regex(r";[^\n]*", allow_greedy = true)]
    Comment,

    /// One or more consecutive characters the lexer could not match.
    Garbage,
}

/// Zero-copy token: kind + span, text retrieved via [`token_text`] when needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: (usize, usize),
}

impl Token {
    fn new(kind: TokenKind, span: Range<usize>) -> Self {
        Self {
            kind,
            span: (span.start, span.end),
        }
    }

    pub fn start(&self) -> usize {
        self.span.0
    }

    pub fn end(&self) -> usize {
        self.span.1
    }
}

/// Tokenizes pattern source, coalescing consecutive lexer errors into
/// single `Garbage` tokens.
pub fn lex(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(source);
    let mut error_span: Option<Range<usize>> = None;

    loop {
        match lexer.next() {
            Some(Ok(kind)) => {
                if let Some(span) = error_span.take() {
                    tokens.push(Token::new(TokenKind::Garbage, span));
                }
                if kind != TokenKind::Comment {
                    tokens.push(Token::new(kind, lexer.span()));
                }
            }
            Some(Err(())) => match &mut error_span {
                Some(span) => span.end = lexer.span().end,
                None => error_span = Some(lexer.span()),
            },
            None => {
                if let Some(span) = error_span.take() {
                    tokens.push(Token::new(TokenKind::Garbage, span));
                }
                break;
            }
        }
    }

    tokens
}

/// Retrieves the text slice for a token. O(1) slice into source.
pub fn token_text<'q>(source: &'q str, token: &Token) -> &'q str {
    &source[token.span.0..token.span.1]
}

/// Decodes the content of a `StringLiteral` token, resolving escapes.
pub fn unescape_string(raw: &str) -> String {
    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => break,
        }
    }
    out
}
