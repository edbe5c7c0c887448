//! S-expression pattern queries over Salix syntax trees.
//!
//! [`Query::new`] compiles pattern source against a language, resolving
//! node kinds, fields, captures, and predicates up front. A
//! [`QueryCursor`] then runs the compiled patterns over a subtree,
//! yielding matches in discovery order or flat captures in position
//! order.

mod ast;
mod compile;
mod cursor;
mod error;
mod lexer;
mod parser;
mod query;

#[cfg(test)]
mod test_grammar;

#[cfg(test)]
mod query_tests;

pub use cursor::{QueryCapture, QueryCursor, QueryMatch, QueryOptions, QueryProgress};
pub use error::{QueryError, QueryErrorKind};
pub use query::{CaptureQuantifier, Query, QueryPredicate, QueryPredicateArg, QueryProperty};
