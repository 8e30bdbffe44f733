//! SOQL parsing.
//!
//! A hand-rolled tokenizer and recursive-descent parser for the SOQL subset
//! the validator reasons about: select lists with dot-paths, aggregates and
//! child subqueries, boolean WHERE trees, GROUP BY / ORDER BY, LIMIT and
//! OFFSET. The output is an immutable [`ast::ParsedQueryAst`] built once per
//! candidate query string.

pub mod ast;
pub mod soql;

use thiserror::Error;

pub use ast::{
    AggregateCall, CompareOp, Comparison, OrderBy, ParentLookup, ParsedQueryAst, SoqlValue,
    Subquery, WhereExpr,
};
pub use soql::parse_soql;

/// Errors produced while parsing a candidate SOQL string.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unexpected end of query, expected {expected}")]
    UnexpectedEof { expected: String },

    #[error("unexpected token '{found}' at position {position}, expected {expected}")]
    UnexpectedToken {
        found: String,
        position: usize,
        expected: String,
    },

    #[error("unterminated string literal starting at position {position}")]
    UnterminatedString { position: usize },

    #[error("invalid number literal '{literal}'")]
    InvalidNumber { literal: String },
}
