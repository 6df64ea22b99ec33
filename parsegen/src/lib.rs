//! Parsing engine primitives.
//!
//! Parsers are composed as `Expr` values and registered with `Rules`, which
//! hands out deferred `Handle`s so rules can be mutually recursive. Input is a
//! stream of chars annotated with positions; no lexing is involved.

use anyhow::Result;

mod chart;
mod error;
mod expr;
mod forest;
mod position;
mod predicate;
mod tokens;
mod value;

pub use chart::Rules;
pub use error::ParseError;
pub use expr::{Expr, Handle};
pub use position::Position;
pub use predicate::{write_char_literal, Predicate};
pub use tokens::{text, Token};
pub use value::{Constructor, Sem, Value};

pub trait Parser {
    fn parse(&self, input: &str) -> Result<Value>;
}
