/*!
# Rust Language Module

This Rust module provides lexical analysis and parsing of the BASIC
statements a session can execute.

*/

pub type LineNumber = Option<u16>;
pub type Column = std::ops::Range<usize>;

pub trait MaxValue<T> {
    fn max_value() -> T;
}

impl MaxValue<u16> for LineNumber {
    fn max_value() -> u16 {
        65529
    }
}

#[macro_use]
mod error;
mod lex;
mod line;
mod parse;
mod token;

pub mod ast;
pub use error::Error;
pub use error::ErrorCode;
pub use lex::{lex, lex_direct};
pub use line::Line;
pub use parse::{parse, parse_expression};
pub use token::{Literal, Operator, Token, Word};
