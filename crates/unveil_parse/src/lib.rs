//! Lexer and parser for the unveil deobfuscator's JS subset.
//!
//! The lexer is hand-written because `/` needs parser context to decide
//! between division and a regex literal. The parser is recursive descent
//! with precedence climbing and just enough ASI to accept real-world
//! obfuscated output.

mod error;
mod lexer;
mod parser;
mod token;

pub use error::ParseError;
pub use parser::{parse_expression, parse_program};
