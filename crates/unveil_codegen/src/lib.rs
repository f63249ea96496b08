//! Printer from residual trees back to JS source.
//!
//! Minimal parenthesization by operator precedence and associativity,
//! two-space indentation, one statement per line. Number and string
//! formatting follow the language's own conversions so printed literals
//! re-parse to the same values.

mod number;
mod printer;

pub use number::format_number;
pub use printer::{print_expression, print_program, print_statements};

#[cfg(test)]
mod tests;
