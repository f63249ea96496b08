//! Taint-propagating partial evaluator for the unveil deobfuscator.
//!
//! The evaluator walks a parsed tree, folds every statically determinable
//! value, and rewrites every indeterminate construct into a minimal
//! residual form, preserving observable behavior.
//!
//! # Architecture
//!
//! - [`TaintedValue`]: the universal carrier — concrete value, residual
//!   fragment, taint flag
//! - [`Environment`]: scope records with the taint gates
//!   (parent writes, parent reads, reference tolerance)
//! - [`Callstack`]: execution contexts driving `return`/`break`
//! - [`Evaluator`]: the recursive dispatch, one arm per tree shape
//! - [`lift`]/[`repr`]: concrete values back to literal fragments
//! - `evaluate_binary`/`evaluate_unary`: JS operator semantics over the
//!   supported value model

mod carrier;
pub mod coerce;
mod control;
pub mod diagnostics;
mod environment;
mod evaluator;
mod frames;
mod lift;
mod operators;
mod stack;
mod unary_operators;

pub use carrier::{ClosureData, ClosureHandle, SharedArray, TaintedValue, Value};
pub use control::Step;
pub use diagnostics::{ErrorKind, EvalError, EvalResult};
pub use environment::{Environment, MemberStep};
pub use evaluator::{Evaluator, ScopedEvaluator};
pub use frames::{Callstack, ContextKind, ExecutionContext};
pub use lift::{lift, repr};
pub use operators::{evaluate_binary, loose_equals, strict_equals};
pub use stack::ensure_sufficient_stack;
pub use unary_operators::evaluate_unary;

#[cfg(test)]
mod tests;
