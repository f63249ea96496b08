//! Evaluation diagnostics.
//!
//! Three diagnostic kinds plus the runtime `Thrown` value produced by the
//! `throw` operator. `InternalInvariant` is never user-catchable; everything
//! else can be intercepted by an evaluated `try`.

use std::fmt;

use unveil_ast::Statement;

use crate::TaintedValue;

/// Result alias for expression evaluation.
pub type EvalResult = Result<TaintedValue, EvalError>;

/// What went wrong.
#[derive(Debug)]
pub enum ErrorKind {
    /// A tree shape or operator outside the supported subset.
    NotImplemented(String),
    /// An identifier or break label that resolves nowhere.
    ReferenceUnresolved(String),
    /// A broken evaluator invariant. Never catchable.
    InternalInvariant(String),
    /// A runtime value raised by the `throw` operator.
    Thrown(Box<TaintedValue>),
}

/// Evaluation error.
///
/// `error_state` carries the residual recovered from a failing statement
/// list: the simplified prefix, the original faulting statement, and the
/// unreached statements verbatim. `try` consumes it to build the residual
/// try block.
#[derive(Debug)]
pub struct EvalError {
    pub kind: ErrorKind,
    pub error_state: Option<Vec<Statement>>,
}

impl EvalError {
    /// Create an error with no recovery state.
    pub fn new(kind: ErrorKind) -> Self {
        EvalError {
            kind,
            error_state: None,
        }
    }

    /// Whether an evaluated `try` may intercept this error.
    pub fn is_catchable(&self) -> bool {
        !matches!(self.kind, ErrorKind::InternalInvariant(_))
    }

    /// Replace the recovery state. Each enclosing statement list overwrites
    /// with its own view; the innermost enclosing `try` consumes the result.
    #[must_use]
    pub fn with_error_state(mut self, state: Vec<Statement>) -> Self {
        self.error_state = Some(state);
        self
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::NotImplemented(what) => write!(f, "not implemented: {what}"),
            ErrorKind::ReferenceUnresolved(name) => write!(f, "unresolved reference: {name}"),
            ErrorKind::InternalInvariant(msg) => write!(f, "internal invariant violated: {msg}"),
            ErrorKind::Thrown(value) => match value.value() {
                Some(crate::Value::Str(s)) => write!(f, "uncaught exception: {s}"),
                _ => write!(f, "uncaught exception"),
            },
        }
    }
}

impl std::error::Error for EvalError {}

/// An unsupported construct was reached.
#[cold]
pub fn not_implemented(what: impl Into<String>) -> EvalError {
    EvalError::new(ErrorKind::NotImplemented(what.into()))
}

/// An identifier resolved nowhere in the scope chain.
#[cold]
pub fn reference_unresolved(name: impl Into<String>) -> EvalError {
    EvalError::new(ErrorKind::ReferenceUnresolved(name.into()))
}

/// An evaluator invariant was violated.
#[cold]
pub fn internal_invariant(msg: impl Into<String>) -> EvalError {
    EvalError::new(ErrorKind::InternalInvariant(msg.into()))
}

/// A runtime value was thrown by evaluated code.
#[cold]
pub fn thrown(value: TaintedValue) -> EvalError {
    EvalError::new(ErrorKind::Thrown(Box::new(value)))
}

/// A runtime type error raised by evaluated code (still user-catchable).
#[cold]
pub fn type_error(msg: impl Into<String>) -> EvalError {
    thrown(TaintedValue::of(crate::Value::str(msg.into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    #[test]
    fn catchability() {
        assert!(not_implemented("x").is_catchable());
        assert!(reference_unresolved("x").is_catchable());
        assert!(thrown(TaintedValue::of(Value::Num(1.0))).is_catchable());
        assert!(!internal_invariant("x").is_catchable());
    }

    #[test]
    fn display_names_the_construct() {
        let err = not_implemented("let declaration");
        assert!(err.to_string().contains("let declaration"));
        let err = reference_unresolved("_0xabc");
        assert!(err.to_string().contains("_0xabc"));
    }

    #[test]
    fn error_state_round_trip() {
        let err = not_implemented("x").with_error_state(vec![Statement::Empty]);
        assert_eq!(err.error_state.as_deref(), Some(&[Statement::Empty][..]));
    }
}
