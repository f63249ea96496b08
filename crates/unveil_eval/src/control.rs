//! Non-local control as an explicit discriminant.
//!
//! Statement evaluation never unwinds for control flow: every statement
//! yields a [`Step`], and each construct that can intercept `return` or
//! `break` does so by matching on it.

use unveil_ast::Name;

use crate::TaintedValue;

/// Control outcome of a statement.
#[derive(Debug)]
pub enum Step {
    /// Execution continues normally.
    Normal,
    /// A concrete `return` is unwinding to the nearest function context.
    Returning(TaintedValue),
    /// A concrete `break` is unwinding to the nearest loop/switch context
    /// or the matching label.
    Breaking(Option<Name>),
}

impl Step {
    /// Whether this step propagates past the current statement list.
    pub fn is_abrupt(&self) -> bool {
        !matches!(self, Step::Normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abruptness() {
        assert!(!Step::Normal.is_abrupt());
        assert!(Step::Returning(TaintedValue::undefined()).is_abrupt());
        assert!(Step::Breaking(None).is_abrupt());
    }
}
