//! RAII context guard.
//!
//! Every pushed [`ExecutionContext`] must be popped on all exits, including
//! error paths. The guard holds `&mut Evaluator` and pops on drop; `Deref`
//! gives transparent access to the evaluator while the guard is alive.

use std::ops::{Deref, DerefMut};

use crate::frames::ExecutionContext;

use super::Evaluator;

/// Guard that pops the pushed context when dropped.
pub struct ScopedEvaluator<'guard, 'a> {
    evaluator: &'guard mut Evaluator<'a>,
}

impl Drop for ScopedEvaluator<'_, '_> {
    fn drop(&mut self) {
        self.evaluator.stack.pop();
    }
}

impl<'a> Deref for ScopedEvaluator<'_, 'a> {
    type Target = Evaluator<'a>;

    fn deref(&self) -> &Self::Target {
        self.evaluator
    }
}

impl DerefMut for ScopedEvaluator<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.evaluator
    }
}

impl<'a> Evaluator<'a> {
    /// Push `context` and return a guard that pops it on drop.
    pub(crate) fn scoped(&mut self, context: ExecutionContext) -> ScopedEvaluator<'_, 'a> {
        self.stack.push(context);
        ScopedEvaluator { evaluator: self }
    }
}
