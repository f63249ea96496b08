//! Statement arms: declarations, `if`, `return`, `break`, labels, `try`.

use unveil_ast::{
    CatchClause, DeclarationKind, Expression, Name, Statement, TryStatement, VariableDeclarator,
};

use crate::control::Step;
use crate::diagnostics::{not_implemented, reference_unresolved, ErrorKind, EvalError};
use crate::frames::{ContextKind, ExecutionContext};
use crate::lift::repr;
use crate::{Environment, TaintedValue, Value};

use super::assign::stored_carrier;
use super::expr::leak_branch_locals;
use super::{concrete, Evaluator, StmtOutcome};

impl Evaluator<'_> {
    pub(super) fn eval_variable_declaration(
        &mut self,
        kind: DeclarationKind,
        declarations: &[VariableDeclarator],
    ) -> Result<StmtOutcome, EvalError> {
        if kind != DeclarationKind::Var {
            return Err(not_implemented(format!("{kind} declaration")));
        }
        let mut out = Vec::with_capacity(declarations.len());
        for declarator in declarations {
            let Some(name) = declarator.target.as_identifier() else {
                return Err(not_implemented("destructuring declarator"));
            };
            let env = self.env()?;
            env.declare(name);
            let init = match &declarator.init {
                None => None,
                Some(init) => {
                    let carrier = self.eval_expr(init)?;
                    if carrier.tainted() {
                        env.assign(name, carrier.clone());
                    } else {
                        let value = concrete(&carrier)?.clone();
                        env.assign(name, stored_carrier(name, value));
                    }
                    Some(repr(&carrier)?)
                }
            };
            out.push(VariableDeclarator {
                target: declarator.target.clone(),
                init,
            });
        }
        Ok((
            Step::Normal,
            Some(Statement::VariableDeclaration {
                kind: DeclarationKind::Var,
                declarations: out,
            }),
        ))
    }

    pub(super) fn eval_if(
        &mut self,
        test: &Expression,
        consequent: &Statement,
        alternate: Option<&Statement>,
    ) -> Result<StmtOutcome, EvalError> {
        let t = self.eval_expr(test)?;
        if !t.tainted() {
            // A decided test executes the chosen branch in the current
            // context and discards the other entirely.
            return match (concrete(&t)?.is_truthy(), alternate) {
                (true, _) => self.eval_stmt(consequent),
                (false, Some(alternate)) => self.eval_stmt(alternate),
                (false, None) => Ok((Step::Normal, None)),
            };
        }
        let residual = self.eval_if_ambiguous(&t, consequent, alternate)?;
        Ok((Step::Normal, Some(residual)))
    }

    /// Build the residual `if` for an already-evaluated tainted test.
    /// Nested `else if` chains keep their structure: each level's test is
    /// evaluated once in the current scope, its branches under the gate.
    fn eval_if_ambiguous(
        &mut self,
        test: &TaintedValue,
        consequent: &Statement,
        alternate: Option<&Statement>,
    ) -> Result<Statement, EvalError> {
        let cons_residual = self
            .eval_ambiguous_stmt(consequent, ContextKind::If, false)?
            .unwrap_or(Statement::Empty);
        let alt_residual = match alternate {
            None => None,
            Some(Statement::If {
                test: nested_test,
                consequent: nested_cons,
                alternate: nested_alt,
            }) => {
                let nested = self.eval_expr(nested_test)?;
                Some(self.eval_if_ambiguous(&nested, nested_cons, nested_alt.as_deref())?)
            }
            Some(other) => self.eval_ambiguous_stmt(other, ContextKind::If, false)?,
        };
        Ok(Statement::If {
            test: repr(test)?,
            consequent: Box::new(cons_residual),
            alternate: alt_residual.map(Box::new),
        })
    }

    /// Simplify a statement under ambiguous flow: fresh child scope with
    /// the parent-write gate up (and reference tolerance when requested),
    /// then leak branch-declared names into the parent as tainted
    /// references. A catchable error inside the branch recovers to its
    /// error-state residual instead of aborting the evaluation.
    pub(super) fn eval_ambiguous_stmt(
        &mut self,
        stmt: &Statement,
        kind: ContextKind,
        tolerant: bool,
    ) -> Result<Option<Statement>, EvalError> {
        let parent = self.env()?;
        let child = parent.child();
        child.set_taint_parent_writes(true);
        if tolerant {
            child.set_ignore_reference_exception(true);
        }
        let result = {
            let mut scoped = self.scoped(ExecutionContext::new(child.clone(), kind));
            scoped.eval_stmt(stmt)
        };
        leak_branch_locals(&parent, &child);
        match result {
            Ok((_, residual)) => Ok(residual),
            Err(mut err) if err.is_catchable() => match err.error_state.take() {
                Some(state) => Ok(Some(Statement::Block(state))),
                None => Ok(Some(stmt.clone())),
            },
            Err(err) => Err(err),
        }
    }

    pub(super) fn eval_return(
        &mut self,
        argument: Option<&Expression>,
    ) -> Result<StmtOutcome, EvalError> {
        let carrier = match argument {
            Some(expr) => self.eval_expr(expr)?,
            None => TaintedValue::undefined(),
        };
        let residual = Statement::Return(match argument {
            Some(_) => Some(repr(&carrier)?),
            None => None,
        });
        let env = self.env()?;
        let Some(function) = self.stack.innermost_function() else {
            return Err(not_implemented("return outside of a function"));
        };
        let function_env = function.environment.clone();
        if env.is_tainted_env(Some(&function_env)) {
            // The return is conditional: later writes in the function body
            // may be skipped at runtime, so they must degrade.
            function_env.set_taint_parent_writes(true);
            Ok((Step::Normal, Some(residual)))
        } else {
            Ok((Step::Returning(carrier), Some(residual)))
        }
    }

    pub(super) fn eval_break(&mut self, label: Option<Name>) -> Result<StmtOutcome, EvalError> {
        let Some(target) = self.stack.innermost_breakable(label) else {
            let what = match label {
                Some(label) => self.name_str(label).to_owned(),
                None => "break target".to_owned(),
            };
            return Err(reference_unresolved(what));
        };
        let target_env = target.environment.clone();
        let env = self.env()?;
        let residual = Statement::Break { label };
        if env.is_tainted_env(Some(&target_env)) {
            target_env.set_taint_parent_writes(true);
            Ok((Step::Normal, Some(residual)))
        } else {
            Ok((Step::Breaking(label), Some(residual)))
        }
    }

    pub(super) fn eval_labeled(
        &mut self,
        label: Name,
        body: &Statement,
    ) -> Result<StmtOutcome, EvalError> {
        let env = self.env()?.child();
        let (step, residual) = {
            let mut scoped =
                self.scoped(ExecutionContext::labeled(env, ContextKind::Label, label));
            scoped.eval_stmt(body)?
        };
        let step = match step {
            Step::Breaking(Some(broken)) if broken == label => Step::Normal,
            other => other,
        };
        let residual = residual.map(|body| Statement::Labeled {
            label,
            body: Box::new(body),
        });
        Ok((step, residual))
    }

    pub(super) fn eval_try(&mut self, try_stmt: &TryStatement) -> Result<StmtOutcome, EvalError> {
        let (mut step, block_residual, caught) = match self.eval_stmt_list(&try_stmt.block) {
            Ok((step, residual)) => (step, residual, None),
            Err(mut err) => {
                if !err.is_catchable() {
                    // Internal diagnostics short-circuit every handler.
                    return Err(err);
                }
                let state = err.error_state.take().unwrap_or_default();
                if try_stmt.handler.is_none() {
                    // try/finally without a handler: run the finalizer for
                    // its effects, then re-raise.
                    if let Some(finalizer) = &try_stmt.finalizer {
                        self.eval_stmt_list(finalizer)?;
                    }
                    return Err(err.with_error_state(state));
                }
                (Step::Normal, state, Some(err))
            }
        };

        let handler_residual = match (&try_stmt.handler, caught) {
            (Some(handler), Some(err)) => {
                let (catch_step, residual) = self.eval_catch_concrete(handler, err)?;
                if catch_step.is_abrupt() {
                    step = catch_step;
                }
                Some(residual)
            }
            (Some(handler), None) => Some(self.eval_catch_simplified(handler)?),
            (None, _) => None,
        };

        let finalizer_residual = match &try_stmt.finalizer {
            Some(finalizer) => {
                let (finalizer_step, residual) = self.eval_stmt_list(finalizer)?;
                if finalizer_step.is_abrupt() {
                    step = finalizer_step;
                }
                Some(residual)
            }
            None => None,
        };

        let residual = Statement::Try(Box::new(TryStatement {
            block: block_residual,
            handler: handler_residual,
            finalizer: finalizer_residual,
        }));
        Ok((step, Some(residual)))
    }

    /// The exception path: the catch body runs concretely, its parameter
    /// bound untainted to the runtime error value.
    fn eval_catch_concrete(
        &mut self,
        handler: &CatchClause,
        err: EvalError,
    ) -> Result<(Step, CatchClause), EvalError> {
        let param = match &handler.param {
            None => None,
            Some(pattern) => match pattern.as_identifier() {
                Some(name) => Some(name),
                None => return Err(not_implemented("destructuring catch parameter")),
            },
        };
        let error_value = match err.kind {
            ErrorKind::Thrown(carrier) => *carrier,
            ErrorKind::NotImplemented(msg) | ErrorKind::ReferenceUnresolved(msg) => {
                TaintedValue::of(Value::str(msg))
            }
            ErrorKind::InternalInvariant(_) => return Err(err),
        };
        let env = self.env()?.child();
        if let Some(name) = param {
            env.declare(name);
            env.assign(name, error_value);
        }
        let (step, body) = {
            let mut scoped = self.scoped(ExecutionContext::new(env, ContextKind::Catch));
            scoped.eval_stmt_list(&handler.body)?
        };
        Ok((
            step,
            CatchClause {
                param: handler.param.clone(),
                body,
            },
        ))
    }

    /// The no-exception path: the catch is simplified as if it never ran,
    /// its parameter bound tainted, its body processed under ambiguous
    /// flow, the environment restored afterwards.
    fn eval_catch_simplified(
        &mut self,
        handler: &CatchClause,
    ) -> Result<CatchClause, EvalError> {
        let parent = self.env()?;
        let child = parent.child();
        child.set_taint_parent_writes(true);
        child.set_ignore_reference_exception(true);
        if let Some(name) = handler.param.as_ref().and_then(|p| p.as_identifier()) {
            child.declare_tainted_ref(name);
        }
        let result = {
            let mut scoped = self.scoped(ExecutionContext::new(child.clone(), ContextKind::Catch));
            scoped.eval_stmt_list(&handler.body)
        };
        leak_catch_locals(&parent, &child, handler);
        let body = match result {
            Ok((_, residual)) => residual,
            Err(mut err) if err.is_catchable() => {
                err.error_state.take().unwrap_or_else(|| handler.body.clone())
            }
            Err(err) => return Err(err),
        };
        Ok(CatchClause {
            param: handler.param.clone(),
            body,
        })
    }
}

/// Leak catch-declared names (but not the error parameter itself) into the
/// parent as tainted references.
fn leak_catch_locals(parent: &Environment, child: &Environment, handler: &CatchClause) {
    let param = handler.param.as_ref().and_then(|p| p.as_identifier());
    for name in child.local_names() {
        if Some(name) == param {
            continue;
        }
        parent.declare_tainted_ref(name);
    }
}
