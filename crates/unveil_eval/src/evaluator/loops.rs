//! Loop arms: concrete iteration and fixed-point simplification.
//!
//! Loops run in two modes. While everything stays concrete, iterations
//! actually execute and unroll into straight-line residuals. The moment the
//! loop becomes indeterminate — a tainted test, or tainted control striking
//! the loop's own environment — the remaining behavior is simplified in an
//! isolated scope until body and test residuals stop changing, and a single
//! residual loop is emitted after the already-unrolled prefix.

use unveil_ast::{equivalent_stmts, Expression, ForInit, Statement};

use crate::control::Step;
use crate::diagnostics::EvalError;
use crate::frames::{ContextKind, ExecutionContext};
use crate::lift::repr;

use super::{concrete, Evaluator, StmtOutcome};

/// Concrete iterations executed before a loop is forced into the
/// simplification mode. Decoder loops in obfuscated samples finish well
/// under this; anything still running is treated as indeterminate.
const MAX_CONCRETE_ITERATIONS: usize = 10_000;

/// Upper bound on fixed-point passes. Convergence normally takes two or
/// three; the bound only guards against pathological inputs.
const MAX_FIXPOINT_PASSES: usize = 32;

struct LoopShape<'s> {
    test: Option<&'s Expression>,
    update: Option<&'s Expression>,
    body: &'s Statement,
    kind: ContextKind,
}

impl Evaluator<'_> {
    pub(super) fn eval_while(
        &mut self,
        test: &Expression,
        body: &Statement,
    ) -> Result<StmtOutcome, EvalError> {
        self.eval_loop(
            None,
            LoopShape {
                test: Some(test),
                update: None,
                body,
                kind: ContextKind::While,
            },
        )
    }

    pub(super) fn eval_do_while(
        &mut self,
        body: &Statement,
        test: &Expression,
    ) -> Result<StmtOutcome, EvalError> {
        self.eval_loop(
            None,
            LoopShape {
                test: Some(test),
                update: None,
                body,
                kind: ContextKind::DoWhile,
            },
        )
    }

    pub(super) fn eval_for(
        &mut self,
        init: Option<&ForInit>,
        test: Option<&Expression>,
        update: Option<&Expression>,
        body: &Statement,
    ) -> Result<StmtOutcome, EvalError> {
        self.eval_loop(
            init,
            LoopShape {
                test,
                update,
                body,
                kind: ContextKind::For,
            },
        )
    }

    fn eval_loop(
        &mut self,
        init: Option<&ForInit>,
        shape: LoopShape<'_>,
    ) -> Result<StmtOutcome, EvalError> {
        let enclosing = self.env()?;
        let mut residuals: Vec<Statement> = Vec::new();

        // A for-init runs once in the enclosing scope, so its names leak
        // outward; its residual becomes the first statement of the
        // produced block.
        if let Some(init) = init {
            match init {
                ForInit::Declaration { kind, declarations } => {
                    let (_, residual) = self.eval_variable_declaration(*kind, declarations)?;
                    residuals.extend(residual);
                }
                ForInit::Expression(expr) => {
                    let carrier = self.eval_expr(expr)?;
                    residuals.push(Statement::Expression(repr(&carrier)?));
                }
            }
        }

        let loop_env = enclosing.child();
        let body_first = shape.kind == ContextKind::DoWhile;
        let mut pending = Step::Normal;
        let mut indeterminate = false;
        let mut iterations = 0usize;

        loop {
            if !body_first {
                if let Some(test) = shape.test {
                    let t = self.eval_expr(test)?;
                    if t.tainted() {
                        indeterminate = true;
                        break;
                    }
                    if !concrete(&t)?.is_truthy() {
                        break;
                    }
                }
            }
            if iterations >= MAX_CONCRETE_ITERATIONS {
                indeterminate = true;
                break;
            }
            iterations += 1;

            let (step, body_residual) = {
                let mut scoped =
                    self.scoped(ExecutionContext::new(loop_env.clone(), shape.kind));
                scoped.eval_stmt(shape.body)?
            };
            if let Some(residual) = body_residual {
                residuals.push(residual);
            }
            if loop_env.taint_parent_writes() {
                // A tainted break or conditional return struck this loop.
                indeterminate = true;
                break;
            }
            match step {
                Step::Normal => {}
                Step::Breaking(None) => break,
                abrupt => {
                    pending = abrupt;
                    break;
                }
            }
            if body_first {
                if let Some(test) = shape.test {
                    let t = self.eval_expr(test)?;
                    if t.tainted() {
                        indeterminate = true;
                        break;
                    }
                    if !concrete(&t)?.is_truthy() {
                        break;
                    }
                }
            }
            if let Some(update) = shape.update {
                let carrier = self.eval_expr(update)?;
                // Folded update clauses (plain `i++`) leave no observable
                // fragment; assignment- and call-shaped updates keep theirs.
                if carrier.node().is_some() {
                    residuals.push(Statement::Expression(repr(&carrier)?));
                }
            }
        }

        if indeterminate {
            let simplified = self.simplify_loop(&enclosing, &shape)?;
            residuals.push(simplified);
        }

        let residual = match residuals.len() {
            0 => None,
            1 => residuals.pop(),
            _ => Some(Statement::Block(residuals)),
        };
        Ok((pending, residual))
    }

    /// Fixed-point simplification of an indeterminate loop.
    ///
    /// Body and test are re-simplified in an isolated scope (parent writes
    /// gated, unknown references tolerated) until two successive passes
    /// produce equivalent residuals. Locals are cleared between passes so a
    /// concrete value computed in one pass cannot pose as loop-invariant in
    /// the next.
    fn simplify_loop(
        &mut self,
        enclosing: &crate::Environment,
        shape: &LoopShape<'_>,
    ) -> Result<Statement, EvalError> {
        let sim_env = enclosing.child();
        sim_env.set_taint_parent_writes(true);
        sim_env.set_ignore_reference_exception(true);

        let mut previous: Option<(Vec<Statement>, Option<Expression>)> = None;
        let mut passes = 0usize;
        loop {
            passes += 1;
            sim_env.clear_locals();
            let (body, test, update) = {
                let mut scoped =
                    self.scoped(ExecutionContext::new(sim_env.clone(), shape.kind));
                let body = match scoped.eval_stmt(shape.body) {
                    Ok((_, residual)) => match residual {
                        Some(Statement::Block(stmts)) => stmts,
                        Some(other) => vec![other],
                        None => Vec::new(),
                    },
                    Err(mut err) if err.is_catchable() => {
                        // The body cannot be simplified past this point;
                        // keep the recovered prefix and stop iterating.
                        let state = err
                            .error_state
                            .take()
                            .unwrap_or_else(|| vec![shape.body.clone()]);
                        drop(scoped);
                        return self.build_loop_residual(
                            shape,
                            state,
                            shape.test.cloned(),
                            shape.update.cloned(),
                        );
                    }
                    Err(err) => return Err(err),
                };
                let test = match shape.test {
                    Some(test) => Some(repr(&scoped.eval_expr(test)?)?),
                    None => None,
                };
                let update = match shape.update {
                    Some(update) => Some(repr(&scoped.eval_expr(update)?)?),
                    None => None,
                };
                (body, test, update)
            };

            let converged = previous.as_ref().is_some_and(|(prev_body, prev_test)| {
                equivalent_stmts(prev_body, &body, self.interner)
                    && match (prev_test.as_ref(), test.as_ref()) {
                        (None, None) => true,
                        (Some(a), Some(b)) => {
                            unveil_ast::equivalent_expr(a, b, self.interner)
                        }
                        _ => false,
                    }
            });
            if converged || passes >= MAX_FIXPOINT_PASSES {
                tracing::debug!(passes, converged, "loop simplification finished");
                return self.build_loop_residual(shape, body, test, update);
            }
            previous = Some((body, test));
        }
    }

    fn build_loop_residual(
        &self,
        shape: &LoopShape<'_>,
        body: Vec<Statement>,
        test: Option<Expression>,
        update: Option<Expression>,
    ) -> Result<Statement, EvalError> {
        let body = Box::new(Statement::Block(body));
        Ok(match shape.kind {
            ContextKind::While => Statement::While {
                test: test.unwrap_or(Expression::Boolean(true)),
                body,
            },
            ContextKind::DoWhile => Statement::DoWhile {
                body,
                test: test.unwrap_or(Expression::Boolean(true)),
            },
            // The init already ran in the enclosing scope and sits in the
            // emitted prefix, so the residual for-loop has none.
            _ => Statement::For {
                init: None,
                test,
                update,
                body,
            },
        })
    }
}
