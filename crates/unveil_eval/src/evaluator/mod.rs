//! The partial evaluator.
//!
//! `Evaluator` walks the input tree, folds everything statically
//! determinable, and rewrites the rest into residual form. Exactly one
//! dispatch arm exists per tree shape; the arms live in the submodules:
//!
//! - `expr` — literals, operators, sequences, conditionals, arrays
//! - `member` — member reads and residual member-node construction
//! - `assign` — assignment targets and the member-path case matrix
//! - `stmt` — declarations, `if`, `try`, labels, `return`/`break`
//! - `loops` — two-mode loop execution and fixed-point simplification
//! - `func` — closures, sandbox simplification, calls
//!
//! Statement arms return their residual fragment to the caller together
//! with a control [`Step`]; whether the fragment is appended to the output
//! or collected into an enclosing construct is the caller's decision, so
//! there is no ambient emission flag to restore on unwind.

mod assign;
mod expr;
mod func;
mod guard;
mod loops;
mod member;
mod stmt;

pub use guard::ScopedEvaluator;

use unveil_ast::{Expression, Name, Program, Statement, StringInterner};

use crate::control::Step;
use crate::diagnostics::{internal_invariant, not_implemented, EvalError, EvalResult};
use crate::frames::{Callstack, ContextKind, ExecutionContext};
use crate::lift::repr;
use crate::stack::ensure_sufficient_stack;
use crate::{Environment, TaintedValue, Value};

/// Statement outcome: the control step plus the residual fragment.
pub(crate) type StmtOutcome = (Step, Option<Statement>);

/// The taint-propagating partial evaluator.
pub struct Evaluator<'a> {
    pub(crate) interner: &'a StringInterner,
    pub(crate) stack: Callstack,
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator over the given interner.
    pub fn new(interner: &'a StringInterner) -> Self {
        Evaluator {
            interner,
            stack: Callstack::new(),
        }
    }

    /// Evaluate a whole program, yielding the residual top-level statements.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn run(&mut self, program: &Program) -> Result<Vec<Statement>, EvalError> {
        let root = Environment::new_root();
        let mut scoped = self.scoped(ExecutionContext::new(root, ContextKind::Program));
        let (_, residual) = scoped.eval_stmt_list(&program.body)?;
        Ok(residual)
    }

    /// The current environment (top of the callstack).
    pub(crate) fn env(&self) -> Result<Environment, EvalError> {
        self.stack.environment()
    }

    /// Source text of an interned name.
    pub(crate) fn name_str(&self, name: Name) -> &'static str {
        self.interner.lookup(name)
    }

    /// Evaluate one expression to a carrier.
    pub fn eval_expr(&mut self, expr: &Expression) -> EvalResult {
        ensure_sufficient_stack(|| self.eval_expr_inner(expr))
    }

    fn eval_expr_inner(&mut self, expr: &Expression) -> EvalResult {
        match expr {
            Expression::Identifier(name) => match *name {
                // The global constants read as themselves; `undefined` in
                // particular must never touch the scope chain.
                Name::UNDEFINED => Ok(TaintedValue::undefined()),
                Name::NAN => Ok(TaintedValue::of(Value::Num(f64::NAN))),
                Name::INFINITY => Ok(TaintedValue::of(Value::Num(f64::INFINITY))),
                name => self.env()?.resolve(name, self.name_str(name)),
            },
            Expression::String(s) => Ok(TaintedValue::of(Value::Str(s.clone()))),
            Expression::Number(n) => Ok(TaintedValue::of(Value::Num(*n))),
            Expression::Boolean(b) => Ok(TaintedValue::of(Value::Bool(*b))),
            Expression::Null => Ok(TaintedValue::of(Value::Null)),
            Expression::Regex { pattern, flags } => Ok(TaintedValue::of(Value::Regex {
                pattern: pattern.clone(),
                flags: flags.clone(),
            })),
            Expression::BigInt(b) => Ok(TaintedValue::of(Value::BigInt(b.clone()))),
            Expression::Binary { op, left, right } => self.eval_binary(*op, left, right),
            Expression::Logical { op, left, right } => self.eval_logical(*op, left, right),
            Expression::Unary { op, argument } => self.eval_unary(*op, argument),
            Expression::Update {
                op,
                prefix,
                argument,
            } => self.eval_update(*op, *prefix, argument),
            Expression::Sequence(expressions) => self.eval_sequence(expressions),
            Expression::Assignment { op, target, value } => {
                self.eval_assignment(*op, target, value)
            }
            Expression::Member {
                object,
                property,
                computed,
                optional,
            } => self.eval_member(object, property, *computed, *optional),
            Expression::Conditional {
                test,
                consequent,
                alternate,
            } => self.eval_conditional(test, consequent, alternate),
            Expression::Array(elements) => self.eval_array(elements),
            Expression::Function(function) => self.eval_function_expression(function),
            Expression::Call { callee, arguments } => self.eval_call(callee, arguments),
        }
    }

    /// Evaluate one statement to a control step and a residual fragment.
    pub(crate) fn eval_stmt(&mut self, stmt: &Statement) -> Result<StmtOutcome, EvalError> {
        ensure_sufficient_stack(|| self.eval_stmt_inner(stmt))
    }

    fn eval_stmt_inner(&mut self, stmt: &Statement) -> Result<StmtOutcome, EvalError> {
        match stmt {
            Statement::Expression(expr) => {
                let carrier = self.eval_expr(expr)?;
                Ok((Step::Normal, Some(Statement::Expression(repr(&carrier)?))))
            }
            Statement::Block(stmts) => {
                let (step, residual) = self.eval_stmt_list(stmts)?;
                let block = if residual.is_empty() {
                    None
                } else {
                    Some(Statement::Block(residual))
                };
                Ok((step, block))
            }
            Statement::VariableDeclaration { kind, declarations } => {
                self.eval_variable_declaration(*kind, declarations)
            }
            Statement::FunctionDeclaration(function) => {
                self.eval_function_declaration(function)
            }
            Statement::If {
                test,
                consequent,
                alternate,
            } => self.eval_if(test, consequent, alternate.as_deref()),
            Statement::While { test, body } => self.eval_while(test, body),
            Statement::DoWhile { body, test } => self.eval_do_while(body, test),
            Statement::For {
                init,
                test,
                update,
                body,
            } => self.eval_for(init.as_ref(), test.as_ref(), update.as_ref(), body),
            Statement::Return(argument) => self.eval_return(argument.as_ref()),
            Statement::Try(try_stmt) => self.eval_try(try_stmt),
            Statement::Labeled { label, body } => self.eval_labeled(*label, body),
            Statement::Break { label } => self.eval_break(*label),
            Statement::Continue { .. } => Err(not_implemented("continue statement")),
            Statement::Empty => Ok((Step::Normal, None)),
        }
    }

    /// Evaluate a statement list, collecting non-empty residuals.
    ///
    /// Stops at the first abrupt step. On an error raised by a
    /// sub-statement, the error leaves carrying the collected prefix, the
    /// faulting original statement, and the unreached statements verbatim —
    /// the recovery state an enclosing `try` consumes.
    pub(crate) fn eval_stmt_list(
        &mut self,
        stmts: &[Statement],
    ) -> Result<(Step, Vec<Statement>), EvalError> {
        let mut residual = Vec::with_capacity(stmts.len());
        for (index, stmt) in stmts.iter().enumerate() {
            match self.eval_stmt(stmt) {
                Ok((step, fragment)) => {
                    if let Some(fragment) = fragment {
                        if !matches!(fragment, Statement::Empty) {
                            residual.push(fragment);
                        }
                    }
                    if step.is_abrupt() {
                        return Ok((step, residual));
                    }
                }
                Err(err) => {
                    let mut state = residual;
                    state.push(stmt.clone());
                    state.extend(stmts[index + 1..].iter().cloned());
                    return Err(err.with_error_state(state));
                }
            }
        }
        Ok((Step::Normal, residual))
    }
}

/// The concrete value of an untainted carrier.
///
/// An untainted carrier without a value is ill-formed; surfacing that as an
/// internal invariant here keeps the arms free of unwraps.
pub(crate) fn concrete(carrier: &TaintedValue) -> Result<&Value, EvalError> {
    carrier
        .value()
        .ok_or_else(|| internal_invariant("untainted carrier without a concrete value"))
}
