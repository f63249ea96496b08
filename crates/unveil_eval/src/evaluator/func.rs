//! Function arms: declaration-time closure building, sandbox
//! simplification, and call evaluation.
//!
//! A function produces two artifacts at declaration time. The closure
//! handle wraps the original body for concrete invocation. Separately, the
//! body is simplified in an isolated sandbox — no parent chain, unknown
//! references tolerated, parameters pre-bound as tainted references — and
//! that residual is what the output contains.

use std::rc::Rc;

use unveil_ast::{Expression, Function, Name, Pattern, Statement};

use crate::control::Step;
use crate::diagnostics::{
    internal_invariant, not_implemented, type_error, EvalError, EvalResult,
};
use crate::frames::{ContextKind, ExecutionContext};
use crate::lift::{lift, repr};
use crate::{ClosureData, ClosureHandle, Environment, TaintedValue, Value};

use super::{concrete, Evaluator, StmtOutcome};

/// Callstack depth at which concrete invocation gives up, surfacing the
/// same range error a runaway recursion would produce at runtime.
const MAX_CALL_DEPTH: usize = 2_000;

impl Evaluator<'_> {
    pub(super) fn eval_function_declaration(
        &mut self,
        function: &Rc<Function>,
    ) -> Result<StmtOutcome, EvalError> {
        let handle = self.declare_closure(function)?;
        let simplified = handle.data().simplified.clone();
        if let Some(name) = function.name {
            let env = self.env()?;
            env.declare(name);
            env.assign(
                name,
                TaintedValue::with_node(
                    Value::Function(handle),
                    Expression::Identifier(name),
                ),
            );
        }
        Ok((
            Step::Normal,
            Some(Statement::FunctionDeclaration(simplified)),
        ))
    }

    pub(super) fn eval_function_expression(
        &mut self,
        function: &Rc<Function>,
    ) -> EvalResult {
        let handle = self.declare_closure(function)?;
        let node = handle.residual_fragment();
        Ok(TaintedValue::with_node(Value::Function(handle), node))
    }

    /// Build the closure handle and the sandbox-simplified residual body.
    fn declare_closure(&mut self, function: &Rc<Function>) -> Result<ClosureHandle, EvalError> {
        if function.is_generator {
            return Err(not_implemented("generator function"));
        }
        if function.is_async {
            return Err(not_implemented("async function"));
        }
        let mut params = Vec::with_capacity(function.params.len());
        for param in &function.params {
            match param {
                Pattern::Identifier(name) => params.push(*name),
                Pattern::Rest(_) => return Err(not_implemented("rest parameter")),
                _ => return Err(not_implemented("destructuring parameter")),
            }
        }

        let sandbox = Environment::new_root();
        sandbox.set_ignore_reference_exception(true);
        for &param in &params {
            sandbox.declare_tainted_ref(param);
        }
        sandbox.declare_tainted_ref(Name::ARGUMENTS);

        let body = {
            let mut scoped =
                self.scoped(ExecutionContext::new(sandbox, ContextKind::Function));
            match scoped.eval_stmt_list(&function.body) {
                Ok((_, residual)) => residual,
                Err(mut err) if err.is_catchable() => err
                    .error_state
                    .take()
                    .unwrap_or_else(|| function.body.clone()),
                Err(err) => return Err(err),
            }
        };

        let simplified = Rc::new(Function {
            name: function.name,
            params: function.params.clone(),
            body,
            is_generator: false,
            is_async: false,
        });
        Ok(ClosureHandle::new(ClosureData {
            name: function.name,
            params,
            original: function.clone(),
            simplified,
        }))
    }

    pub(super) fn eval_call(
        &mut self,
        callee: &Expression,
        arguments: &[Expression],
    ) -> EvalResult {
        let callee_carrier = self.eval_expr(callee)?;
        let mut carriers = Vec::with_capacity(arguments.len());
        let mut nodes = Vec::with_capacity(arguments.len());
        for argument in arguments {
            let carrier = self.eval_expr(argument)?;
            nodes.push(repr(&carrier)?);
            carriers.push(carrier);
        }
        let call_node = Expression::Call {
            callee: Box::new(repr(&callee_carrier)?),
            arguments: nodes,
        };
        if callee_carrier.tainted() {
            return Ok(TaintedValue::residual(call_node));
        }
        let callee_value = concrete(&callee_carrier)?;
        let Value::Function(handle) = callee_value else {
            return Err(type_error(format!(
                "{} is not a function",
                callee_value.kind_name()
            )));
        };
        let handle = handle.clone();
        let result = self.invoke(&handle, carriers)?;
        if result.tainted() {
            Ok(TaintedValue::residual(call_node))
        } else {
            let value = concrete(&result)?.clone();
            let literal = lift(&value)?;
            // The concrete call stays observable exactly once, with its
            // folded value alongside: `(f(3), 4)`.
            Ok(TaintedValue::with_node(
                value,
                Expression::Sequence(vec![call_node, literal]),
            ))
        }
    }

    /// Concretely invoke a closure with the current environment as the
    /// lexical parent.
    #[tracing::instrument(level = "debug", skip_all)]
    pub(crate) fn invoke(
        &mut self,
        handle: &ClosureHandle,
        arguments: Vec<TaintedValue>,
    ) -> EvalResult {
        if self.stack.depth() >= MAX_CALL_DEPTH {
            return Err(type_error("Maximum call stack size exceeded"));
        }
        let parent = self.env()?;
        let env = parent.child();
        let data = handle.data();
        for (index, &param) in data.params.iter().enumerate() {
            env.declare(param);
            let value = arguments
                .get(index)
                .cloned()
                .unwrap_or_else(TaintedValue::undefined);
            env.assign(param, value);
        }
        env.declare_tainted_ref(Name::ARGUMENTS);

        let (step, _) = {
            let mut scoped =
                self.scoped(ExecutionContext::new(env.clone(), ContextKind::Function));
            scoped.eval_stmt_list(&data.original.body)?
        };
        let result = match step {
            Step::Returning(carrier) => carrier,
            Step::Normal => TaintedValue::undefined(),
            Step::Breaking(_) => {
                return Err(internal_invariant("break escaped a function body"))
            }
        };
        if env.taint_parent_writes() {
            // A conditional return fired somewhere in the body; whether the
            // recorded value is the one actually returned is unknowable.
            let node = repr(&result)?;
            return Ok(result.tainted_with(node));
        }
        Ok(result)
    }
}
