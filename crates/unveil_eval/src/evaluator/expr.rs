//! Expression arms: operators, sequences, conditionals, arrays.

use unveil_ast::{BinaryOp, Expression, LogicalOp, UnaryOp, UpdateOp};

use crate::diagnostics::{internal_invariant, not_implemented, thrown, EvalResult};
use crate::environment::value_to_index;
use crate::frames::{ContextKind, ExecutionContext};
use crate::lift::repr;
use crate::operators::evaluate_binary;
use crate::unary_operators::evaluate_unary;
use crate::{Environment, SharedArray, TaintedValue, Value};

use super::{concrete, Evaluator};

impl Evaluator<'_> {
    pub(super) fn eval_binary(
        &mut self,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
    ) -> EvalResult {
        let l = self.eval_expr(left)?;
        let r = self.eval_expr(right)?;
        if op == BinaryOp::Pipeline {
            return Err(not_implemented("pipeline operator |>"));
        }
        if l.tainted() || r.tainted() {
            return Ok(TaintedValue::residual(Expression::Binary {
                op,
                left: Box::new(repr(&l)?),
                right: Box::new(repr(&r)?),
            }));
        }
        match evaluate_binary(op, concrete(&l)?, concrete(&r)?)? {
            Some(value) => Ok(TaintedValue::of(value)),
            None => Ok(TaintedValue::residual(Expression::Binary {
                op,
                left: Box::new(repr(&l)?),
                right: Box::new(repr(&r)?),
            })),
        }
    }

    /// Short-circuit first: an untainted left that decides the outcome
    /// returns without touching the right at all, and an untainted left
    /// that cedes the outcome returns the right's carrier directly. Only an
    /// indeterminate outcome produces a residual logical node.
    pub(super) fn eval_logical(
        &mut self,
        op: LogicalOp,
        left: &Expression,
        right: &Expression,
    ) -> EvalResult {
        let l = self.eval_expr(left)?;
        if !l.tainted() {
            let value = concrete(&l)?;
            let left_decides = match op {
                LogicalOp::And => !value.is_truthy(),
                LogicalOp::Or => value.is_truthy(),
                LogicalOp::Coalesce => !value.is_nullish(),
            };
            if left_decides {
                return Ok(l);
            }
            return self.eval_expr(right);
        }
        let r = self.eval_expr(right)?;
        Ok(TaintedValue::residual(Expression::Logical {
            op,
            left: Box::new(repr(&l)?),
            right: Box::new(repr(&r)?),
        }))
    }

    pub(super) fn eval_unary(&mut self, op: UnaryOp, argument: &Expression) -> EvalResult {
        match op {
            // void evaluates its operand for effect and always yields the
            // reserved undefined, taint or not.
            UnaryOp::Void => {
                let _ = self.eval_expr(argument)?;
                Ok(TaintedValue::undefined())
            }
            UnaryOp::Delete => Err(not_implemented("delete operator")),
            _ => {
                let operand = self.eval_expr(argument)?;
                if operand.tainted() {
                    return Ok(TaintedValue::residual(Expression::Unary {
                        op,
                        argument: Box::new(repr(&operand)?),
                    }));
                }
                if op == UnaryOp::Throw {
                    return Err(thrown(operand));
                }
                match evaluate_unary(op, concrete(&operand)?)? {
                    Some(value) => Ok(TaintedValue::of(value)),
                    None => Ok(TaintedValue::residual(Expression::Unary {
                        op,
                        argument: Box::new(repr(&operand)?),
                    })),
                }
            }
        }
    }

    pub(super) fn eval_update(
        &mut self,
        op: UpdateOp,
        prefix: bool,
        argument: &Expression,
    ) -> EvalResult {
        match argument {
            Expression::Identifier(name) => {
                let env = self.env()?;
                let current = env.resolve(*name, self.name_str(*name))?;
                if current.tainted() {
                    return Ok(TaintedValue::residual(Expression::Update {
                        op,
                        prefix,
                        argument: Box::new(Expression::Identifier(*name)),
                    }));
                }
                match step_value(op, concrete(&current)?) {
                    Some((old, new)) => {
                        env.assign(*name, TaintedValue::of(new.clone()));
                        Ok(TaintedValue::of(if prefix { new } else { old }))
                    }
                    None => Ok(TaintedValue::residual(Expression::Update {
                        op,
                        prefix,
                        argument: Box::new(Expression::Identifier(*name)),
                    })),
                }
            }
            Expression::Member {
                object,
                property,
                computed,
                optional: false,
            } => self.eval_member_update(op, prefix, object, property, *computed),
            _ => Err(not_implemented("update expression target")),
        }
    }

    /// `++`/`--` on a single-level member access rooted at an identifier.
    fn eval_member_update(
        &mut self,
        op: UpdateOp,
        prefix: bool,
        object: &Expression,
        property: &Expression,
        computed: bool,
    ) -> EvalResult {
        let Expression::Identifier(obj_name) = object else {
            return Err(not_implemented("update of a nested member target"));
        };
        let env = self.env()?;
        let obj = env.resolve(*obj_name, self.name_str(*obj_name))?;
        let key = self.eval_property_key(property, computed)?;
        let member_node =
            self.member_node(Expression::Identifier(*obj_name), &key, false)?;
        let residual = |node: Expression| -> EvalResult {
            Ok(TaintedValue::residual(Expression::Update {
                op,
                prefix,
                argument: Box::new(node),
            }))
        };

        if obj.tainted() || key.tainted() {
            // An unknown index may write anywhere in the object, so the
            // object variable itself degrades alongside the update.
            if key.tainted() && !obj.tainted() {
                env.set_taint(*obj_name, true);
            }
            return residual(member_node);
        }

        let element = match (concrete(&obj)?, key.value().and_then(value_to_index)) {
            (Value::Array(array), Some(index)) => array.get(index),
            _ => None,
        };
        let Some(element) = element else {
            return residual(member_node);
        };
        if element.tainted() {
            return residual(member_node);
        }
        match step_value(op, concrete(&element)?) {
            Some((old, new)) => {
                let key_value = concrete(&key)?.clone();
                env.assign_member(
                    *obj_name,
                    &key_value,
                    TaintedValue::of(new.clone()),
                    Some(member_node.clone()),
                )?;
                let result = if prefix { new } else { old };
                Ok(TaintedValue::with_node(
                    result,
                    Expression::Update {
                        op,
                        prefix,
                        argument: Box::new(member_node),
                    },
                ))
            }
            None => residual(member_node),
        }
    }

    pub(super) fn eval_sequence(&mut self, expressions: &[Expression]) -> EvalResult {
        let mut nodes = Vec::with_capacity(expressions.len());
        let mut last: Option<TaintedValue> = None;
        for expr in expressions {
            let carrier = self.eval_expr(expr)?;
            nodes.push(repr(&carrier)?);
            last = Some(carrier);
        }
        let Some(last) = last else {
            return Err(internal_invariant("empty sequence expression"));
        };
        let node = Expression::Sequence(nodes);
        if last.tainted() {
            Ok(TaintedValue::residual(node))
        } else {
            Ok(TaintedValue::with_node(concrete(&last)?.clone(), node))
        }
    }

    pub(super) fn eval_conditional(
        &mut self,
        test: &Expression,
        consequent: &Expression,
        alternate: &Expression,
    ) -> EvalResult {
        let t = self.eval_expr(test)?;
        if !t.tainted() {
            let chosen = if concrete(&t)?.is_truthy() {
                consequent
            } else {
                alternate
            };
            return self.eval_expr(chosen);
        }
        let c = self.eval_ambiguous_expr(consequent)?;
        let a = self.eval_ambiguous_expr(alternate)?;
        Ok(TaintedValue::residual(Expression::Conditional {
            test: Box::new(repr(&t)?),
            consequent: Box::new(repr(&c)?),
            alternate: Box::new(repr(&a)?),
        }))
    }

    pub(super) fn eval_array(&mut self, elements: &[Option<Expression>]) -> EvalResult {
        let mut carriers = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                Some(expr) => carriers.push(self.eval_expr(expr)?),
                None => carriers.push(TaintedValue::undefined()),
            }
        }
        Ok(TaintedValue::of(Value::Array(SharedArray::new(carriers))))
    }

    /// Evaluate one branch of an ambiguous conditional: a fresh child scope
    /// with the parent-write gate up, then every name the branch declared
    /// leaks into the parent as a tainted reference (once).
    fn eval_ambiguous_expr(&mut self, expr: &Expression) -> EvalResult {
        let parent = self.env()?;
        let child = parent.child();
        child.set_taint_parent_writes(true);
        let result = {
            let mut scoped = self.scoped(ExecutionContext::new(
                child.clone(),
                ContextKind::Conditional,
            ));
            scoped.eval_expr(expr)
        };
        leak_branch_locals(&parent, &child);
        result
    }
}

/// Leak names declared in an ambiguous branch into the parent as tainted
/// references. Idempotent, so two branches declaring the same name leak it
/// exactly once.
pub(super) fn leak_branch_locals(parent: &Environment, child: &Environment) {
    for name in child.local_names() {
        parent.declare_tainted_ref(name);
    }
}

/// Old and new values of an increment/decrement, when computable.
fn step_value(op: UpdateOp, current: &Value) -> Option<(Value, Value)> {
    use num_bigint::BigInt;
    match current {
        Value::BigInt(b) => {
            let delta = BigInt::from(1);
            let new = match op {
                UpdateOp::Increment => &**b + delta,
                UpdateOp::Decrement => &**b - delta,
            };
            Some((current.clone(), Value::BigInt(Box::new(new))))
        }
        _ => {
            let old = crate::coerce::to_number(current)?;
            let new = match op {
                UpdateOp::Increment => old + 1.0,
                UpdateOp::Decrement => old - 1.0,
            };
            Some((Value::Num(old), Value::Num(new)))
        }
    }
}
