//! Assignment arms: identifier targets and the member-path case matrix.
//!
//! Member targets walk the property chain first, so the residual always
//! shows the simplified keys (`a[2+2][1]` prints as `a[4][1]`), then apply
//! the five-case matrix: tainted root, tainted key, tainted stored leaf,
//! tainted right-hand side, or a fully concrete store.

use unveil_ast::{AssignmentOp, Expression, Name};

use crate::diagnostics::{not_implemented, type_error, EvalResult};
use crate::environment::{value_to_index, MemberStep};
use crate::lift::{lift, repr};
use crate::operators::evaluate_binary;
use crate::{TaintedValue, Value};

use super::{concrete, Evaluator};

impl Evaluator<'_> {
    pub(super) fn eval_assignment(
        &mut self,
        op: AssignmentOp,
        target: &Expression,
        value: &Expression,
    ) -> EvalResult {
        match target {
            Expression::Identifier(name) => self.assign_identifier(op, *name, value),
            Expression::Member { .. } => self.assign_member_path(op, target, value),
            _ => Err(not_implemented("assignment target")),
        }
    }

    fn assign_identifier(
        &mut self,
        op: AssignmentOp,
        name: Name,
        value: &Expression,
    ) -> EvalResult {
        let env = self.env()?;
        let target_node = Expression::Identifier(name);

        if let Some(binop) = op.binary_op() {
            let existing = env.resolve(name, self.name_str(name))?;
            let rhs = self.eval_expr(value)?;
            if existing.tainted() || rhs.tainted() {
                env.assign(name, TaintedValue::reference(name));
                return Ok(TaintedValue::residual(Expression::Assignment {
                    op,
                    target: Box::new(target_node),
                    value: Box::new(repr(&rhs)?),
                }));
            }
            return match evaluate_binary(binop, concrete(&existing)?, concrete(&rhs)?)? {
                Some(new) => {
                    env.assign(name, stored_carrier(name, new.clone()));
                    let node = Expression::Assignment {
                        op: AssignmentOp::Assign,
                        target: Box::new(target_node),
                        value: Box::new(lift(&new)?),
                    };
                    Ok(TaintedValue::with_node(new, node))
                }
                None => {
                    env.assign(name, TaintedValue::reference(name));
                    Ok(TaintedValue::residual(Expression::Assignment {
                        op,
                        target: Box::new(target_node),
                        value: Box::new(repr(&rhs)?),
                    }))
                }
            };
        }

        let rhs = self.eval_expr(value)?;
        if rhs.tainted() {
            env.assign(name, TaintedValue::reference(name));
            return Ok(TaintedValue::residual(Expression::Assignment {
                op: AssignmentOp::Assign,
                target: Box::new(target_node),
                value: Box::new(repr(&rhs)?),
            }));
        }
        let new = concrete(&rhs)?.clone();
        env.assign(name, stored_carrier(name, new.clone()));
        let node = Expression::Assignment {
            op: AssignmentOp::Assign,
            target: Box::new(target_node),
            value: Box::new(repr(&rhs)?),
        };
        Ok(TaintedValue::with_node(new, node))
    }

    fn assign_member_path(
        &mut self,
        op: AssignmentOp,
        target: &Expression,
        value: &Expression,
    ) -> EvalResult {
        let Some((root, raw_steps)) = flatten_member_chain(target) else {
            return Err(not_implemented("assignment to a non-identifier member root"));
        };
        let env = self.env()?;
        let root_carrier = env.resolve(root, self.name_str(root))?;

        // Walk the chain first: keys evaluate left-to-right and the
        // residual path reflects their simplified forms, rooted at the
        // identifier.
        let mut steps: Vec<MemberStep> = Vec::with_capacity(raw_steps.len());
        let mut path_node = Expression::Identifier(root);
        for (property, computed) in raw_steps {
            let key = self.eval_property_key(property, computed)?;
            path_node = self.member_node(path_node, &key, false)?;
            steps.push(MemberStep {
                key,
                node: path_node.clone(),
            });
        }
        let member_node = path_node;
        let rhs = self.eval_expr(value)?;
        let residual = |op: AssignmentOp, rhs_node: Expression| {
            TaintedValue::residual(Expression::Assignment {
                op,
                target: Box::new(member_node.clone()),
                value: Box::new(rhs_node),
            })
        };

        // Case 1: tainted root. Nothing is stored.
        if root_carrier.tainted() {
            return Ok(residual(op, repr(&rhs)?));
        }

        // Case 2: a tainted key. The deepest reachable sub-object degrades
        // in place; the store itself stays residual.
        if steps.iter().any(|step| step.key.tainted()) {
            env.assign_nested_member(
                root,
                &steps,
                TaintedValue::residual(member_node.clone()),
                Some(member_node.clone()),
            )?;
            return Ok(residual(op, repr(&rhs)?));
        }

        // Cases 3 and 4: a tainted stored leaf, or a tainted right-hand
        // side. The residual keeps the compound form; taint propagates into
        // the slot.
        let existing = self.read_member_leaf(&root_carrier, &steps)?;
        let leaf_tainted = existing.as_ref().is_some_and(|leaf| leaf.tainted());
        if leaf_tainted || rhs.tainted() {
            env.assign_nested_member(
                root,
                &steps,
                TaintedValue::residual(member_node.clone()),
                Some(member_node.clone()),
            )?;
            return Ok(residual(op, repr(&rhs)?));
        }

        // Case 5: fully concrete. Compute, store through the nested write
        // (which still honors the parent-write gate), lift the new value.
        let new = match op.binary_op() {
            Some(binop) => {
                let old = existing.unwrap_or_else(TaintedValue::undefined);
                match evaluate_binary(binop, concrete(&old)?, concrete(&rhs)?)? {
                    Some(new) => new,
                    None => {
                        env.assign_nested_member(
                            root,
                            &steps,
                            TaintedValue::residual(member_node.clone()),
                            Some(member_node.clone()),
                        )?;
                        return Ok(residual(op, repr(&rhs)?));
                    }
                }
            }
            None => concrete(&rhs)?.clone(),
        };
        env.assign_nested_member(
            root,
            &steps,
            TaintedValue::of(new.clone()),
            Some(member_node.clone()),
        )?;
        let node = Expression::Assignment {
            op: AssignmentOp::Assign,
            target: Box::new(member_node.clone()),
            value: Box::new(lift(&new)?),
        };
        Ok(TaintedValue::with_node(new, node))
    }

    /// The carrier currently stored at the end of an untainted member path,
    /// or `None` past the end of an array.
    fn read_member_leaf(
        &self,
        root: &TaintedValue,
        steps: &[MemberStep],
    ) -> Result<Option<TaintedValue>, crate::diagnostics::EvalError> {
        let mut current = root.clone();
        for step in steps {
            if current.tainted() {
                return Ok(Some(current));
            }
            let next = match concrete(&current)? {
                Value::Array(array) => {
                    let index = step.key.value().and_then(value_to_index);
                    match index.and_then(|index| array.get(index)) {
                        Some(element) => element,
                        None => return Ok(None),
                    }
                }
                value if value.is_nullish() => {
                    return Err(type_error(format!(
                        "Cannot read properties of {}",
                        value.kind_name()
                    )));
                }
                _ => return Ok(None),
            };
            current = next;
        }
        Ok(Some(current))
    }
}

/// Split a member chain into its identifier root and the property steps,
/// outermost last. `None` when the root is not a plain identifier.
fn flatten_member_chain(expr: &Expression) -> Option<(Name, Vec<(&Expression, bool)>)> {
    let mut steps = Vec::new();
    let mut current = expr;
    loop {
        match current {
            Expression::Member {
                object,
                property,
                computed,
                optional: false,
            } => {
                steps.push((&**property, *computed));
                current = object;
            }
            Expression::Identifier(name) => {
                steps.reverse();
                return Some((*name, steps));
            }
            _ => return None,
        }
    }
}

/// Storage form of a concrete value bound to `name`. Function values keep a
/// reference node so call sites print the binding name rather than the
/// inlined function expression.
pub(super) fn stored_carrier(name: Name, value: Value) -> TaintedValue {
    if matches!(value, Value::Function(_)) {
        TaintedValue::with_node(value, Expression::Identifier(name))
    } else {
        TaintedValue::of(value)
    }
}
