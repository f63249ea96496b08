//! Member reads and residual member-node construction.

use unveil_ast::{is_identifier_name, Expression};

use crate::diagnostics::{internal_invariant, type_error, EvalError, EvalResult};
use crate::environment::value_to_index;
use crate::lift::repr;
use crate::{TaintedValue, Value};

use super::{concrete, Evaluator};

impl Evaluator<'_> {
    pub(super) fn eval_member(
        &mut self,
        object: &Expression,
        property: &Expression,
        computed: bool,
        optional: bool,
    ) -> EvalResult {
        let obj = self.eval_expr(object)?;
        if optional && !obj.tainted() && concrete(&obj)?.is_nullish() {
            return Ok(TaintedValue::undefined());
        }
        let key = self.eval_property_key(property, computed)?;
        if obj.tainted() || key.tainted() {
            let node = self.member_node(object_node(object, &obj)?, &key, optional)?;
            return Ok(TaintedValue::residual(node));
        }
        match concrete(&obj)? {
            Value::Array(array) => {
                let key_value = concrete(&key)?;
                if is_length_key(key_value) {
                    return Ok(TaintedValue::of(Value::Num(array.len() as f64)));
                }
                match value_to_index(key_value) {
                    Some(index) => Ok(array
                        .get(index)
                        .unwrap_or_else(TaintedValue::undefined)),
                    None => Ok(TaintedValue::undefined()),
                }
            }
            Value::Str(s) => {
                let key_value = concrete(&key)?;
                if is_length_key(key_value) {
                    return Ok(TaintedValue::of(Value::Num(s.chars().count() as f64)));
                }
                match value_to_index(key_value) {
                    Some(index) => Ok(s
                        .chars()
                        .nth(index)
                        .map(|c| TaintedValue::of(Value::str(c.to_string())))
                        .unwrap_or_else(TaintedValue::undefined)),
                    None => Ok(TaintedValue::undefined()),
                }
            }
            value if value.is_nullish() => Err(type_error(format!(
                "Cannot read properties of {}",
                value.kind_name()
            ))),
            // Remaining primitives have no modeled properties.
            _ => Ok(TaintedValue::undefined()),
        }
    }

    /// The key carrier of a member access: the evaluated expression for
    /// computed form, the identifier's string for dot form.
    pub(super) fn eval_property_key(
        &mut self,
        property: &Expression,
        computed: bool,
    ) -> EvalResult {
        if computed {
            return self.eval_expr(property);
        }
        let Expression::Identifier(name) = property else {
            return Err(internal_invariant("non-identifier dot property"));
        };
        Ok(TaintedValue::of(Value::str(self.name_str(*name))))
    }

    /// Residual member node, preferring dot form for identifier-shaped
    /// string keys.
    pub(super) fn member_node(
        &self,
        object: Expression,
        key: &TaintedValue,
        optional: bool,
    ) -> Result<Expression, EvalError> {
        if !key.tainted() {
            if let Some(Value::Str(s)) = key.value() {
                if is_identifier_name(s) {
                    let name = self.interner.intern(s);
                    return Ok(Expression::Member {
                        object: Box::new(object),
                        property: Box::new(Expression::Identifier(name)),
                        computed: false,
                        optional,
                    });
                }
            }
        }
        Ok(Expression::Member {
            object: Box::new(object),
            property: Box::new(repr(key)?),
            computed: true,
            optional,
        })
    }
}

fn is_length_key(key: &Value) -> bool {
    matches!(key, Value::Str(s) if &**s == "length")
}

/// Residual form of a member access's object: the carrier's node when it
/// has one, the syntactic identifier when the object was a plain name
/// (keeping `a[t]` from inlining `a`'s whole array literal), the lifted
/// value otherwise.
pub(super) fn object_node(
    object_expr: &Expression,
    carrier: &TaintedValue,
) -> Result<Expression, EvalError> {
    if carrier.node().is_some() {
        return repr(carrier);
    }
    if let Expression::Identifier(name) = object_expr {
        return Ok(Expression::Identifier(*name));
    }
    repr(carrier)
}
