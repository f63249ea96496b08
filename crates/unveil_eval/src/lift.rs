//! Lifting concrete values back into literal tree fragments.
//!
//! `repr` is the single point where a carrier becomes output tree: the
//! residual fragment when one is attached, the lifted literal otherwise.

use unveil_ast::{Expression, Name};

use crate::diagnostics::{internal_invariant, EvalError};
use crate::{TaintedValue, Value};

/// Convert a concrete value to a literal fragment.
pub fn lift(value: &Value) -> Result<Expression, EvalError> {
    match value {
        Value::Undefined => Ok(Expression::Identifier(Name::UNDEFINED)),
        Value::Null => Ok(Expression::Null),
        Value::Bool(b) => Ok(Expression::Boolean(*b)),
        Value::Num(n) => Ok(Expression::Number(*n)),
        Value::BigInt(b) => Ok(Expression::BigInt(b.clone())),
        Value::Str(s) => Ok(Expression::String(s.clone())),
        Value::Regex { pattern, flags } => Ok(Expression::Regex {
            pattern: pattern.clone(),
            flags: flags.clone(),
        }),
        Value::Array(array) => {
            let elements = array
                .borrow()
                .iter()
                .map(|element| repr(element).map(Some))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Expression::Array(elements))
        }
        Value::Function(handle) => Ok(handle.residual_fragment()),
    }
}

/// The output form of a carrier: its residual fragment, or the lifted
/// literal when none is attached.
pub fn repr(carrier: &TaintedValue) -> Result<Expression, EvalError> {
    if let Some(node) = carrier.node() {
        return Ok(node.clone());
    }
    match carrier.value() {
        Some(value) => lift(value),
        None => Err(internal_invariant(
            "carrier with neither value nor residual",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SharedArray;

    #[test]
    fn literals_lift_to_their_node_forms() {
        assert_eq!(lift(&Value::Null).unwrap(), Expression::Null);
        assert_eq!(lift(&Value::Bool(true)).unwrap(), Expression::Boolean(true));
        assert_eq!(lift(&Value::Num(4.0)).unwrap(), Expression::Number(4.0));
        assert_eq!(
            lift(&Value::Undefined).unwrap(),
            Expression::Identifier(Name::UNDEFINED)
        );
        assert_eq!(
            lift(&Value::str("hi")).unwrap(),
            Expression::string("hi")
        );
    }

    #[test]
    fn arrays_lift_recursively() {
        let inner = SharedArray::new(vec![TaintedValue::of(Value::Num(1.0))]);
        let outer = SharedArray::new(vec![
            TaintedValue::of(Value::Array(inner)),
            TaintedValue::reference(Name::from_raw(9)),
        ]);
        let lifted = lift(&Value::Array(outer)).unwrap();
        match lifted {
            Expression::Array(elements) => {
                assert_eq!(elements.len(), 2);
                assert!(matches!(elements[0], Some(Expression::Array(_))));
                // Tainted elements appear as their residual reference.
                assert!(matches!(elements[1], Some(Expression::Identifier(_))));
            }
            other => panic!("expected array literal, got {other:?}"),
        }
    }

    #[test]
    fn repr_prefers_the_node() {
        let carrier =
            TaintedValue::with_node(Value::Num(4.0), Expression::Identifier(Name::from_raw(3)));
        assert_eq!(
            repr(&carrier).unwrap(),
            Expression::Identifier(Name::from_raw(3))
        );
        let plain = TaintedValue::of(Value::Num(4.0));
        assert_eq!(repr(&plain).unwrap(), Expression::Number(4.0));
    }
}
