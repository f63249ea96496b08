//! Unary operator evaluation.
//!
//! `void` and `throw` never reach this table: `void` is folded to
//! `undefined` by the dispatch arm and `throw` raises there. `delete` is
//! rejected there as well (no object model).

use num_bigint::BigInt;
use unveil_ast::UnaryOp;

use crate::coerce::{to_int32, to_number};
use crate::diagnostics::{internal_invariant, type_error, EvalError};
use crate::Value;

/// Evaluate a unary operation on a concrete value. `Ok(None)` means the
/// result is not statically determinable.
pub fn evaluate_unary(op: UnaryOp, operand: &Value) -> Result<Option<Value>, EvalError> {
    match op {
        UnaryOp::Typeof => Ok(Some(Value::str(operand.type_of()))),
        UnaryOp::Not => Ok(Some(Value::Bool(!operand.is_truthy()))),
        UnaryOp::Plus => match operand {
            Value::BigInt(_) => Err(type_error("Cannot convert a BigInt to a number")),
            _ => Ok(to_number(operand).map(Value::Num)),
        },
        UnaryOp::Minus => match operand {
            Value::BigInt(b) => Ok(Some(Value::BigInt(Box::new(-&**b)))),
            _ => Ok(to_number(operand).map(|n| Value::Num(-n))),
        },
        UnaryOp::BitNot => match operand {
            Value::BigInt(b) => Ok(Some(Value::BigInt(Box::new(-&**b - BigInt::from(1))))),
            _ => Ok(to_number(operand).map(|n| Value::Num(f64::from(!to_int32(n))))),
        },
        UnaryOp::Void | UnaryOp::Throw | UnaryOp::Delete => Err(internal_invariant(format!(
            "operator {op} handled by the dispatch arm"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SharedArray;

    fn eval(op: UnaryOp, v: Value) -> Value {
        evaluate_unary(op, &v).unwrap().unwrap()
    }

    #[test]
    fn typeof_results() {
        match eval(UnaryOp::Typeof, Value::Undefined) {
            Value::Str(s) => assert_eq!(&*s, "undefined"),
            other => panic!("unexpected: {other:?}"),
        }
        match eval(UnaryOp::Typeof, Value::Null) {
            Value::Str(s) => assert_eq!(&*s, "object"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn numeric_coercions() {
        match eval(UnaryOp::Plus, Value::str("0x10")) {
            Value::Num(n) => assert_eq!(n, 16.0),
            other => panic!("unexpected: {other:?}"),
        }
        match eval(UnaryOp::Minus, Value::Bool(true)) {
            Value::Num(n) => assert_eq!(n, -1.0),
            other => panic!("unexpected: {other:?}"),
        }
        match eval(UnaryOp::BitNot, Value::Num(5.0)) {
            Value::Num(n) => assert_eq!(n, -6.0),
            other => panic!("unexpected: {other:?}"),
        }
        match eval(UnaryOp::Not, Value::Array(SharedArray::new(vec![]))) {
            Value::Bool(b) => assert!(!b),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn bigint_unary() {
        let five = Value::BigInt(Box::new(BigInt::from(5)));
        match eval(UnaryOp::Minus, five.clone()) {
            Value::BigInt(b) => assert_eq!(*b, BigInt::from(-5)),
            other => panic!("unexpected: {other:?}"),
        }
        match eval(UnaryOp::BitNot, five.clone()) {
            Value::BigInt(b) => assert_eq!(*b, BigInt::from(-6)),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(evaluate_unary(UnaryOp::Plus, &five).is_err());
    }
}
