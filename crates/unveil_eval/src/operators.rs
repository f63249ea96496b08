//! Binary operator evaluation.
//!
//! Direct enum-based dispatch over the fixed value model. Returns
//! `Ok(None)` when the result is not statically determinable (the caller
//! emits a residual instead), and `Err` for runtime type errors the
//! evaluated program would throw.

use num_bigint::BigInt;
use unveil_ast::BinaryOp;

use crate::coerce::{to_int32, to_number, to_primitive, to_string, to_uint32, Primitive};
use crate::diagnostics::{not_implemented, type_error, EvalError};
use crate::Value;

/// Result of a concrete binary evaluation attempt.
pub type BinaryOutcome = Result<Option<Value>, EvalError>;

/// Evaluate a binary operation on concrete values.
pub fn evaluate_binary(op: BinaryOp, left: &Value, right: &Value) -> BinaryOutcome {
    match op {
        BinaryOp::Add => eval_add(left, right),
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod | BinaryOp::Exp => {
            eval_arithmetic(op, left, right)
        }
        BinaryOp::BitAnd
        | BinaryOp::BitOr
        | BinaryOp::BitXor
        | BinaryOp::Shl
        | BinaryOp::Shr
        | BinaryOp::UShr => eval_bitwise(op, left, right),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            eval_relational(op, left, right)
        }
        BinaryOp::Eq => Ok(loose_equals(left, right)?.map(Value::Bool)),
        BinaryOp::NotEq => Ok(loose_equals(left, right)?.map(|b| Value::Bool(!b))),
        BinaryOp::StrictEq => Ok(strict_equals(left, right).map(Value::Bool)),
        BinaryOp::StrictNotEq => Ok(strict_equals(left, right).map(|b| Value::Bool(!b))),
        BinaryOp::In => eval_in(left, right),
        BinaryOp::Instanceof => eval_instanceof(left, right),
        BinaryOp::Pipeline => Err(not_implemented("pipeline operator |>")),
    }
}

/// `+`: string concatenation when either primitive is a string, numeric
/// addition otherwise.
fn eval_add(left: &Value, right: &Value) -> BinaryOutcome {
    let (Some(lp), Some(rp)) = (to_primitive(left), to_primitive(right)) else {
        return Ok(None);
    };
    if matches!(lp, Primitive::Str(_)) || matches!(rp, Primitive::Str(_)) {
        let (Some(ls), Some(rs)) = (primitive_to_string(&lp), primitive_to_string(&rp)) else {
            return Ok(None);
        };
        let mut out = String::with_capacity(ls.len() + rs.len());
        out.push_str(&ls);
        out.push_str(&rs);
        return Ok(Some(Value::str(out)));
    }
    match (&lp, &rp) {
        (Primitive::BigInt(a), Primitive::BigInt(b)) => {
            Ok(Some(Value::BigInt(Box::new(&**a + &**b))))
        }
        (Primitive::BigInt(_), _) | (_, Primitive::BigInt(_)) => Err(mixed_bigint()),
        _ => {
            let (Some(a), Some(b)) = (primitive_to_number(&lp), primitive_to_number(&rp)) else {
                return Ok(None);
            };
            Ok(Some(Value::Num(a + b)))
        }
    }
}

fn eval_arithmetic(op: BinaryOp, left: &Value, right: &Value) -> BinaryOutcome {
    if let (Value::BigInt(a), Value::BigInt(b)) = (left, right) {
        return eval_bigint_arithmetic(op, a, b).map(Some);
    }
    if matches!(left, Value::BigInt(_)) || matches!(right, Value::BigInt(_)) {
        return Err(mixed_bigint());
    }
    let (Some(a), Some(b)) = (to_number(left), to_number(right)) else {
        return Ok(None);
    };
    let result = match op {
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
        BinaryOp::Exp => a.powf(b),
        _ => return Err(crate::diagnostics::internal_invariant("non-arithmetic op")),
    };
    Ok(Some(Value::Num(result)))
}

fn eval_bigint_arithmetic(op: BinaryOp, a: &BigInt, b: &BigInt) -> Result<Value, EvalError> {
    let zero = BigInt::from(0);
    let result = match op {
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if *b == zero {
                return Err(type_error("Division by zero"));
            }
            a / b
        }
        BinaryOp::Mod => {
            if *b == zero {
                return Err(type_error("Division by zero"));
            }
            a % b
        }
        BinaryOp::Exp => {
            if *b < zero {
                return Err(type_error("Exponent must be non-negative"));
            }
            let exp = u32::try_from(b.clone())
                .map_err(|_| type_error("Maximum BigInt size exceeded"))?;
            a.pow(exp)
        }
        _ => return Err(crate::diagnostics::internal_invariant("non-arithmetic op")),
    };
    Ok(Value::BigInt(Box::new(result)))
}

fn eval_bitwise(op: BinaryOp, left: &Value, right: &Value) -> BinaryOutcome {
    if let (Value::BigInt(a), Value::BigInt(b)) = (left, right) {
        return eval_bigint_bitwise(op, a, b).map(Some);
    }
    if matches!(left, Value::BigInt(_)) || matches!(right, Value::BigInt(_)) {
        return Err(mixed_bigint());
    }
    let (Some(a), Some(b)) = (to_number(left), to_number(right)) else {
        return Ok(None);
    };
    let result = match op {
        BinaryOp::BitAnd => f64::from(to_int32(a) & to_int32(b)),
        BinaryOp::BitOr => f64::from(to_int32(a) | to_int32(b)),
        BinaryOp::BitXor => f64::from(to_int32(a) ^ to_int32(b)),
        BinaryOp::Shl => f64::from(to_int32(a) << (to_uint32(b) & 31)),
        BinaryOp::Shr => f64::from(to_int32(a) >> (to_uint32(b) & 31)),
        BinaryOp::UShr => f64::from(to_uint32(a) >> (to_uint32(b) & 31)),
        _ => return Err(crate::diagnostics::internal_invariant("non-bitwise op")),
    };
    Ok(Some(Value::Num(result)))
}

fn eval_bigint_bitwise(op: BinaryOp, a: &BigInt, b: &BigInt) -> Result<Value, EvalError> {
    let result = match op {
        BinaryOp::BitAnd => a & b,
        BinaryOp::BitOr => a | b,
        BinaryOp::BitXor => a ^ b,
        BinaryOp::Shl | BinaryOp::Shr => {
            let amount = i64::try_from(b.clone())
                .map_err(|_| type_error("Maximum BigInt size exceeded"))?;
            let (left_shift, magnitude) = if amount < 0 {
                (op == BinaryOp::Shr, amount.unsigned_abs())
            } else {
                (op == BinaryOp::Shl, amount.unsigned_abs())
            };
            let magnitude = usize::try_from(magnitude)
                .map_err(|_| type_error("Maximum BigInt size exceeded"))?;
            if left_shift {
                if magnitude > 1 << 20 {
                    return Err(type_error("Maximum BigInt size exceeded"));
                }
                a << magnitude
            } else {
                a >> magnitude
            }
        }
        BinaryOp::UShr => {
            return Err(type_error("BigInts have no unsigned right shift"));
        }
        _ => return Err(crate::diagnostics::internal_invariant("non-bitwise op")),
    };
    Ok(Value::BigInt(Box::new(result)))
}

fn eval_relational(op: BinaryOp, left: &Value, right: &Value) -> BinaryOutcome {
    let (Some(lp), Some(rp)) = (to_primitive(left), to_primitive(right)) else {
        return Ok(None);
    };
    let result = match (&lp, &rp) {
        (Primitive::Str(a), Primitive::Str(b)) => Some(match op {
            BinaryOp::Lt => a < b,
            BinaryOp::LtEq => a <= b,
            BinaryOp::Gt => a > b,
            BinaryOp::GtEq => a >= b,
            _ => unreachable!("relational dispatch"),
        }),
        (Primitive::BigInt(a), Primitive::BigInt(b)) => Some(match op {
            BinaryOp::Lt => a < b,
            BinaryOp::LtEq => a <= b,
            BinaryOp::Gt => a > b,
            BinaryOp::GtEq => a >= b,
            _ => unreachable!("relational dispatch"),
        }),
        _ => {
            let a = primitive_to_comparable(&lp);
            let b = primitive_to_comparable(&rp);
            match (a, b) {
                (Some(a), Some(b)) => {
                    if a.is_nan() || b.is_nan() {
                        Some(false)
                    } else {
                        Some(match op {
                            BinaryOp::Lt => a < b,
                            BinaryOp::LtEq => a <= b,
                            BinaryOp::Gt => a > b,
                            BinaryOp::GtEq => a >= b,
                            _ => unreachable!("relational dispatch"),
                        })
                    }
                }
                _ => None,
            }
        }
    };
    Ok(result.map(Value::Bool))
}

/// Strict equality. `None` only for regex pairs, whose object identity is
/// not modeled.
pub fn strict_equals(left: &Value, right: &Value) -> Option<bool> {
    match (left, right) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => Some(true),
        (Value::Num(a), Value::Num(b)) => Some(a == b),
        (Value::Str(a), Value::Str(b)) => Some(a == b),
        (Value::Bool(a), Value::Bool(b)) => Some(a == b),
        (Value::BigInt(a), Value::BigInt(b)) => Some(a == b),
        (Value::Array(a), Value::Array(b)) => Some(a.ptr_eq(b)),
        (Value::Function(a), Value::Function(b)) => Some(a.ptr_eq(b)),
        (Value::Regex { .. }, Value::Regex { .. }) => None,
        _ => Some(false),
    }
}

/// Abstract (loose) equality. `None` when the outcome depends on values the
/// evaluator cannot determine.
pub fn loose_equals(left: &Value, right: &Value) -> Result<Option<bool>, EvalError> {
    match (left, right) {
        // Same-type comparisons defer to strict equality.
        (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => Ok(Some(true)),
        (Value::Num(_), Value::Num(_))
        | (Value::Str(_), Value::Str(_))
        | (Value::Bool(_), Value::Bool(_))
        | (Value::BigInt(_), Value::BigInt(_))
        | (Value::Array(_), Value::Array(_))
        | (Value::Function(_), Value::Function(_))
        | (Value::Regex { .. }, Value::Regex { .. }) => Ok(strict_equals(left, right)),
        (Value::Num(n), Value::Str(s)) | (Value::Str(s), Value::Num(n)) => {
            Ok(Some(*n == crate::coerce::parse_js_number(s)))
        }
        (Value::BigInt(b), Value::Str(s)) | (Value::Str(s), Value::BigInt(b)) => {
            Ok(Some(match parse_bigint_str(s) {
                Some(parsed) => **b == parsed,
                None => false,
            }))
        }
        (Value::BigInt(b), Value::Num(n)) | (Value::Num(n), Value::BigInt(b)) => {
            Ok(Some(bigint_equals_number(b, *n)))
        }
        (Value::Bool(b), other) | (other, Value::Bool(b)) => {
            let as_num = Value::Num(if *b { 1.0 } else { 0.0 });
            loose_equals(&as_num, other)
        }
        // Nullish against anything non-nullish compares unequal.
        (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => {
            Ok(Some(false))
        }
        // Object against primitive coerces through ToPrimitive.
        (Value::Array(_) | Value::Regex { .. } | Value::Function(_), other) => {
            match to_primitive(left) {
                Some(prim) => loose_equals(&primitive_to_value(prim), other),
                None => Ok(None),
            }
        }
        (other, Value::Array(_) | Value::Regex { .. } | Value::Function(_)) => {
            match to_primitive(right) {
                Some(prim) => loose_equals(other, &primitive_to_value(prim)),
                None => Ok(None),
            }
        }
    }
}

/// `key in object` over the supported model: arrays expose their indices
/// and `length`.
fn eval_in(left: &Value, right: &Value) -> BinaryOutcome {
    match right {
        Value::Array(array) => {
            let Some(key) = to_string(left) else {
                return Ok(None);
            };
            if key == "length" {
                return Ok(Some(Value::Bool(true)));
            }
            let present = key
                .parse::<usize>()
                .map(|index| index < array.len())
                .unwrap_or(false);
            Ok(Some(Value::Bool(present)))
        }
        // Function properties are outside the object model.
        Value::Function(_) => Ok(None),
        _ => Err(type_error(format!(
            "Cannot use 'in' operator to search in {}",
            right.kind_name()
        ))),
    }
}

/// `instanceof`. With a function handle on the right the prototype chain is
/// unknown to the model, so the expression stays residual.
fn eval_instanceof(_left: &Value, right: &Value) -> BinaryOutcome {
    match right {
        Value::Function(_) => Ok(None),
        _ => Err(type_error(
            "Right-hand side of 'instanceof' is not callable",
        )),
    }
}

fn primitive_to_number(p: &Primitive) -> Option<f64> {
    match p {
        Primitive::Undefined => Some(f64::NAN),
        Primitive::Null => Some(0.0),
        Primitive::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Primitive::Num(n) => Some(*n),
        Primitive::BigInt(_) => None,
        Primitive::Str(s) => Some(crate::coerce::parse_js_number(s)),
    }
}

fn primitive_to_string(p: &Primitive) -> Option<String> {
    match p {
        Primitive::Undefined => Some("undefined".to_owned()),
        Primitive::Null => Some("null".to_owned()),
        Primitive::Bool(b) => Some(b.to_string()),
        Primitive::Num(n) => Some(crate::coerce::js_number_to_string(*n)),
        Primitive::BigInt(b) => Some(b.to_string()),
        Primitive::Str(s) => Some(s.to_string()),
    }
}

/// Numeric view for mixed relational comparisons. BigInts go through their
/// decimal form; the precision loss only affects orderings JS programs
/// cannot practically rely on.
fn primitive_to_comparable(p: &Primitive) -> Option<f64> {
    match p {
        Primitive::BigInt(b) => b.to_string().parse::<f64>().ok(),
        other => primitive_to_number(other),
    }
}

fn primitive_to_value(p: Primitive) -> Value {
    match p {
        Primitive::Undefined => Value::Undefined,
        Primitive::Null => Value::Null,
        Primitive::Bool(b) => Value::Bool(b),
        Primitive::Num(n) => Value::Num(n),
        Primitive::BigInt(b) => Value::BigInt(b),
        Primitive::Str(s) => Value::Str(s),
    }
}

fn parse_bigint_str(s: &str) -> Option<BigInt> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Some(BigInt::from(0));
    }
    BigInt::parse_bytes(trimmed.as_bytes(), 10)
}

fn bigint_equals_number(b: &BigInt, n: f64) -> bool {
    if !n.is_finite() || n.fract() != 0.0 {
        return false;
    }
    if n == 0.0 {
        return *b == BigInt::from(0);
    }
    format!("{n:.0}") == b.to_string()
}

#[cold]
fn mixed_bigint() -> EvalError {
    type_error("Cannot mix BigInt and other types, use explicit conversions")
}
