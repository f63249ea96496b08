//! JS coercion rules over the supported value model.
//!
//! All coercions return `Option` where the outcome is not statically
//! determinable: an array whose element is tainted has no knowable string
//! form, and a function's string form is its source text, which we do not
//! reproduce. Callers treat `None` as "go residual".

use std::rc::Rc;

use num_bigint::BigInt;

use crate::{SharedArray, Value};

/// A primitive produced by `ToPrimitive` over the supported model.
pub enum Primitive {
    Undefined,
    Null,
    Bool(bool),
    Num(f64),
    BigInt(Box<BigInt>),
    Str(Rc<str>),
}

/// `ToPrimitive` (default hint). `None` when not statically determinable.
pub fn to_primitive(value: &Value) -> Option<Primitive> {
    match value {
        Value::Undefined => Some(Primitive::Undefined),
        Value::Null => Some(Primitive::Null),
        Value::Bool(b) => Some(Primitive::Bool(*b)),
        Value::Num(n) => Some(Primitive::Num(*n)),
        Value::BigInt(b) => Some(Primitive::BigInt(b.clone())),
        Value::Str(s) => Some(Primitive::Str(s.clone())),
        Value::Regex { pattern, flags } => {
            Some(Primitive::Str(format!("/{pattern}/{flags}").into()))
        }
        Value::Array(array) => array_join(array).map(|s| Primitive::Str(s.into())),
        Value::Function(_) => None,
    }
}

/// `ToNumber`. `None` when not statically determinable; BigInt values have
/// no number conversion (the operators that hit this raise a type error
/// before calling here).
pub fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Undefined => Some(f64::NAN),
        Value::Null => Some(0.0),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Num(n) => Some(*n),
        Value::BigInt(_) => None,
        Value::Str(s) => Some(parse_js_number(s)),
        Value::Regex { .. } => Some(f64::NAN),
        Value::Array(array) => array_join(array).map(|s| parse_js_number(&s)),
        Value::Function(_) => None,
    }
}

/// `ToString`. `None` when not statically determinable.
pub fn to_string(value: &Value) -> Option<String> {
    match value {
        Value::Undefined => Some("undefined".to_owned()),
        Value::Null => Some("null".to_owned()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Num(n) => Some(js_number_to_string(*n)),
        Value::BigInt(b) => Some(b.to_string()),
        Value::Str(s) => Some(s.to_string()),
        Value::Regex { pattern, flags } => Some(format!("/{pattern}/{flags}")),
        Value::Array(array) => array_join(array),
        Value::Function(_) => None,
    }
}

/// `Array.prototype.toString` (comma join). `None` as soon as any element
/// is tainted or itself not determinable.
fn array_join(array: &SharedArray) -> Option<String> {
    let elements = array.borrow();
    let mut out = String::new();
    for (i, carrier) in elements.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if carrier.tainted() {
            return None;
        }
        let value = carrier.value()?;
        if value.is_nullish() {
            continue;
        }
        out.push_str(&to_string(value)?);
    }
    Some(out)
}

/// The string number grammar: `Number("...")`.
pub fn parse_js_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        return parse_radix(hex, 16);
    }
    if let Some(oct) = trimmed.strip_prefix("0o").or_else(|| trimmed.strip_prefix("0O")) {
        return parse_radix(oct, 8);
    }
    if let Some(bin) = trimmed.strip_prefix("0b").or_else(|| trimmed.strip_prefix("0B")) {
        return parse_radix(bin, 2);
    }
    // Reject Rust-only spellings ("inf", "NaN") before delegating: the JS
    // grammar treats them as unparseable, which is NaN anyway.
    if trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E'))
    {
        trimmed.parse::<f64>().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

fn parse_radix(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    let mut acc = 0.0f64;
    for c in digits.chars() {
        match c.to_digit(radix) {
            Some(d) => acc = acc * f64::from(radix) + f64::from(d),
            None => return f64::NAN,
        }
    }
    acc
}

/// `String(number)` with the standard thresholds for exponent notation.
pub fn js_number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_owned();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }
    if n == 0.0 {
        return "0".to_owned();
    }
    let abs = n.abs();
    if abs >= 1e21 || abs < 1e-6 {
        return exponent_form(n);
    }
    if n.fract() == 0.0 {
        // Integral and below the exponent threshold: no fraction digits.
        return format!("{n:.0}");
    }
    // Rust's shortest round-trip formatting matches the JS algorithm in the
    // fixed-notation range.
    format!("{n}")
}

/// JS exponent notation: `1e+21`, `1.5e-7`.
fn exponent_form(n: f64) -> String {
    let formatted = format!("{n:e}");
    match formatted.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
        _ => formatted,
    }
}

/// `ToInt32` (used by bitwise operators and signed shifts).
pub fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

/// `ToUint32` (used by `>>>`).
pub fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() || n == 0.0 {
        return 0;
    }
    let modulus = 2f64.powi(32);
    let mut m = n.trunc() % modulus;
    if m < 0.0 {
        m += modulus;
    }
    m as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TaintedValue;

    #[test]
    fn string_number_grammar() {
        assert_eq!(parse_js_number(""), 0.0);
        assert_eq!(parse_js_number("  12  "), 12.0);
        assert_eq!(parse_js_number("0x10"), 16.0);
        assert_eq!(parse_js_number("0b101"), 5.0);
        assert_eq!(parse_js_number("0o17"), 15.0);
        assert_eq!(parse_js_number("1e3"), 1000.0);
        assert_eq!(parse_js_number(".5"), 0.5);
        assert_eq!(parse_js_number("-Infinity"), f64::NEG_INFINITY);
        assert!(parse_js_number("12px").is_nan());
        assert!(parse_js_number("inf").is_nan());
    }

    #[test]
    fn number_to_string_thresholds() {
        assert_eq!(js_number_to_string(0.0), "0");
        assert_eq!(js_number_to_string(-0.0), "0");
        assert_eq!(js_number_to_string(3.0), "3");
        assert_eq!(js_number_to_string(-42.0), "-42");
        assert_eq!(js_number_to_string(0.1), "0.1");
        assert_eq!(js_number_to_string(1e21), "1e+21");
        assert_eq!(js_number_to_string(1e-7), "1e-7");
        assert_eq!(js_number_to_string(1e20), "100000000000000000000");
        assert_eq!(js_number_to_string(f64::NAN), "NaN");
        assert_eq!(js_number_to_string(f64::INFINITY), "Infinity");
    }

    #[test]
    fn int32_wrapping() {
        assert_eq!(to_int32(0.0), 0);
        assert_eq!(to_int32(-1.0), -1);
        assert_eq!(to_int32(2147483648.0), -2147483648);
        assert_eq!(to_uint32(-1.0), 4294967295);
        assert_eq!(to_int32(f64::NAN), 0);
        assert_eq!(to_uint32(f64::INFINITY), 0);
    }

    #[test]
    fn array_string_form() {
        let array = SharedArray::new(vec![
            TaintedValue::of(Value::Num(1.0)),
            TaintedValue::of(Value::Undefined),
            TaintedValue::of(Value::str("x")),
        ]);
        assert_eq!(to_string(&Value::Array(array)).as_deref(), Some("1,,x"));
    }

    #[test]
    fn tainted_array_element_blocks_coercion() {
        let array = SharedArray::new(vec![TaintedValue::reference(unveil_ast::Name::from_raw(5))]);
        assert!(to_string(&Value::Array(array.clone())).is_none());
        assert!(to_number(&Value::Array(array)).is_none());
    }
}
