//! Number-to-source formatting.
//!
//! Matches `String(number)`: integral values print without a fraction,
//! exponent notation kicks in at the standard thresholds, and the special
//! values print by name so the output re-parses to the same `f64`.

/// Format a numeric literal's value.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_owned();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }
    if n == 0.0 {
        return if n.is_sign_negative() { "-0" } else { "0" }.to_owned();
    }
    let abs = n.abs();
    if abs >= 1e21 || abs < 1e-6 {
        let formatted = format!("{n:e}");
        return match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => formatted,
        };
    }
    if n.fract() == 0.0 {
        return format!("{n:.0}");
    }
    format!("{n}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_values_have_no_fraction() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-42.0), "-42");
        assert_eq!(format_number(1e20), "100000000000000000000");
    }

    #[test]
    fn special_values() {
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(-0.0), "-0");
    }

    #[test]
    fn exponent_thresholds() {
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
        assert_eq!(format_number(0.1), "0.1");
    }

    #[test]
    fn output_reparses_to_same_value() {
        for value in [0.1, 123.456, 1e21, 5e-324, 1.7976931348623157e308] {
            let printed = format_number(value);
            let reparsed: f64 = printed
                .trim_start_matches('+')
                .parse()
                .unwrap_or_else(|_| panic!("unparseable output: {printed}"));
            assert_eq!(reparsed, value, "round trip failed for {printed}");
        }
    }
}
