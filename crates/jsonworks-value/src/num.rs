//! Exact numeric comparison over `serde_json::Number`.
//!
//! JSON numbers arrive as `u64`, `i64` or `f64`. Comparing across those
//! representations through `f64` alone loses precision for large integers
//! and small decimals, so the arithmetic keywords go through a
//! [`rust_decimal::Decimal`] view first and only fall back to `f64` when a
//! number does not fit the 96-bit decimal mantissa.

use rust_decimal::Decimal;
use serde_json::Number;
use std::cmp::Ordering;
use std::str::FromStr;

/// Returns the decimal view of a JSON number, or `None` when it does not fit.
pub fn decimal_of(n: &Number) -> Option<Decimal> {
    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Decimal::from(u));
    }
    // Floats go through their lexical form so `0.1` stays exactly `0.1`.
    let text = n.to_string();
    Decimal::from_str(&text)
        .ok()
        .or_else(|| Decimal::from_scientific(&text).ok())
}

/// Decimal view of a JSON value; `None` for non-numbers and numbers that do
/// not fit the decimal range.
pub fn as_decimal(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => decimal_of(n),
        _ => None,
    }
}

/// True when a JSON number has a zero fractional part.
pub fn is_integer(n: &Number) -> bool {
    if n.is_i64() || n.is_u64() {
        return true;
    }
    match n.as_f64() {
        Some(f) => f.is_finite() && f.fract() == 0.0,
        None => false,
    }
}

/// Numeric equality across representations: `1`, `1.0` and `-0` are equal.
pub fn numbers_equal(a: &Number, b: &Number) -> bool {
    compare_numbers(a, b) == Ordering::Equal
}

/// Total order over JSON numbers (JSON has no NaN).
pub fn compare_numbers(a: &Number, b: &Number) -> Ordering {
    match (decimal_of(a), decimal_of(b)) {
        (Some(da), Some(db)) => da.cmp(&db),
        _ => {
            let fa = a.as_f64().unwrap_or(0.0);
            let fb = b.as_f64().unwrap_or(0.0);
            fa.partial_cmp(&fb).unwrap_or(Ordering::Equal)
        }
    }
}

/// True when `n` is an exact multiple of `divisor`.
///
/// Decimal arithmetic where both numbers fit; otherwise the quotient is
/// checked for a zero fraction in `f64`, which is the best available for
/// out-of-range magnitudes.
pub fn is_multiple_of(n: &Number, divisor: &Number) -> bool {
    if let (Some(dn), Some(dd)) = (decimal_of(n), decimal_of(divisor)) {
        if dd.is_zero() {
            return false;
        }
        return match dn.checked_rem(dd) {
            Some(rem) => rem.is_zero(),
            None => false,
        };
    }
    let fn_ = n.as_f64().unwrap_or(0.0);
    let fd = divisor.as_f64().unwrap_or(0.0);
    if fd == 0.0 {
        return false;
    }
    let q = fn_ / fd;
    q.is_finite() && q.fract() == 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn num(v: serde_json::Value) -> Number {
        match v {
            serde_json::Value::Number(n) => n,
            _ => panic!("not a number"),
        }
    }

    #[test]
    fn test_cross_representation_equality() {
        assert!(numbers_equal(&num(json!(1)), &num(json!(1.0))));
        assert!(numbers_equal(&num(json!(-0.0)), &num(json!(0))));
        assert!(!numbers_equal(&num(json!(1)), &num(json!(1.5))));
    }

    #[test]
    fn test_large_integer_comparison() {
        let big = num(json!(u64::MAX));
        let close = num(json!(u64::MAX - 1));
        assert_eq!(compare_numbers(&big, &close), Ordering::Greater);
        assert!(!numbers_equal(&big, &close));
    }

    #[test]
    fn test_multiple_of_decimal_precision() {
        // 0.0075 / 0.0001 is not exact in binary floats.
        assert!(is_multiple_of(&num(json!(0.0075)), &num(json!(0.0001))));
        assert!(is_multiple_of(&num(json!(9)), &num(json!(3))));
        assert!(!is_multiple_of(&num(json!(9)), &num(json!(2))));
        assert!(is_multiple_of(&num(json!(0)), &num(json!(3))));
    }

    #[test]
    fn test_multiple_of_zero_divisor() {
        assert!(!is_multiple_of(&num(json!(5)), &num(json!(0))));
    }

    #[test]
    fn test_is_integer() {
        assert!(is_integer(&num(json!(3))));
        assert!(is_integer(&num(json!(3.0))));
        assert!(!is_integer(&num(json!(3.1))));
    }
}
