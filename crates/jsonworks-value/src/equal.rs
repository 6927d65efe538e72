use crate::num::numbers_equal;
use serde_json::Value;

/// Deep structural equivalence between two JSON values.
///
/// Objects compare order-insensitively, arrays order-sensitively, and
/// numbers numerically across representations (`1` is equivalent to `1.0`).
/// This is the equality used by `const`, `enum` and `uniqueItems`.
pub fn equivalent(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (Value::String(a), Value::String(b)) => a == b,

        (Value::Array(arr_a), Value::Array(arr_b)) => {
            if arr_a.len() != arr_b.len() {
                return false;
            }
            arr_a.iter().zip(arr_b).all(|(x, y)| equivalent(x, y))
        }

        (Value::Object(obj_a), Value::Object(obj_b)) => {
            if obj_a.len() != obj_b.len() {
                return false;
            }
            for (key, val_a) in obj_a {
                match obj_b.get(key) {
                    Some(val_b) => {
                        if !equivalent(val_a, val_b) {
                            return false;
                        }
                    }
                    None => return false,
                }
            }
            true
        }

        // Different kinds are never equivalent.
        _ => false,
    }
}
