//! Structural hash compatible with [`crate::equal::equivalent`].
//!
//! FNV-1a style state mixing with per-kind discriminators. Object entries
//! are hashed independently and XOR-combined so key order does not matter,
//! matching the order-insensitive object equivalence. Numbers that compare
//! equal across representations hash identically.

use serde_json::{Map, Value};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

const NULL_TAG: u64 = 0x01;
const FALSE_TAG: u64 = 0x02;
const TRUE_TAG: u64 = 0x03;
const INT_TAG: u64 = 0x04;
const FLOAT_TAG: u64 = 0x05;
const STRING_TAG: u64 = 0x06;
const ARRAY_TAG: u64 = 0x07;
const OBJECT_TAG: u64 = 0x08;

fn mix(state: u64, byte: u8) -> u64 {
    (state ^ byte as u64).wrapping_mul(FNV_PRIME)
}

fn mix_u64(mut state: u64, word: u64) -> u64 {
    for byte in word.to_le_bytes() {
        state = mix(state, byte);
    }
    state
}

fn mix_str(mut state: u64, s: &str) -> u64 {
    state = mix_u64(state, STRING_TAG);
    state = mix_u64(state, s.len() as u64);
    for byte in s.as_bytes() {
        state = mix(state, *byte);
    }
    state
}

fn mix_number(state: u64, n: &serde_json::Number) -> u64 {
    // Integer-valued numbers hash through their integral value so `1` and
    // `1.0` collide, as equivalence requires.
    if crate::num::is_integer(n) {
        if let Some(i) = n.as_i64() {
            return mix_u64(mix_u64(state, INT_TAG), i as u64);
        }
        if let Some(u) = n.as_u64() {
            return mix_u64(mix_u64(state, INT_TAG), u);
        }
        if let Some(f) = n.as_f64() {
            if f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                return mix_u64(mix_u64(state, INT_TAG), f as i64 as u64);
            }
        }
    }
    let bits = n.as_f64().unwrap_or(0.0).to_bits();
    mix_u64(mix_u64(state, FLOAT_TAG), bits)
}

fn mix_value(state: u64, value: &Value) -> u64 {
    match value {
        Value::Null => mix_u64(state, NULL_TAG),
        Value::Bool(b) => mix_u64(state, if *b { TRUE_TAG } else { FALSE_TAG }),
        Value::Number(n) => mix_number(state, n),
        Value::String(s) => mix_str(state, s),
        Value::Array(arr) => {
            let mut state = mix_u64(state, ARRAY_TAG);
            state = mix_u64(state, arr.len() as u64);
            for item in arr {
                state = mix_value(state, item);
            }
            state
        }
        Value::Object(obj) => mix_object(state, obj),
    }
}

fn mix_object(state: u64, obj: &Map<String, Value>) -> u64 {
    let mut state = mix_u64(state, OBJECT_TAG);
    state = mix_u64(state, obj.len() as u64);
    // XOR-combine per-entry hashes for key-order insensitivity.
    let mut combined: u64 = 0;
    for (key, value) in obj {
        let entry = mix_value(mix_str(FNV_OFFSET, key), value);
        combined ^= entry;
    }
    mix_u64(state, combined)
}

/// Hash a JSON value such that equivalent values share a hash.
pub fn hash_equivalence(value: &Value) -> u64 {
    mix_value(FNV_OFFSET, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equivalent_values_hash_equal() {
        assert_eq!(
            hash_equivalence(&json!({"a": 1, "b": 2})),
            hash_equivalence(&json!({"b": 2, "a": 1}))
        );
        assert_eq!(hash_equivalence(&json!(1)), hash_equivalence(&json!(1.0)));
        assert_eq!(
            hash_equivalence(&json!([{"a": [1.0]}])),
            hash_equivalence(&json!([{"a": [1]}]))
        );
    }

    #[test]
    fn test_distinct_values_hash_differently() {
        assert_ne!(hash_equivalence(&json!([1, 2])), hash_equivalence(&json!([2, 1])));
        assert_ne!(hash_equivalence(&json!(0)), hash_equivalence(&json!(false)));
        assert_ne!(hash_equivalence(&json!(null)), hash_equivalence(&json!(0)));
        assert_ne!(hash_equivalence(&json!({})), hash_equivalence(&json!([])));
        assert_ne!(hash_equivalence(&json!("1")), hash_equivalence(&json!(1)));
    }
}
