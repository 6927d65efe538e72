use serde_json::Value;

/// The kind of a JSON value.
///
/// `Integer` is a derived kind: any number whose fractional part is zero,
/// including `1.0` and `-0`. A value never classifies as plain `Number`
/// unless it has a non-zero fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Boolean => "boolean",
            ValueKind::Integer => "integer",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Classifies a JSON value.
pub fn kind(value: &Value) -> ValueKind {
    match value {
        Value::Null => ValueKind::Null,
        Value::Bool(_) => ValueKind::Boolean,
        Value::Number(n) => {
            if crate::num::is_integer(n) {
                ValueKind::Integer
            } else {
                ValueKind::Number
            }
        }
        Value::String(_) => ValueKind::String,
        Value::Array(_) => ValueKind::Array,
        Value::Object(_) => ValueKind::Object,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_kinds() {
        assert_eq!(kind(&json!(null)), ValueKind::Null);
        assert_eq!(kind(&json!(true)), ValueKind::Boolean);
        assert_eq!(kind(&json!("x")), ValueKind::String);
        assert_eq!(kind(&json!([])), ValueKind::Array);
        assert_eq!(kind(&json!({})), ValueKind::Object);
    }

    #[test]
    fn test_integer_is_derived() {
        assert_eq!(kind(&json!(1)), ValueKind::Integer);
        assert_eq!(kind(&json!(1.0)), ValueKind::Integer);
        assert_eq!(kind(&json!(-0.0)), ValueKind::Integer);
        assert_eq!(kind(&json!(1.5)), ValueKind::Number);
    }
}
