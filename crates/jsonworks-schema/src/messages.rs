//! Error message templates.
//!
//! Templates contain `[[token]]` placeholders substituted from a per-keyword
//! context. The table is process-wide and overridable for localization;
//! install overrides before starting concurrent evaluations, the table is
//! treated as read-mostly.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

fn defaults() -> HashMap<&'static str, String> {
    let entries: &[(&'static str, &'static str)] = &[
        ("FalseSchema", "All values fail against the false schema"),
        ("Type", "Value is [[received]] but should be [[expected]]"),
        ("Const", "Value should equal [[expected]]"),
        ("Enum", "Value should be one of [[values]]"),
        ("MultipleOf", "[[received]] is not a multiple of [[divisor]]"),
        ("Minimum", "[[received]] is less than [[limit]]"),
        ("Maximum", "[[received]] is greater than [[limit]]"),
        ("ExclusiveMinimum", "[[received]] is not greater than [[limit]]"),
        ("ExclusiveMaximum", "[[received]] is not less than [[limit]]"),
        ("MinLength", "Value is shorter than [[limit]] characters"),
        ("MaxLength", "Value is longer than [[limit]] characters"),
        ("Pattern", "Value does not match the pattern [[pattern]]"),
        ("MinItems", "Array has fewer than [[limit]] items"),
        ("MaxItems", "Array has more than [[limit]] items"),
        ("UniqueItems", "Items at [[first]] and [[second]] are equal"),
        ("MinProperties", "Object has fewer than [[limit]] properties"),
        ("MaxProperties", "Object has more than [[limit]] properties"),
        ("Required", "Required properties [[missing]] are absent"),
        (
            "DependentRequired",
            "Properties [[missing]] are required when [[property]] is present",
        ),
        (
            "ContainsTooFew",
            "[[received]] items matched, at least [[minimum]] required",
        ),
        (
            "ContainsTooMany",
            "[[received]] items matched, at most [[maximum]] allowed",
        ),
        ("AllOf", "[[failed]] subschemas failed"),
        ("AnyOf", "No subschema matched"),
        ("OneOfNone", "No subschema matched, exactly one required"),
        (
            "OneOfTooMany",
            "[[matched]] subschemas matched, exactly one required",
        ),
        ("Not", "Value should not match the schema"),
        ("Then", "Value fails the consequent schema"),
        ("Else", "Value fails the alternative schema"),
        ("Properties", "Properties [[properties]] failed validation"),
        (
            "PatternProperties",
            "Properties [[properties]] failed validation",
        ),
        (
            "AdditionalProperties",
            "Additional properties [[properties]] failed validation",
        ),
        ("PropertyNames", "Property names [[properties]] are invalid"),
        (
            "DependentSchemas",
            "Schemas for properties [[properties]] failed",
        ),
        ("Items", "Items at [[indices]] failed validation"),
        (
            "UnevaluatedProperties",
            "Unevaluated properties [[properties]] failed validation",
        ),
        (
            "UnevaluatedItems",
            "Unevaluated items at [[indices]] failed validation",
        ),
        ("Format", "Value is not a valid [[format]]"),
        ("Ref", "Value does not match the referenced schema"),
        ("UnresolvedRef", "Reference [[reference]] cannot be resolved"),
    ];
    entries.iter().map(|(k, v)| (*k, (*v).to_string())).collect()
}

fn table() -> &'static RwLock<HashMap<&'static str, String>> {
    static TABLE: OnceLock<RwLock<HashMap<&'static str, String>>> = OnceLock::new();
    TABLE.get_or_init(|| RwLock::new(defaults()))
}

/// Replaces the template for `key`. Unknown keys install a new entry, which
/// lets custom keywords reuse the same rendering path.
pub fn set_template(key: &'static str, template: impl Into<String>) {
    table().write().unwrap().insert(key, template.into());
}

/// Renders the template for `key`, substituting `[[name]]` tokens with
/// stringified values. Strings substitute bare, everything else as JSON.
pub fn render(key: &str, tokens: &[(&str, Value)]) -> String {
    let template = table()
        .read()
        .unwrap()
        .get(key)
        .cloned()
        .unwrap_or_else(|| key.to_string());
    let mut message = template;
    for (name, value) in tokens {
        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        message = message.replace(&format!("[[{}]]", name), &text);
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_substitutes_tokens() {
        let msg = render(
            "Minimum",
            &[("received", json!(2)), ("limit", json!(3))],
        );
        assert_eq!(msg, "2 is less than 3");
    }

    #[test]
    fn test_render_string_tokens_unquoted() {
        let msg = render("Format", &[("format", json!("uuid"))]);
        assert_eq!(msg, "Value is not a valid uuid");
    }

    #[test]
    fn test_override() {
        set_template("UniqueItems", "duplicate at [[first]]/[[second]]");
        let msg = render("UniqueItems", &[("first", json!(0)), ("second", json!(1))]);
        assert_eq!(msg, "duplicate at 0/1");
        set_template("UniqueItems", "Items at [[first]] and [[second]] are equal");
    }
}
