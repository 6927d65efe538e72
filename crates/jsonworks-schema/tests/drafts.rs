//! Draft-specific semantics selected at compile time.

use jsonworks_schema::{EvalOptions, JsonSchema, SchemaError};
use serde_json::{json, Value};

fn check(schema: Value, instance: Value, expected: bool) {
    let schema = JsonSchema::from_value(schema).expect("schema compiles");
    let results = schema
        .evaluate(&instance, &EvalOptions::new())
        .expect("evaluation succeeds");
    assert_eq!(results.valid(), expected, "instance {}", instance);
}

#[test]
fn test_draft6_declaration() {
    let schema = json!({
        "$schema": "http://json-schema.org/draft-06/schema#",
        "exclusiveMinimum": 3
    });
    check(schema.clone(), json!(3), false);
    check(schema, json!(4), true);
}

#[test]
fn test_draft4_meta_schema_rejected() {
    let result = JsonSchema::from_value(json!({
        "$schema": "http://json-schema.org/draft-04/schema#",
        "type": "integer"
    }));
    assert!(matches!(result, Err(SchemaError::UnknownMetaSchema(_))));
}

#[test]
fn test_unregistered_custom_meta_schema_rejected() {
    let result = JsonSchema::from_value(json!({
        "$schema": "https://example.com/never-registered",
        "type": "integer"
    }));
    assert!(matches!(result, Err(SchemaError::UnknownMetaSchema(_))));
}

#[test]
fn test_draft_next_contains_applies_to_objects() {
    let schema = json!({
        "$schema": "https://json-schema.org/draft/next/schema",
        "contains": {"type": "integer"}
    });
    check(schema.clone(), json!({"a": 1, "b": "x"}), true);
    check(schema.clone(), json!({"a": "x"}), false);
    // Array behavior is unchanged.
    check(schema.clone(), json!([1, "x"]), true);
    check(schema, json!(["x"]), false);
}

#[test]
fn test_contains_ignores_objects_before_next() {
    let schema = json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "contains": {"type": "integer"}
    });
    check(schema, json!({"a": "x"}), true);
}

#[test]
fn test_draft7_anchor_spelled_as_id_fragment() {
    let schema = json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "definitions": {
            "name": {"$id": "#name", "type": "string"}
        },
        "properties": {"name": {"$ref": "#name"}}
    });
    check(schema.clone(), json!({"name": "x"}), true);
    check(schema, json!({"name": 1}), false);
}

#[test]
fn test_recursive_keywords_are_draft_gated() {
    // `$recursiveRef` is 2019-09 only; 2020-12 sees an unknown keyword.
    let schema = json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "integer",
        "$recursiveRef": "#"
    });
    check(schema, json!(1), true);
}
