//! Annotation collection and the unevaluated-* keywords.

use jsonworks_schema::{EvalOptions, EvaluationResults, JsonSchema};
use serde_json::{json, Value};

fn evaluate(schema: Value, instance: Value) -> EvaluationResults {
    let schema = JsonSchema::from_value(schema).expect("schema compiles");
    schema
        .evaluate(&instance, &EvalOptions::new())
        .expect("evaluation succeeds")
}

fn check(schema: Value, instance: Value, expected: bool) {
    let results = evaluate(schema.clone(), instance.clone());
    assert_eq!(
        results.valid(),
        expected,
        "schema {} instance {}",
        schema,
        instance
    );
}

// ----------------------------------------------------- unevaluatedProperties

#[test]
fn test_scenario_unevaluated_properties_sees_all_of() {
    let schema = json!({
        "allOf": [{"properties": {"a": {}}}],
        "unevaluatedProperties": false
    });
    check(schema.clone(), json!({"a": 1, "b": 2}), false);
    check(schema, json!({"a": 1}), true);
}

#[test]
fn test_unevaluated_properties_sees_ref() {
    let schema = json!({
        "$defs": {"base": {"properties": {"a": {}}}},
        "$ref": "#/$defs/base",
        "unevaluatedProperties": false
    });
    check(schema.clone(), json!({"a": 1}), true);
    check(schema, json!({"b": 1}), false);
}

#[test]
fn test_unevaluated_properties_with_schema() {
    let schema = json!({
        "properties": {"a": {}},
        "unevaluatedProperties": {"type": "integer"}
    });
    check(schema.clone(), json!({"a": "anything", "b": 3}), true);
    check(schema, json!({"a": "anything", "b": "x"}), false);
}

#[test]
fn test_if_branch_coverage_counts_when_if_passes() {
    let schema = json!({
        "if": {"properties": {"a": {"type": "integer"}}, "required": ["a"]},
        "unevaluatedProperties": false
    });
    // `if` passed, so its `properties` coverage of "a" is visible.
    check(schema.clone(), json!({"a": 1}), true);
    // `if` failed; annotations under a failed schema are dropped.
    check(schema, json!({"a": "x"}), false);
}

#[test]
fn test_failed_branch_annotations_are_dropped() {
    let schema = json!({
        "anyOf": [
            {"properties": {"a": {"type": "integer"}}, "required": ["a"]},
            {"properties": {"b": {"type": "integer"}}, "required": ["b"]}
        ],
        "unevaluatedProperties": false
    });
    // Only the second branch passes, so only "b" is covered.
    check(schema.clone(), json!({"b": 1}), true);
    check(schema, json!({"b": 1, "a": "x"}), false);
}

#[test]
fn test_additional_properties_coverage_is_visible() {
    let schema = json!({
        "allOf": [{
            "properties": {"a": {}},
            "additionalProperties": {"type": "integer"}
        }],
        "unevaluatedProperties": false
    });
    // `additionalProperties` in the branch evaluated everything.
    check(schema, json!({"a": "x", "b": 2}), true);
}

// ---------------------------------------------------------- unevaluatedItems

#[test]
fn test_unevaluated_items_after_prefix() {
    let schema = json!({
        "prefixItems": [{"type": "integer"}],
        "unevaluatedItems": false
    });
    check(schema.clone(), json!([1]), true);
    check(schema.clone(), json!([1, "a"]), false);
    check(schema, json!([]), true);
}

#[test]
fn test_unevaluated_items_sees_nested_prefix() {
    let schema = json!({
        "allOf": [{"prefixItems": [true, true]}],
        "unevaluatedItems": false
    });
    check(schema.clone(), json!([1, 2]), true);
    check(schema, json!([1, 2, 3]), false);
}

#[test]
fn test_contains_matches_count_as_evaluated() {
    let schema = json!({
        "contains": {"type": "string"},
        "unevaluatedItems": {"type": "integer"}
    });
    // Index 0 is covered by `contains`; index 1 must be an integer.
    check(schema.clone(), json!(["a", 1]), true);
    check(schema, json!(["a", 1.5]), false);
}

#[test]
fn test_unevaluated_items_with_items_schema() {
    // A tail `items` covers everything; nothing is left unevaluated.
    let schema = json!({
        "items": {"type": "integer"},
        "unevaluatedItems": false
    });
    check(schema, json!([1, 2, 3]), true);
}

// ------------------------------------------------------- annotation plumbing

#[test]
fn test_properties_annotations_recorded() {
    let results = evaluate(
        json!({"properties": {"a": true, "b": true}}),
        json!({"a": 1, "c": 2}),
    );
    assert_eq!(
        results.root.annotations.get("properties"),
        Some(&json!(["a"]))
    );
}

#[test]
fn test_if_outcome_is_annotated() {
    let results = evaluate(json!({"if": {"type": "string"}}), json!("x"));
    assert_eq!(results.root.annotations.get("if"), Some(&json!(true)));

    let results = evaluate(json!({"if": {"type": "string"}}), json!(1));
    assert_eq!(results.root.annotations.get("if"), Some(&json!(false)));
}

#[test]
fn test_metadata_annotations() {
    let results = evaluate(
        json!({
            "title": "Port",
            "description": "A TCP port",
            "default": 8080,
            "deprecated": true,
            "examples": [80, 443]
        }),
        json!(1),
    );
    let annotations = &results.root.annotations;
    assert_eq!(annotations.get("title"), Some(&json!("Port")));
    assert_eq!(annotations.get("default"), Some(&json!(8080)));
    assert_eq!(annotations.get("deprecated"), Some(&json!(true)));
    assert_eq!(annotations.get("examples"), Some(&json!([80, 443])));
}

#[test]
fn test_content_annotations() {
    let results = evaluate(
        json!({
            "contentEncoding": "base64",
            "contentMediaType": "application/json",
            "contentSchema": {"type": "object"}
        }),
        json!("eyJ9"),
    );
    let annotations = &results.root.annotations;
    assert_eq!(annotations.get("contentEncoding"), Some(&json!("base64")));
    assert_eq!(
        annotations.get("contentSchema"),
        Some(&json!({"type": "object"}))
    );
}

#[test]
fn test_not_hides_inner_annotations_from_consumers() {
    // The inner schema of a failed `not` passed, but `not` itself is
    // invalid, so its subtree contributes no coverage.
    let schema = json!({
        "not": {"not": {"properties": {"a": {}}}},
        "unevaluatedProperties": false
    });
    check(schema, json!({"a": 1}), false);
}
