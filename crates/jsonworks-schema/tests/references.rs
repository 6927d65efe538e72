//! Reference resolution: pointers, anchors, cross-resource refs, dynamic
//! and recursive references, cycles and the fetcher.

use jsonworks_schema::{EvalOptions, JsonSchema, SchemaError, SchemaRegistry};
use serde_json::{json, Value};
use std::sync::Arc;

fn check(schema: Value, instance: Value, expected: bool) {
    let schema = JsonSchema::from_value(schema).expect("schema compiles");
    let results = schema
        .evaluate(&instance, &EvalOptions::new())
        .expect("evaluation succeeds");
    assert_eq!(results.valid(), expected, "instance {}", instance);
}

// --------------------------------------------------------------- local refs

#[test]
fn test_ref_by_pointer() {
    let schema = json!({
        "$defs": {"positive": {"type": "integer", "minimum": 1}},
        "$ref": "#/$defs/positive"
    });
    check(schema.clone(), json!(3), true);
    check(schema, json!(0), false);
}

#[test]
fn test_ref_by_anchor() {
    let schema = json!({
        "$defs": {"name": {"$anchor": "name", "type": "string"}},
        "properties": {"name": {"$ref": "#name"}}
    });
    check(schema.clone(), json!({"name": "x"}), true);
    check(schema, json!({"name": 1}), false);
}

#[test]
fn test_ref_matches_direct_evaluation() {
    let via_ref = json!({
        "$defs": {"t": {"type": "integer", "minimum": 3}},
        "$ref": "#/$defs/t"
    });
    let direct = json!({"type": "integer", "minimum": 3});
    for instance in [json!(5), json!(2), json!("x")] {
        let a = JsonSchema::from_value(via_ref.clone()).unwrap();
        let b = JsonSchema::from_value(direct.clone()).unwrap();
        assert_eq!(
            a.evaluate(&instance, &EvalOptions::new()).unwrap().valid(),
            b.evaluate(&instance, &EvalOptions::new()).unwrap().valid(),
            "instance {}",
            instance
        );
    }
}

#[test]
fn test_recursive_tree_schema() {
    // Self-reference through a consumed instance is legal.
    let schema = json!({
        "$defs": {
            "node": {
                "type": "object",
                "properties": {
                    "value": {"type": "integer"},
                    "children": {"type": "array", "items": {"$ref": "#/$defs/node"}}
                },
                "required": ["value"]
            }
        },
        "$ref": "#/$defs/node"
    });
    check(
        schema.clone(),
        json!({"value": 1, "children": [{"value": 2, "children": []}]}),
        true,
    );
    check(schema, json!({"value": 1, "children": [{"children": []}]}), false);
}

// ------------------------------------------------------- cross-resource refs

#[test]
fn test_ref_across_registered_resources() {
    let registry = Arc::new(SchemaRegistry::new());
    registry
        .register(
            "https://example.com/defs",
            json!({
                "$id": "https://example.com/defs",
                "$defs": {"port": {"type": "integer", "minimum": 1, "maximum": 65535}}
            }),
        )
        .unwrap();
    let schema = JsonSchema::from_value_in(
        json!({
            "$id": "https://example.com/config",
            "properties": {"port": {"$ref": "defs#/$defs/port"}}
        }),
        registry,
        &EvalOptions::new(),
    )
    .unwrap();
    let options = EvalOptions::new();
    assert!(schema.evaluate(&json!({"port": 8080}), &options).unwrap().valid());
    assert!(!schema.evaluate(&json!({"port": 0}), &options).unwrap().valid());
}

#[test]
fn test_embedded_resource_ref() {
    let schema = json!({
        "$id": "https://example.com/outer",
        "$defs": {
            "inner": {
                "$id": "https://example.com/inner",
                "type": "string"
            }
        },
        "$ref": "https://example.com/inner"
    });
    check(schema.clone(), json!("x"), true);
    check(schema, json!(1), false);
}

// ------------------------------------------------------------- failure modes

#[test]
fn test_unresolved_ref_is_invalid_not_fatal() {
    let schema = JsonSchema::from_value(json!({
        "$ref": "https://nowhere.invalid/schema"
    }))
    .unwrap();
    let results = schema.evaluate(&json!(1), &EvalOptions::new()).unwrap();
    assert!(!results.valid());
    let message = results.root.errors.get("$ref").expect("diagnostic recorded");
    assert!(message.contains("nowhere.invalid"), "got {}", message);
}

#[test]
fn test_self_ref_cycle_is_fatal() {
    let schema = JsonSchema::from_value(json!({"$ref": "#"})).unwrap();
    let result = schema.evaluate(&json!(1), &EvalOptions::new());
    assert!(matches!(result, Err(SchemaError::CycleDetected { .. })));
}

#[test]
fn test_mutual_ref_cycle_is_fatal() {
    let schema = JsonSchema::from_value(json!({
        "$defs": {
            "a": {"$ref": "#/$defs/b"},
            "b": {"$ref": "#/$defs/a"}
        },
        "$ref": "#/$defs/a"
    }))
    .unwrap();
    let result = schema.evaluate(&json!(1), &EvalOptions::new());
    assert!(matches!(result, Err(SchemaError::CycleDetected { .. })));
}

// ------------------------------------------------------------------ fetcher

#[test]
fn test_fetcher_resolves_remote_ref() {
    let mut registry = SchemaRegistry::new();
    registry.set_fetcher(Arc::new(|uri: &str| {
        (uri == "https://example.com/remote").then(|| json!({"type": "integer"}))
    }));
    let schema = JsonSchema::from_value_in(
        json!({"$ref": "https://example.com/remote"}),
        Arc::new(registry),
        &EvalOptions::new(),
    )
    .unwrap();
    let options = EvalOptions::new();
    assert!(schema.evaluate(&json!(5), &options).unwrap().valid());
    assert!(!schema.evaluate(&json!("x"), &options).unwrap().valid());
}

// -------------------------------------------------------- draft 7 exclusive

#[test]
fn test_draft7_ref_suppresses_siblings() {
    let schema = json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "definitions": {"s": {"type": "string"}},
        "$ref": "#/definitions/s",
        "type": "number"
    });
    // The sibling `type` is ignored pre-2019-09.
    check(schema, json!("x"), true);
}

#[test]
fn test_2020_ref_is_a_peer() {
    let schema = json!({
        "$defs": {"s": {"type": "string"}},
        "$ref": "#/$defs/s",
        "maxLength": 1
    });
    check(schema.clone(), json!("x"), true);
    check(schema, json!("xy"), false);
}

// -------------------------------------------------------------- dynamic refs

#[test]
fn test_dynamic_ref_scenario() {
    // Generic list whose element type is open for extension.
    let registry = Arc::new(SchemaRegistry::new());
    registry
        .register(
            "https://example.com/list",
            json!({
                "$id": "https://example.com/list",
                "$dynamicAnchor": "T",
                "type": ["array", "object", "string", "number", "boolean", "null"],
                "if": {"type": "array"},
                "then": {"items": {"$dynamicRef": "#T"}}
            }),
        )
        .unwrap();

    // Derived resource: same list shape, but elements must be strings.
    let derived = JsonSchema::from_value_in(
        json!({
            "$id": "https://example.com/string-list",
            "$ref": "https://example.com/list",
            "$defs": {
                "element": {"$dynamicAnchor": "T", "type": "string"}
            }
        }),
        registry.clone(),
        &EvalOptions::new(),
    )
    .unwrap();

    let options = EvalOptions::new();
    assert!(derived
        .evaluate(&json!(["a", "b"]), &options)
        .unwrap()
        .valid());
    // Entered via the derived resource, "#T" must land on its anchor.
    assert!(!derived.evaluate(&json!(["a", 1]), &options).unwrap().valid());

    // Entered via the base resource alone, the base anchor wins.
    let base = JsonSchema::from_value_in(
        json!({"$ref": "https://example.com/list"}),
        registry,
        &EvalOptions::new(),
    )
    .unwrap();
    assert!(base.evaluate(&json!(["a", 1]), &options).unwrap().valid());
}

// ------------------------------------------------------------ recursive refs

#[test]
fn test_recursive_ref_extends_through_anchor() {
    let registry = Arc::new(SchemaRegistry::new());
    registry
        .register(
            "https://example.com/base",
            json!({
                "$schema": "https://json-schema.org/draft/2019-09/schema",
                "$id": "https://example.com/base",
                "$recursiveAnchor": true,
                "type": "object",
                "properties": {"child": {"$recursiveRef": "#"}}
            }),
        )
        .unwrap();

    // Derived resource re-anchors recursion, so nested children must also
    // satisfy the derived constraints.
    let derived = JsonSchema::from_value_in(
        json!({
            "$schema": "https://json-schema.org/draft/2019-09/schema",
            "$id": "https://example.com/derived",
            "$recursiveAnchor": true,
            "$ref": "https://example.com/base",
            "required": ["name"]
        }),
        registry.clone(),
        &EvalOptions::new(),
    )
    .unwrap();

    let options = EvalOptions::new();
    assert!(derived
        .evaluate(&json!({"name": "a", "child": {"name": "b"}}), &options)
        .unwrap()
        .valid());
    assert!(!derived
        .evaluate(&json!({"name": "a", "child": {}}), &options)
        .unwrap()
        .valid());

    // Without a recursive anchor on the outer resource, recursion stays in
    // the base schema and the derived requirements do not propagate down.
    let plain = JsonSchema::from_value_in(
        json!({
            "$schema": "https://json-schema.org/draft/2019-09/schema",
            "$id": "https://example.com/plain",
            "$ref": "https://example.com/base",
            "required": ["name"]
        }),
        registry,
        &EvalOptions::new(),
    )
    .unwrap();
    assert!(plain
        .evaluate(&json!({"name": "a", "child": {}}), &options)
        .unwrap()
        .valid());
}
