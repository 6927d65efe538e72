//! Output formats, message templates and evaluation options.

use jsonworks_schema::{
    messages, Draft, EvalOptions, JsonSchema, OutputFormat, TraceEvent,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

fn evaluate_with(schema: Value, instance: Value, options: &EvalOptions) -> Value {
    let schema = JsonSchema::from_value(schema).expect("schema compiles");
    schema
        .evaluate(&instance, options)
        .expect("evaluation succeeds")
        .to_value()
}

// ------------------------------------------------------------------ formats

#[test]
fn test_flag_output_shape() {
    let options = EvalOptions::new().with_output_format(OutputFormat::Flag);
    assert_eq!(
        evaluate_with(json!({"type": "integer"}), json!(5), &options),
        json!({"valid": true})
    );
    assert_eq!(
        evaluate_with(json!({"type": "integer"}), json!("x"), &options),
        json!({"valid": false})
    );
}

#[test]
fn test_hierarchical_output_shape() {
    let options = EvalOptions::new().with_output_format(OutputFormat::Hierarchical);
    let value = evaluate_with(
        json!({"properties": {"a": {"type": "integer"}}}),
        json!({"a": "x"}),
        &options,
    );
    assert_eq!(value["valid"], json!(false));
    assert_eq!(value["evaluationPath"], json!(""));
    assert_eq!(value["instanceLocation"], json!(""));
    let details = value["details"].as_array().expect("nested details");
    let child = &details[0];
    assert_eq!(child["evaluationPath"], json!("/properties/a"));
    assert_eq!(child["instanceLocation"], json!("/a"));
    assert_eq!(child["valid"], json!(false));
    assert!(child["errors"]["type"].is_string());
}

#[test]
fn test_list_output_flattens() {
    let options = EvalOptions::new().with_output_format(OutputFormat::List);
    let value = evaluate_with(
        json!({"properties": {"a": {"type": "integer"}}}),
        json!({"a": 1}),
        &options,
    );
    assert_eq!(value["valid"], json!(true));
    let details = value["details"].as_array().expect("flat details");
    assert_eq!(details.len(), 2);
    assert!(details.iter().all(|d| d.get("details").is_none()));
}

#[test]
fn test_absolute_keyword_location_tracks_ref_target() {
    let options = EvalOptions::new();
    let schema = JsonSchema::from_value(json!({
        "$id": "https://example.com/root",
        "$defs": {"t": {"type": "integer"}},
        "$ref": "#/$defs/t"
    }))
    .unwrap();
    let results = schema.evaluate(&json!(1), &options).unwrap();
    let ref_node = &results.root.nested[0];
    assert_eq!(ref_node.evaluation_path, "/$ref");
    assert_eq!(
        ref_node.absolute_keyword_location,
        "https://example.com/root#/$defs/t"
    );
}

// ----------------------------------------------------------------- messages

#[test]
fn test_message_template_override() {
    messages::set_template("MaxItems", "too many ([[limit]] allowed)");
    let schema = JsonSchema::from_value(json!({"maxItems": 1})).unwrap();
    let results = schema.evaluate(&json!([1, 2]), &EvalOptions::new()).unwrap();
    assert_eq!(
        results.root.errors.get("maxItems").map(String::as_str),
        Some("too many (1 allowed)")
    );
    messages::set_template("MaxItems", "Array has more than [[limit]] items");
}

// ------------------------------------------------------------------ options

#[test]
fn test_custom_keywords_option() {
    let schema = json!({"x-internal": {"owner": "infra"}, "type": "object"});

    let options = EvalOptions::new().with_custom_keywords(true);
    let value = evaluate_with(schema.clone(), json!({}), &options);
    assert_eq!(value["annotations"]["x-internal"], json!({"owner": "infra"}));

    let value = evaluate_with(schema, json!({}), &EvalOptions::new());
    assert!(value.get("annotations").is_none());
}

#[test]
fn test_format_annotation_by_default_assertion_on_request() {
    let schema = json!({"format": "ipv4"});
    let instance = json!("999.1.1.1");

    let relaxed = evaluate_with(schema.clone(), instance.clone(), &EvalOptions::new());
    assert_eq!(relaxed["valid"], json!(true));
    assert_eq!(relaxed["annotations"]["format"], json!("ipv4"));

    let strict = EvalOptions::new().with_format_validation(true);
    let value = evaluate_with(schema.clone(), instance, &strict);
    assert_eq!(value["valid"], json!(false));

    // Unknown formats never assert.
    let value = evaluate_with(json!({"format": "zip-code"}), json!("???"), &strict);
    assert_eq!(value["valid"], json!(true));
}

#[test]
fn test_evaluate_as_selects_keyword_variants() {
    // Tuple-form `items` only parses pre-2020-12.
    let schema = json!({"items": [{"type": "integer"}, {"type": "string"}]});
    assert!(JsonSchema::from_value(schema.clone()).is_err());

    let options = EvalOptions::new().with_evaluate_as(Draft::Draft7);
    let compiled = JsonSchema::from_value_with(schema, &options).unwrap();
    assert!(compiled.evaluate(&json!([1, "a"]), &options).unwrap().valid());
    assert!(!compiled.evaluate(&json!(["a", 1]), &options).unwrap().valid());
}

#[test]
fn test_additional_items_draft7() {
    let options = EvalOptions::new().with_evaluate_as(Draft::Draft7);
    let schema = JsonSchema::from_value_with(
        json!({
            "items": [{"type": "integer"}],
            "additionalItems": {"type": "string"}
        }),
        &options,
    )
    .unwrap();
    assert!(schema.evaluate(&json!([1, "a", "b"]), &options).unwrap().valid());
    assert!(!schema.evaluate(&json!([1, 2]), &options).unwrap().valid());
}

#[test]
fn test_dependencies_draft7() {
    let options = EvalOptions::new().with_evaluate_as(Draft::Draft7);
    let schema = JsonSchema::from_value_with(
        json!({
            "dependencies": {
                "credit": ["billing"],
                "debit": {"required": ["account"]}
            }
        }),
        &options,
    )
    .unwrap();
    assert!(schema
        .evaluate(&json!({"credit": 1, "billing": 2}), &options)
        .unwrap()
        .valid());
    assert!(!schema.evaluate(&json!({"credit": 1}), &options).unwrap().valid());
    assert!(!schema.evaluate(&json!({"debit": 1}), &options).unwrap().valid());
}

#[test]
fn test_unknown_draft_keywords_are_ignored() {
    // `prefixItems` does not exist in draft 7; with custom keyword
    // processing off it is dropped entirely.
    let options = EvalOptions::new().with_evaluate_as(Draft::Draft7);
    let schema = JsonSchema::from_value_with(
        json!({"prefixItems": [{"type": "integer"}]}),
        &options,
    )
    .unwrap();
    assert!(schema.evaluate(&json!(["nope"]), &options).unwrap().valid());
}

#[test]
fn test_trace_callback_receives_events() {
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let options = EvalOptions::new().with_trace(Arc::new(move |event: TraceEvent<'_>| {
        sink.lock().unwrap().push(format!(
            "{}|{}|{}",
            event.evaluation_path, event.instance_location, event.message
        ));
    }));
    let schema = JsonSchema::from_value(json!({"type": "integer"})).unwrap();
    schema.evaluate(&json!("x"), &options).unwrap();
    let seen = seen.lock().unwrap();
    assert!(
        seen.iter().any(|line| line.contains("is")),
        "trace captured a failure message: {:?}",
        seen
    );
}

// ------------------------------------------------------------- vocabularies

#[test]
fn test_custom_meta_schema_disables_vocabularies() {
    let registry = Arc::new(jsonworks_schema::SchemaRegistry::new());
    registry
        .register(
            "https://example.com/assertions-only",
            json!({
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "$id": "https://example.com/assertions-only",
                "$vocabulary": {
                    "https://json-schema.org/draft/2020-12/vocab/core": true,
                    "https://json-schema.org/draft/2020-12/vocab/validation": true
                }
            }),
        )
        .unwrap();
    let schema = JsonSchema::from_value_in(
        json!({
            "$schema": "https://example.com/assertions-only",
            "type": "integer",
            "allOf": [{"type": "string"}]
        }),
        registry,
        &EvalOptions::new(),
    )
    .unwrap();
    // The applicator vocabulary is inactive: `allOf` does not run.
    assert!(schema.evaluate(&json!(5), &EvalOptions::new()).unwrap().valid());
    assert!(!schema.evaluate(&json!("s"), &EvalOptions::new()).unwrap().valid());
}
