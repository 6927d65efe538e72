//! Applicator keywords: everything that descends into subschemas.
//!
//! The properties and items families communicate through annotations on the
//! current frame: `properties`/`patternProperties` record the names they
//! evaluated and `additionalProperties` picks up the rest; `prefixItems`
//! (or a positional legacy `items`) records the highest index it covered
//! and the tail applicator continues from there. Priorities guarantee the
//! producers run before the consumers.

use super::{expect_schema_array, expect_schema_map, expect_string_array};
use crate::context::EvalContext;
use crate::draft::{Draft, DraftSet};
use crate::error::SchemaError;
use crate::keyword::{priority, ItemsForm, Keyword, KeywordDef};
use crate::schema::{CompileCtx, Schema};
use crate::vocabulary::Vocabulary;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

// ── Parsing ────────────────────────────────────────────────────────────────

macro_rules! list_parser {
    ($fn_name:ident, $name:literal, $variant:ident) => {
        fn $fn_name(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
            Ok(Keyword::$variant(expect_schema_array($name, value, ctx)?))
        }
    };
}

macro_rules! single_parser {
    ($fn_name:ident, $name:literal, $variant:ident) => {
        fn $fn_name(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
            Ok(Keyword::$variant(ctx.compile_child(value, &[$name])?))
        }
    };
}

list_parser!(parse_all_of, "allOf", AllOf);
list_parser!(parse_any_of, "anyOf", AnyOf);
list_parser!(parse_one_of, "oneOf", OneOf);
list_parser!(parse_prefix_items, "prefixItems", PrefixItems);

single_parser!(parse_not, "not", Not);
single_parser!(parse_if, "if", If);
single_parser!(parse_then, "then", Then);
single_parser!(parse_else, "else", Else);
single_parser!(parse_additional_properties, "additionalProperties", AdditionalProperties);
single_parser!(parse_property_names, "propertyNames", PropertyNames);
single_parser!(parse_items_tail, "items", Items);
single_parser!(parse_additional_items, "additionalItems", AdditionalItems);
single_parser!(parse_contains, "contains", Contains);

fn parse_properties(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    Ok(Keyword::Properties(expect_schema_map("properties", value, ctx)?))
}

fn parse_pattern_properties(
    value: &Value,
    ctx: &mut CompileCtx<'_>,
) -> Result<Keyword, SchemaError> {
    let entries = value.as_object().ok_or_else(|| {
        SchemaError::compile("patternProperties", ctx.location(), "must be an object")
    })?;
    let mut patterns = Vec::with_capacity(entries.len());
    for (pattern, sub) in entries {
        let re = super::compile_regex("patternProperties", pattern, ctx)?;
        let schema = ctx.compile_child(sub, &["patternProperties", pattern])?;
        patterns.push((pattern.clone(), re, schema));
    }
    Ok(Keyword::PatternProperties(patterns))
}

fn parse_dependent_schemas(
    value: &Value,
    ctx: &mut CompileCtx<'_>,
) -> Result<Keyword, SchemaError> {
    Ok(Keyword::DependentSchemas(expect_schema_map(
        "dependentSchemas",
        value,
        ctx,
    )?))
}

/// Drafts 6/7 `dependencies`: array entries are required-property lists,
/// everything else is a schema. Split at parse time so the evaluator sees
/// the two modern semantics.
fn parse_dependencies(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    let entries = value.as_object().ok_or_else(|| {
        SchemaError::compile("dependencies", ctx.location(), "must be an object")
    })?;
    let mut required = BTreeMap::new();
    let mut schemas = BTreeMap::new();
    for (name, entry) in entries {
        if entry.is_array() {
            required.insert(name.clone(), expect_string_array("dependencies", entry, ctx)?);
        } else {
            schemas.insert(name.clone(), ctx.compile_child(entry, &["dependencies", name])?);
        }
    }
    Ok(Keyword::DependenciesLegacy { required, schemas })
}

fn parse_items_legacy(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    let form = match value {
        Value::Array(_) => ItemsForm::Tuple(expect_schema_array("items", value, ctx)?),
        _ => ItemsForm::Single(ctx.compile_child(value, &["items"])?),
    };
    Ok(Keyword::ItemsLegacy(form))
}

// ── Evaluation: in-place applicators ───────────────────────────────────────

pub(crate) fn eval_all_of(
    schemas: &[Arc<Schema>],
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    let mut failed = 0usize;
    for (i, sub) in schemas.iter().enumerate() {
        let index = i.to_string();
        let node = ctx.apply(sub, &["allOf", &index])?;
        if !node.valid {
            failed += 1;
        }
        ctx.attach(node);
        if failed > 0 && !ctx.collecting() {
            break;
        }
    }
    if failed > 0 {
        ctx.fail("allOf", "AllOf", &[("failed", json!(failed))]);
    }
    Ok(())
}

pub(crate) fn eval_any_of(
    schemas: &[Arc<Schema>],
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    let mut matched = false;
    for (i, sub) in schemas.iter().enumerate() {
        let index = i.to_string();
        let node = ctx.apply(sub, &["anyOf", &index])?;
        if node.valid {
            matched = true;
        }
        ctx.attach(node);
        // Stopping at the first success is only sound when no one needs the
        // annotations of the remaining branches.
        if matched && !ctx.collecting() {
            break;
        }
    }
    if !matched {
        ctx.fail("anyOf", "AnyOf", &[]);
    }
    Ok(())
}

pub(crate) fn eval_one_of(
    schemas: &[Arc<Schema>],
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    let mut matched = 0usize;
    for (i, sub) in schemas.iter().enumerate() {
        let index = i.to_string();
        let node = ctx.apply(sub, &["oneOf", &index])?;
        if node.valid {
            matched += 1;
        }
        ctx.attach(node);
    }
    match matched {
        1 => {}
        0 => ctx.fail("oneOf", "OneOfNone", &[]),
        _ => ctx.fail("oneOf", "OneOfTooMany", &[("matched", json!(matched))]),
    }
    Ok(())
}

pub(crate) fn eval_not(schema: &Arc<Schema>, ctx: &mut EvalContext<'_>) -> Result<(), SchemaError> {
    let node = ctx.apply(schema, &["not"])?;
    let inner_valid = node.valid;
    ctx.attach(node);
    if inner_valid {
        ctx.fail("not", "Not", &[]);
    }
    Ok(())
}

pub(crate) fn eval_if(schema: &Arc<Schema>, ctx: &mut EvalContext<'_>) -> Result<(), SchemaError> {
    let node = ctx.apply(schema, &["if"])?;
    let valid = node.valid;
    ctx.attach(node);
    // The outcome is an annotation, never a failure; `then`/`else` read it.
    ctx.annotate("if", json!(valid));
    Ok(())
}

fn if_outcome(ctx: &EvalContext<'_>) -> Option<bool> {
    match ctx.annotation("if") {
        Some(Value::Bool(b)) => Some(*b),
        _ => None,
    }
}

pub(crate) fn eval_then(schema: &Arc<Schema>, ctx: &mut EvalContext<'_>) -> Result<(), SchemaError> {
    if if_outcome(ctx) != Some(true) {
        return Ok(());
    }
    let node = ctx.apply(schema, &["then"])?;
    let valid = node.valid;
    ctx.attach(node);
    if !valid {
        ctx.fail("then", "Then", &[]);
    }
    Ok(())
}

pub(crate) fn eval_else(schema: &Arc<Schema>, ctx: &mut EvalContext<'_>) -> Result<(), SchemaError> {
    if if_outcome(ctx) != Some(false) {
        return Ok(());
    }
    let node = ctx.apply(schema, &["else"])?;
    let valid = node.valid;
    ctx.attach(node);
    if !valid {
        ctx.fail("else", "Else", &[]);
    }
    Ok(())
}

pub(crate) fn eval_dependent_schemas(
    map: &BTreeMap<String, Arc<Schema>>,
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    eval_schema_dependencies("dependentSchemas", map, ctx)
}

fn eval_schema_dependencies(
    keyword: &'static str,
    map: &BTreeMap<String, Arc<Schema>>,
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    let triggered: Vec<String> = match ctx.instance() {
        Value::Object(o) => map.keys().filter(|k| o.contains_key(*k)).cloned().collect(),
        _ => return Ok(()),
    };
    let mut failed = Vec::new();
    for name in &triggered {
        // The whole instance is evaluated, not the triggering property.
        let node = ctx.apply(&map[name], &[keyword, name])?;
        if !node.valid {
            failed.push(name.clone());
        }
        ctx.attach(node);
    }
    if !failed.is_empty() {
        ctx.fail(keyword, "DependentSchemas", &[("properties", json!(failed))]);
    }
    Ok(())
}

pub(crate) fn eval_dependencies(
    required: &BTreeMap<String, Vec<String>>,
    schemas: &BTreeMap<String, Arc<Schema>>,
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    super::assertion::eval_required_dependencies("dependencies", required, ctx)?;
    eval_schema_dependencies("dependencies", schemas, ctx)
}

// ── Evaluation: object applicators ─────────────────────────────────────────

fn object_keys(ctx: &EvalContext<'_>) -> Option<Vec<String>> {
    match ctx.instance() {
        Value::Object(o) => Some(o.keys().cloned().collect()),
        _ => None,
    }
}

pub(crate) fn eval_properties(
    map: &BTreeMap<String, Arc<Schema>>,
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    let names = match object_keys(ctx) {
        Some(names) => names,
        None => return Ok(()),
    };
    let mut evaluated = Vec::new();
    let mut failed = Vec::new();
    for name in &names {
        let sub = match map.get(name) {
            Some(sub) => sub,
            None => continue,
        };
        let node = ctx.apply_at_property(sub, &["properties", name], name)?;
        if !node.valid {
            failed.push(name.clone());
        }
        ctx.attach(node);
        evaluated.push(json!(name));
    }
    ctx.annotate("properties", Value::Array(evaluated));
    if !failed.is_empty() {
        ctx.fail("properties", "Properties", &[("properties", json!(failed))]);
    }
    Ok(())
}

pub(crate) fn eval_pattern_properties(
    patterns: &[(String, regex::Regex, Arc<Schema>)],
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    let names = match object_keys(ctx) {
        Some(names) => names,
        None => return Ok(()),
    };
    let mut evaluated: Vec<String> = Vec::new();
    let mut failed = Vec::new();
    for (raw, re, sub) in patterns {
        for name in &names {
            if !re.is_match(name) {
                continue;
            }
            let node = ctx.apply_at_property(sub, &["patternProperties", raw], name)?;
            if !node.valid {
                failed.push(name.clone());
            }
            ctx.attach(node);
            if !evaluated.contains(name) {
                evaluated.push(name.clone());
            }
        }
    }
    ctx.annotate("patternProperties", json!(evaluated));
    if !failed.is_empty() {
        ctx.fail(
            "patternProperties",
            "PatternProperties",
            &[("properties", json!(failed))],
        );
    }
    Ok(())
}

/// Names already claimed by sibling annotations of the given keywords.
fn annotated_names(ctx: &EvalContext<'_>, keywords: &[&str]) -> HashSet<String> {
    let mut names = HashSet::new();
    for keyword in keywords {
        if let Some(Value::Array(list)) = ctx.annotation(keyword) {
            for entry in list {
                if let Value::String(s) = entry {
                    names.insert(s.clone());
                }
            }
        }
    }
    names
}

pub(crate) fn eval_additional_properties(
    schema: &Arc<Schema>,
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    let names = match object_keys(ctx) {
        Some(names) => names,
        None => return Ok(()),
    };
    let covered = annotated_names(ctx, &["properties", "patternProperties"]);
    let mut evaluated = Vec::new();
    let mut failed = Vec::new();
    for name in names.iter().filter(|n| !covered.contains(*n)) {
        let node = ctx.apply_at_property(schema, &["additionalProperties"], name)?;
        if !node.valid {
            failed.push(name.clone());
        }
        ctx.attach(node);
        evaluated.push(json!(name));
    }
    ctx.annotate("additionalProperties", Value::Array(evaluated));
    if !failed.is_empty() {
        ctx.fail(
            "additionalProperties",
            "AdditionalProperties",
            &[("properties", json!(failed))],
        );
    }
    Ok(())
}

pub(crate) fn eval_property_names(
    schema: &Arc<Schema>,
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    let names = match object_keys(ctx) {
        Some(names) => names,
        None => return Ok(()),
    };
    let mut failed = Vec::new();
    for name in &names {
        let node = ctx.apply_to_value(schema, &["propertyNames"], Value::String(name.clone()))?;
        if !node.valid {
            failed.push(name.clone());
        }
        ctx.attach(node);
    }
    if !failed.is_empty() {
        ctx.fail(
            "propertyNames",
            "PropertyNames",
            &[("properties", json!(failed))],
        );
    }
    Ok(())
}

// ── Evaluation: array applicators ──────────────────────────────────────────

fn instance_len(ctx: &EvalContext<'_>) -> Option<usize> {
    match ctx.instance() {
        Value::Array(a) => Some(a.len()),
        _ => None,
    }
}

/// Applies `schema` positionally or as a tail, recording failures and
/// returning the highest index evaluated.
fn apply_range(
    keyword: &'static str,
    schema: &Arc<Schema>,
    range: std::ops::Range<usize>,
    ctx: &mut EvalContext<'_>,
    failed: &mut Vec<usize>,
) -> Result<Option<usize>, SchemaError> {
    let mut last = None;
    for i in range {
        let node = ctx.apply_at_index(schema, &[keyword], i)?;
        if !node.valid {
            failed.push(i);
        }
        ctx.attach(node);
        last = Some(i);
    }
    Ok(last)
}

pub(crate) fn eval_items_legacy(
    form: &ItemsForm,
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    let len = match instance_len(ctx) {
        Some(len) => len,
        None => return Ok(()),
    };
    let mut failed = Vec::new();
    let last = match form {
        ItemsForm::Single(schema) => apply_range("items", schema, 0..len, ctx, &mut failed)?,
        ItemsForm::Tuple(schemas) => {
            let mut last = None;
            for (i, schema) in schemas.iter().take(len).enumerate() {
                let index = i.to_string();
                let node = ctx.apply_at_index(schema, &["items", &index], i)?;
                if !node.valid {
                    failed.push(i);
                }
                ctx.attach(node);
                last = Some(i);
            }
            last
        }
    };
    if let Some(last) = last {
        ctx.annotate("items", json!(last));
    }
    if !failed.is_empty() {
        ctx.fail("items", "Items", &[("indices", json!(failed))]);
    }
    Ok(())
}

pub(crate) fn eval_additional_items(
    schema: &Arc<Schema>,
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    let len = match instance_len(ctx) {
        Some(len) => len,
        None => return Ok(()),
    };
    // Without a positional `items` annotation there is no tail to validate.
    let start = match ctx.annotation("items") {
        Some(Value::Number(n)) => match n.as_u64() {
            Some(i) => i as usize + 1,
            None => return Ok(()),
        },
        _ => return Ok(()),
    };
    let mut failed = Vec::new();
    let last = apply_range("additionalItems", schema, start..len, ctx, &mut failed)?;
    if let Some(last) = last {
        ctx.annotate("additionalItems", json!(last));
    }
    if !failed.is_empty() {
        ctx.fail("additionalItems", "Items", &[("indices", json!(failed))]);
    }
    Ok(())
}

pub(crate) fn eval_prefix_items(
    schemas: &[Arc<Schema>],
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    let len = match instance_len(ctx) {
        Some(len) => len,
        None => return Ok(()),
    };
    let mut failed = Vec::new();
    let mut last = None;
    for (i, schema) in schemas.iter().take(len).enumerate() {
        let index = i.to_string();
        let node = ctx.apply_at_index(schema, &["prefixItems", &index], i)?;
        if !node.valid {
            failed.push(i);
        }
        ctx.attach(node);
        last = Some(i);
    }
    if let Some(last) = last {
        ctx.annotate("prefixItems", json!(last));
    }
    if !failed.is_empty() {
        ctx.fail("prefixItems", "Items", &[("indices", json!(failed))]);
    }
    Ok(())
}

pub(crate) fn eval_items_tail(
    schema: &Arc<Schema>,
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    let len = match instance_len(ctx) {
        Some(len) => len,
        None => return Ok(()),
    };
    let start = match ctx.annotation("prefixItems") {
        Some(Value::Number(n)) => n.as_u64().map(|i| i as usize + 1).unwrap_or(0),
        _ => 0,
    };
    let mut failed = Vec::new();
    let last = apply_range("items", schema, start..len, ctx, &mut failed)?;
    if let Some(last) = last {
        ctx.annotate("items", json!(last));
    }
    if !failed.is_empty() {
        ctx.fail("items", "Items", &[("indices", json!(failed))]);
    }
    Ok(())
}

pub(crate) fn eval_contains(
    schema: &Arc<Schema>,
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    enum Matches {
        Indices(Vec<usize>),
        Names(Vec<String>),
    }

    let matches = if let Some(len) = instance_len(ctx) {
        let mut matching = Vec::new();
        for i in 0..len {
            let node = ctx.apply_at_index(schema, &["contains"], i)?;
            if node.valid {
                matching.push(i);
            }
            ctx.attach(node);
        }
        Matches::Indices(matching)
    } else if ctx.schema().draft == Draft::Next {
        // DraftNext extends `contains` to object members.
        let names = match object_keys(ctx) {
            Some(names) => names,
            None => return Ok(()),
        };
        let mut matching = Vec::new();
        for name in &names {
            let node = ctx.apply_at_property(schema, &["contains"], name)?;
            if node.valid {
                matching.push(name.clone());
            }
            ctx.attach(node);
        }
        Matches::Names(matching)
    } else {
        return Ok(());
    };

    let (count, annotation) = match &matches {
        Matches::Indices(list) => (list.len(), json!(list)),
        Matches::Names(list) => (list.len(), json!(list)),
    };
    ctx.annotate("contains", annotation);

    let minimum = match ctx.annotation("minContains") {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(1),
        _ => 1,
    };
    let maximum = match ctx.annotation("maxContains") {
        Some(Value::Number(n)) => n.as_u64(),
        _ => None,
    };
    // `minContains: 0` turns an otherwise failing `contains` into a pass.
    if (count as u64) < minimum {
        ctx.fail(
            "contains",
            "ContainsTooFew",
            &[("received", json!(count)), ("minimum", json!(minimum))],
        );
    } else if let Some(maximum) = maximum {
        if count as u64 > maximum {
            ctx.fail(
                "contains",
                "ContainsTooMany",
                &[("received", json!(count)), ("maximum", json!(maximum))],
            );
        }
    }
    Ok(())
}

// ── Catalog ────────────────────────────────────────────────────────────────

fn def(
    name: &'static str,
    drafts: DraftSet,
    priority: u8,
    parse: crate::keyword::ParseFn,
) -> Arc<KeywordDef> {
    Arc::new(KeywordDef {
        name,
        drafts,
        vocabulary: Vocabulary::Applicator,
        priority,
        is_applicator: true,
        parse,
    })
}

pub fn defs() -> Vec<Arc<KeywordDef>> {
    vec![
        def("allOf", DraftSet::ALL, priority::APPLICATOR, parse_all_of),
        def("anyOf", DraftSet::ALL, priority::APPLICATOR, parse_any_of),
        def("oneOf", DraftSet::ALL, priority::APPLICATOR, parse_one_of),
        def("not", DraftSet::ALL, priority::APPLICATOR, parse_not),
        def("if", DraftSet::SINCE_7, priority::IF, parse_if),
        def("then", DraftSet::SINCE_7, priority::THEN, parse_then),
        def("else", DraftSet::SINCE_7, priority::ELSE, parse_else),
        def(
            "dependentSchemas",
            DraftSet::SINCE_2019,
            priority::APPLICATOR,
            parse_dependent_schemas,
        ),
        def("dependencies", DraftSet::UNTIL_7, priority::APPLICATOR, parse_dependencies),
        def("properties", DraftSet::ALL, priority::FIRST_APPLICATOR, parse_properties),
        def(
            "patternProperties",
            DraftSet::ALL,
            priority::SECOND_APPLICATOR,
            parse_pattern_properties,
        ),
        def(
            "additionalProperties",
            DraftSet::ALL,
            priority::THIRD_APPLICATOR,
            parse_additional_properties,
        ),
        def("propertyNames", DraftSet::ALL, priority::APPLICATOR, parse_property_names),
        def(
            "prefixItems",
            DraftSet::SINCE_2020,
            priority::FIRST_APPLICATOR,
            parse_prefix_items,
        ),
        def("items", DraftSet::UNTIL_2019, priority::FIRST_APPLICATOR, parse_items_legacy),
        def("items", DraftSet::SINCE_2020, priority::SECOND_APPLICATOR, parse_items_tail),
        def(
            "additionalItems",
            DraftSet::UNTIL_2019,
            priority::THIRD_APPLICATOR,
            parse_additional_items,
        ),
        def("contains", DraftSet::ALL, priority::CONTAINS, parse_contains),
    ]
}
