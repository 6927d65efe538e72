//! Validation-vocabulary assertions.
//!
//! Every assertion is kind-gated: applied to an instance of the wrong kind
//! it records nothing and the remaining keywords continue.

use super::{
    compile_regex, expect_non_negative, expect_number, expect_string_array,
};
use crate::context::EvalContext;
use crate::draft::DraftSet;
use crate::error::SchemaError;
use crate::keyword::{priority, Keyword, KeywordDef};
use crate::schema::CompileCtx;
use crate::vocabulary::Vocabulary;
use jsonworks_value::{compare_numbers, equivalent, hash_equivalence, is_multiple_of, kind, ValueKind};
use regex::Regex;
use serde_json::{json, Number, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

// ── Parsing ────────────────────────────────────────────────────────────────

fn kind_from_name(name: &str) -> Option<ValueKind> {
    match name {
        "null" => Some(ValueKind::Null),
        "boolean" => Some(ValueKind::Boolean),
        "object" => Some(ValueKind::Object),
        "array" => Some(ValueKind::Array),
        "number" => Some(ValueKind::Number),
        "integer" => Some(ValueKind::Integer),
        "string" => Some(ValueKind::String),
        _ => None,
    }
}

fn parse_type(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    let err = |name: &str| {
        SchemaError::compile(
            "type",
            ctx.location(),
            format!("{:?} is not a type name", name),
        )
    };
    let names: Vec<&str> = match value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items
            .iter()
            .map(|v| {
                v.as_str().ok_or_else(|| {
                    SchemaError::compile("type", ctx.location(), "must be a string or string array")
                })
            })
            .collect::<Result<_, _>>()?,
        _ => {
            return Err(SchemaError::compile(
                "type",
                ctx.location(),
                "must be a string or string array",
            ))
        }
    };
    let mut kinds = Vec::with_capacity(names.len());
    for name in names {
        kinds.push(kind_from_name(name).ok_or_else(|| err(name))?);
    }
    Ok(Keyword::Type(kinds))
}

fn parse_const(value: &Value, _ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    Ok(Keyword::Const(value.clone()))
}

fn parse_enum(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    let items = value
        .as_array()
        .ok_or_else(|| SchemaError::compile("enum", ctx.location(), "must be an array"))?;
    Ok(Keyword::Enum(items.clone()))
}

fn parse_multiple_of(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    let divisor = expect_number("multipleOf", value, ctx)?;
    if divisor.as_f64().map(|f| f <= 0.0).unwrap_or(true) {
        return Err(SchemaError::compile(
            "multipleOf",
            ctx.location(),
            "must be greater than zero",
        ));
    }
    Ok(Keyword::MultipleOf(divisor))
}

macro_rules! number_parser {
    ($fn_name:ident, $name:literal, $variant:ident) => {
        fn $fn_name(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
            Ok(Keyword::$variant(expect_number($name, value, ctx)?))
        }
    };
}

number_parser!(parse_minimum, "minimum", Minimum);
number_parser!(parse_maximum, "maximum", Maximum);
number_parser!(parse_exclusive_minimum, "exclusiveMinimum", ExclusiveMinimum);
number_parser!(parse_exclusive_maximum, "exclusiveMaximum", ExclusiveMaximum);

macro_rules! count_parser {
    ($fn_name:ident, $name:literal, $variant:ident) => {
        fn $fn_name(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
            Ok(Keyword::$variant(expect_non_negative($name, value, ctx)?))
        }
    };
}

count_parser!(parse_min_length, "minLength", MinLength);
count_parser!(parse_max_length, "maxLength", MaxLength);
count_parser!(parse_min_items, "minItems", MinItems);
count_parser!(parse_max_items, "maxItems", MaxItems);
count_parser!(parse_min_contains, "minContains", MinContains);
count_parser!(parse_max_contains, "maxContains", MaxContains);
count_parser!(parse_min_properties, "minProperties", MinProperties);
count_parser!(parse_max_properties, "maxProperties", MaxProperties);

fn parse_pattern(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    let pattern = value
        .as_str()
        .ok_or_else(|| SchemaError::compile("pattern", ctx.location(), "must be a string"))?;
    Ok(Keyword::Pattern(compile_regex("pattern", pattern, ctx)?))
}

fn parse_unique_items(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    Ok(Keyword::UniqueItems(super::expect_bool(
        "uniqueItems",
        value,
        ctx,
    )?))
}

fn parse_required(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    Ok(Keyword::Required(expect_string_array("required", value, ctx)?))
}

fn parse_dependent_required(
    value: &Value,
    ctx: &mut CompileCtx<'_>,
) -> Result<Keyword, SchemaError> {
    let entries = value.as_object().ok_or_else(|| {
        SchemaError::compile("dependentRequired", ctx.location(), "must be an object")
    })?;
    let mut deps = BTreeMap::new();
    for (name, list) in entries {
        deps.insert(
            name.clone(),
            expect_string_array("dependentRequired", list, ctx)?,
        );
    }
    Ok(Keyword::DependentRequired(deps))
}

// ── Evaluation ─────────────────────────────────────────────────────────────

pub(crate) fn eval_type(declared: &[ValueKind], ctx: &mut EvalContext<'_>) -> Result<(), SchemaError> {
    let actual = kind(ctx.instance());
    let ok = declared.iter().any(|t| match t {
        // `integer` is a subset of `number`; the derived kind already
        // classifies integer-valued floats as Integer.
        ValueKind::Number => matches!(actual, ValueKind::Number | ValueKind::Integer),
        other => actual == *other,
    });
    if !ok {
        let expected: Vec<&str> = declared.iter().map(|k| k.name()).collect();
        ctx.fail(
            "type",
            "Type",
            &[("received", json!(actual.name())), ("expected", json!(expected))],
        );
    }
    Ok(())
}

pub(crate) fn eval_const(expected: &Value, ctx: &mut EvalContext<'_>) -> Result<(), SchemaError> {
    let ok = equivalent(ctx.instance(), expected);
    if !ok {
        ctx.fail("const", "Const", &[("expected", expected.clone())]);
    }
    Ok(())
}

pub(crate) fn eval_enum(values: &[Value], ctx: &mut EvalContext<'_>) -> Result<(), SchemaError> {
    let ok = values.iter().any(|v| equivalent(ctx.instance(), v));
    if !ok {
        ctx.fail("enum", "Enum", &[("values", Value::Array(values.to_vec()))]);
    }
    Ok(())
}

fn number_instance(ctx: &EvalContext<'_>) -> Option<Number> {
    match ctx.instance() {
        Value::Number(n) => Some(n.clone()),
        _ => None,
    }
}

pub(crate) fn eval_multiple_of(
    divisor: &Number,
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    let n = match number_instance(ctx) {
        Some(n) => n,
        None => return Ok(()),
    };
    if !is_multiple_of(&n, divisor) {
        ctx.fail(
            "multipleOf",
            "MultipleOf",
            &[
                ("received", Value::Number(n)),
                ("divisor", Value::Number(divisor.clone())),
            ],
        );
    }
    Ok(())
}

fn eval_bound(
    keyword: &'static str,
    message_key: &'static str,
    limit: &Number,
    fails_on: &[Ordering],
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    let n = match number_instance(ctx) {
        Some(n) => n,
        None => return Ok(()),
    };
    if fails_on.contains(&compare_numbers(&n, limit)) {
        ctx.fail(
            keyword,
            message_key,
            &[
                ("received", Value::Number(n)),
                ("limit", Value::Number(limit.clone())),
            ],
        );
    }
    Ok(())
}

pub(crate) fn eval_minimum(limit: &Number, ctx: &mut EvalContext<'_>) -> Result<(), SchemaError> {
    eval_bound("minimum", "Minimum", limit, &[Ordering::Less], ctx)
}

pub(crate) fn eval_maximum(limit: &Number, ctx: &mut EvalContext<'_>) -> Result<(), SchemaError> {
    eval_bound("maximum", "Maximum", limit, &[Ordering::Greater], ctx)
}

pub(crate) fn eval_exclusive_minimum(
    limit: &Number,
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    eval_bound(
        "exclusiveMinimum",
        "ExclusiveMinimum",
        limit,
        &[Ordering::Less, Ordering::Equal],
        ctx,
    )
}

pub(crate) fn eval_exclusive_maximum(
    limit: &Number,
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    eval_bound(
        "exclusiveMaximum",
        "ExclusiveMaximum",
        limit,
        &[Ordering::Greater, Ordering::Equal],
        ctx,
    )
}

fn string_length(ctx: &EvalContext<'_>) -> Option<u64> {
    match ctx.instance() {
        // Length counts Unicode code points, not bytes or UTF-16 units.
        Value::String(s) => Some(s.chars().count() as u64),
        _ => None,
    }
}

pub(crate) fn eval_min_length(limit: u64, ctx: &mut EvalContext<'_>) -> Result<(), SchemaError> {
    if let Some(len) = string_length(ctx) {
        if len < limit {
            ctx.fail("minLength", "MinLength", &[("limit", json!(limit))]);
        }
    }
    Ok(())
}

pub(crate) fn eval_max_length(limit: u64, ctx: &mut EvalContext<'_>) -> Result<(), SchemaError> {
    if let Some(len) = string_length(ctx) {
        if len > limit {
            ctx.fail("maxLength", "MaxLength", &[("limit", json!(limit))]);
        }
    }
    Ok(())
}

pub(crate) fn eval_pattern(re: &Regex, ctx: &mut EvalContext<'_>) -> Result<(), SchemaError> {
    let matched = match ctx.instance() {
        // Unanchored search, per ECMA regex semantics.
        Value::String(s) => re.is_match(s),
        _ => return Ok(()),
    };
    if !matched {
        ctx.fail("pattern", "Pattern", &[("pattern", json!(re.as_str()))]);
    }
    Ok(())
}

fn array_len(ctx: &EvalContext<'_>) -> Option<u64> {
    match ctx.instance() {
        Value::Array(a) => Some(a.len() as u64),
        _ => None,
    }
}

pub(crate) fn eval_min_items(limit: u64, ctx: &mut EvalContext<'_>) -> Result<(), SchemaError> {
    if let Some(len) = array_len(ctx) {
        if len < limit {
            ctx.fail("minItems", "MinItems", &[("limit", json!(limit))]);
        }
    }
    Ok(())
}

pub(crate) fn eval_max_items(limit: u64, ctx: &mut EvalContext<'_>) -> Result<(), SchemaError> {
    if let Some(len) = array_len(ctx) {
        if len > limit {
            ctx.fail("maxItems", "MaxItems", &[("limit", json!(limit))]);
        }
    }
    Ok(())
}

/// Hash-bucketed duplicate search; `equivalent` confirms candidates, so hash
/// collisions cost a comparison, never a wrong answer.
fn find_duplicate(items: &[Value]) -> Option<(usize, usize)> {
    let mut buckets: HashMap<u64, Vec<usize>> = HashMap::new();
    for (i, item) in items.iter().enumerate() {
        let h = hash_equivalence(item);
        if let Some(candidates) = buckets.get(&h) {
            for &j in candidates {
                if equivalent(&items[j], item) {
                    return Some((j, i));
                }
            }
        }
        buckets.entry(h).or_default().push(i);
    }
    None
}

pub(crate) fn eval_unique_items(unique: bool, ctx: &mut EvalContext<'_>) -> Result<(), SchemaError> {
    if !unique {
        return Ok(());
    }
    let duplicate = match ctx.instance() {
        Value::Array(items) => find_duplicate(items),
        _ => None,
    };
    if let Some((first, second)) = duplicate {
        ctx.fail(
            "uniqueItems",
            "UniqueItems",
            &[("first", json!(first)), ("second", json!(second))],
        );
    }
    Ok(())
}

pub(crate) fn eval_min_contains(bound: u64, ctx: &mut EvalContext<'_>) -> Result<(), SchemaError> {
    // Consumed by `contains`, which runs later by priority.
    ctx.annotate("minContains", json!(bound));
    Ok(())
}

pub(crate) fn eval_max_contains(bound: u64, ctx: &mut EvalContext<'_>) -> Result<(), SchemaError> {
    ctx.annotate("maxContains", json!(bound));
    Ok(())
}

fn property_count(ctx: &EvalContext<'_>) -> Option<u64> {
    match ctx.instance() {
        Value::Object(o) => Some(o.len() as u64),
        _ => None,
    }
}

pub(crate) fn eval_min_properties(
    limit: u64,
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    if let Some(count) = property_count(ctx) {
        if count < limit {
            ctx.fail("minProperties", "MinProperties", &[("limit", json!(limit))]);
        }
    }
    Ok(())
}

pub(crate) fn eval_max_properties(
    limit: u64,
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    if let Some(count) = property_count(ctx) {
        if count > limit {
            ctx.fail("maxProperties", "MaxProperties", &[("limit", json!(limit))]);
        }
    }
    Ok(())
}

pub(crate) fn eval_required(names: &[String], ctx: &mut EvalContext<'_>) -> Result<(), SchemaError> {
    let missing: Vec<String> = match ctx.instance() {
        Value::Object(o) => names
            .iter()
            .filter(|n| !o.contains_key(*n))
            .cloned()
            .collect(),
        _ => return Ok(()),
    };
    if !missing.is_empty() {
        ctx.fail("required", "Required", &[("missing", json!(missing))]);
    }
    Ok(())
}

pub(crate) fn eval_dependent_required(
    deps: &BTreeMap<String, Vec<String>>,
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    eval_required_dependencies("dependentRequired", deps, ctx)
}

/// Shared by `dependentRequired` and the required half of legacy
/// `dependencies`.
pub(crate) fn eval_required_dependencies(
    keyword: &'static str,
    deps: &BTreeMap<String, Vec<String>>,
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    let failure: Option<(String, Vec<String>)> = match ctx.instance() {
        Value::Object(o) => deps
            .iter()
            .filter(|(trigger, _)| o.contains_key(*trigger))
            .find_map(|(trigger, required)| {
                let missing: Vec<String> = required
                    .iter()
                    .filter(|n| !o.contains_key(*n))
                    .cloned()
                    .collect();
                (!missing.is_empty()).then(|| (trigger.clone(), missing))
            }),
        _ => None,
    };
    if let Some((trigger, missing)) = failure {
        ctx.fail(
            keyword,
            "DependentRequired",
            &[("property", json!(trigger)), ("missing", json!(missing))],
        );
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
        vocabulary: Vocabulary::Validation,
        priority,
        is_applicator: false,
        parse,
    })
}

pub fn defs() -> Vec<Arc<KeywordDef>> {
    vec![
        def("type", DraftSet::ALL, priority::ASSERTION, parse_type),
        def("const", DraftSet::ALL, priority::ASSERTION, parse_const),
        def("enum", DraftSet::ALL, priority::ASSERTION, parse_enum),
        def("multipleOf", DraftSet::ALL, priority::ASSERTION, parse_multiple_of),
        def("minimum", DraftSet::ALL, priority::ASSERTION, parse_minimum),
        def("maximum", DraftSet::ALL, priority::ASSERTION, parse_maximum),
        def("exclusiveMinimum", DraftSet::ALL, priority::ASSERTION, parse_exclusive_minimum),
        def("exclusiveMaximum", DraftSet::ALL, priority::ASSERTION, parse_exclusive_maximum),
        def("minLength", DraftSet::ALL, priority::ASSERTION, parse_min_length),
        def("maxLength", DraftSet::ALL, priority::ASSERTION, parse_max_length),
        def("pattern", DraftSet::ALL, priority::ASSERTION, parse_pattern),
        def("minItems", DraftSet::ALL, priority::ASSERTION, parse_min_items),
        def("maxItems", DraftSet::ALL, priority::ASSERTION, parse_max_items),
        def("uniqueItems", DraftSet::ALL, priority::ASSERTION, parse_unique_items),
        def("minContains", DraftSet::SINCE_2019, priority::CONTAINS_BOUNDS, parse_min_contains),
        def("maxContains", DraftSet::SINCE_2019, priority::CONTAINS_BOUNDS, parse_max_contains),
        def("minProperties", DraftSet::ALL, priority::ASSERTION, parse_min_properties),
        def("maxProperties", DraftSet::ALL, priority::ASSERTION, parse_max_properties),
        def("required", DraftSet::ALL, priority::ASSERTION, parse_required),
        def(
            "dependentRequired",
            DraftSet::SINCE_2019,
            priority::ASSERTION,
            parse_dependent_required,
        ),
    ]
}
