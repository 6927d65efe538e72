//! The keyword catalog and evaluation dispatch.
//!
//! Each family module contributes its descriptors through `defs()`; the
//! catalog maps keyword names to descriptors, with draft gating picking the
//! right variant where a name changed meaning across drafts (`items`).

pub mod applicator;
pub mod assertion;
pub mod core;
pub mod format;
pub mod metadata;
pub mod unevaluated;

use crate::context::EvalContext;
use crate::draft::Draft;
use crate::error::SchemaError;
use crate::keyword::{Keyword, KeywordDef, KeywordInstance};
use crate::schema::{CompileCtx, Schema};
use regex::Regex;
use serde_json::{Number, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};

/// All keyword descriptors known to the engine.
pub fn all_keywords() -> Vec<Arc<KeywordDef>> {
    let mut defs = Vec::new();
    defs.extend(core::defs());
    defs.extend(assertion::defs());
    defs.extend(applicator::defs());
    defs.extend(unevaluated::defs());
    defs.extend(format::defs());
    defs.extend(metadata::defs());
    defs
}

fn catalog() -> &'static HashMap<&'static str, Vec<Arc<KeywordDef>>> {
    static CATALOG: OnceLock<HashMap<&'static str, Vec<Arc<KeywordDef>>>> = OnceLock::new();
    CATALOG.get_or_init(|| {
        let mut map: HashMap<&'static str, Vec<Arc<KeywordDef>>> = HashMap::new();
        for def in all_keywords() {
            map.entry(def.name).or_default().push(def);
        }
        map
    })
}

/// Finds the descriptor for a keyword under a draft, if that draft knows it.
pub fn lookup(name: &str, draft: Draft) -> Option<Arc<KeywordDef>> {
    catalog()
        .get(name)?
        .iter()
        .find(|def| def.drafts.contains(draft))
        .cloned()
}

/// Evaluates one compiled keyword against the current frame.
pub(crate) fn evaluate_keyword(
    inst: &KeywordInstance,
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    match &inst.keyword {
        // Identifiers and anchors do their work at compile/scan time.
        Keyword::MetaSchema(_)
        | Keyword::Id(_)
        | Keyword::Anchor(_)
        | Keyword::DynamicAnchor(_)
        | Keyword::RecursiveAnchor(_)
        | Keyword::Defs(_)
        | Keyword::Comment(_)
        | Keyword::Vocabulary(_) => Ok(()),

        Keyword::Ref(r) => core::eval_ref(r, ctx),
        Keyword::DynamicRef(r) => core::eval_dynamic_ref(r, ctx),
        Keyword::RecursiveRef => core::eval_recursive_ref(ctx),

        Keyword::Type(kinds) => assertion::eval_type(kinds, ctx),
        Keyword::Const(expected) => assertion::eval_const(expected, ctx),
        Keyword::Enum(values) => assertion::eval_enum(values, ctx),
        Keyword::MultipleOf(divisor) => assertion::eval_multiple_of(divisor, ctx),
        Keyword::Minimum(limit) => assertion::eval_minimum(limit, ctx),
        Keyword::Maximum(limit) => assertion::eval_maximum(limit, ctx),
        Keyword::ExclusiveMinimum(limit) => assertion::eval_exclusive_minimum(limit, ctx),
        Keyword::ExclusiveMaximum(limit) => assertion::eval_exclusive_maximum(limit, ctx),
        Keyword::MinLength(limit) => assertion::eval_min_length(*limit, ctx),
        Keyword::MaxLength(limit) => assertion::eval_max_length(*limit, ctx),
        Keyword::Pattern(re) => assertion::eval_pattern(re, ctx),
        Keyword::MinItems(limit) => assertion::eval_min_items(*limit, ctx),
        Keyword::MaxItems(limit) => assertion::eval_max_items(*limit, ctx),
        Keyword::UniqueItems(unique) => assertion::eval_unique_items(*unique, ctx),
        Keyword::MinContains(bound) => assertion::eval_min_contains(*bound, ctx),
        Keyword::MaxContains(bound) => assertion::eval_max_contains(*bound, ctx),
        Keyword::MinProperties(limit) => assertion::eval_min_properties(*limit, ctx),
        Keyword::MaxProperties(limit) => assertion::eval_max_properties(*limit, ctx),
        Keyword::Required(names) => assertion::eval_required(names, ctx),
        Keyword::DependentRequired(deps) => assertion::eval_dependent_required(deps, ctx),
        Keyword::Format(name) => format::eval_format(name, ctx),

        Keyword::AllOf(schemas) => applicator::eval_all_of(schemas, ctx),
        Keyword::AnyOf(schemas) => applicator::eval_any_of(schemas, ctx),
        Keyword::OneOf(schemas) => applicator::eval_one_of(schemas, ctx),
        Keyword::Not(schema) => applicator::eval_not(schema, ctx),
        Keyword::If(schema) => applicator::eval_if(schema, ctx),
        Keyword::Then(schema) => applicator::eval_then(schema, ctx),
        Keyword::Else(schema) => applicator::eval_else(schema, ctx),
        Keyword::DependentSchemas(map) => applicator::eval_dependent_schemas(map, ctx),
        Keyword::DependenciesLegacy { required, schemas } => {
            applicator::eval_dependencies(required, schemas, ctx)
        }
        Keyword::Properties(map) => applicator::eval_properties(map, ctx),
        Keyword::PatternProperties(patterns) => applicator::eval_pattern_properties(patterns, ctx),
        Keyword::AdditionalProperties(schema) => {
            applicator::eval_additional_properties(schema, ctx)
        }
        Keyword::PropertyNames(schema) => applicator::eval_property_names(schema, ctx),
        Keyword::PrefixItems(schemas) => applicator::eval_prefix_items(schemas, ctx),
        Keyword::Items(schema) => applicator::eval_items_tail(schema, ctx),
        Keyword::ItemsLegacy(form) => applicator::eval_items_legacy(form, ctx),
        Keyword::AdditionalItems(schema) => applicator::eval_additional_items(schema, ctx),
        Keyword::Contains(schema) => applicator::eval_contains(schema, ctx),

        Keyword::UnevaluatedItems(schema) => unevaluated::eval_unevaluated_items(schema, ctx),
        Keyword::UnevaluatedProperties(schema) => {
            unevaluated::eval_unevaluated_properties(schema, ctx)
        }

        Keyword::Title(s) => metadata::eval_string_annotation("title", s, ctx),
        Keyword::Description(s) => metadata::eval_string_annotation("description", s, ctx),
        Keyword::Default(v) => metadata::eval_value_annotation("default", v, ctx),
        Keyword::Deprecated(b) => metadata::eval_bool_annotation("deprecated", *b, ctx),
        Keyword::ReadOnly(b) => metadata::eval_bool_annotation("readOnly", *b, ctx),
        Keyword::WriteOnly(b) => metadata::eval_bool_annotation("writeOnly", *b, ctx),
        Keyword::Examples(values) => metadata::eval_examples(values, ctx),
        Keyword::ContentEncoding(s) => metadata::eval_string_annotation("contentEncoding", s, ctx),
        Keyword::ContentMediaType(s) => {
            metadata::eval_string_annotation("contentMediaType", s, ctx)
        }
        Keyword::ContentSchema(v) => metadata::eval_value_annotation("contentSchema", v, ctx),

        // Unknown keywords are handled by the frame loop.
        Keyword::Unknown(_) => Ok(()),
    }
}

// ── Parse helpers ──────────────────────────────────────────────────────────

pub(crate) fn expect_string(
    keyword: &str,
    value: &Value,
    ctx: &CompileCtx<'_>,
) -> Result<String, SchemaError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| SchemaError::compile(keyword, ctx.location(), "must be a string"))
}

pub(crate) fn expect_bool(
    keyword: &str,
    value: &Value,
    ctx: &CompileCtx<'_>,
) -> Result<bool, SchemaError> {
    value
        .as_bool()
        .ok_or_else(|| SchemaError::compile(keyword, ctx.location(), "must be a boolean"))
}

pub(crate) fn expect_number(
    keyword: &str,
    value: &Value,
    ctx: &CompileCtx<'_>,
) -> Result<Number, SchemaError> {
    match value {
        Value::Number(n) => Ok(n.clone()),
        _ => Err(SchemaError::compile(keyword, ctx.location(), "must be a number")),
    }
}

pub(crate) fn expect_non_negative(
    keyword: &str,
    value: &Value,
    ctx: &CompileCtx<'_>,
) -> Result<u64, SchemaError> {
    let err = || {
        SchemaError::compile(
            keyword,
            ctx.location(),
            "must be a non-negative integer",
        )
    };
    let n = match value {
        Value::Number(n) => n,
        _ => return Err(err()),
    };
    if let Some(u) = n.as_u64() {
        return Ok(u);
    }
    match n.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 => Ok(f as u64),
        _ => Err(err()),
    }
}

pub(crate) fn expect_string_array(
    keyword: &str,
    value: &Value,
    ctx: &CompileCtx<'_>,
) -> Result<Vec<String>, SchemaError> {
    let err = || SchemaError::compile(keyword, ctx.location(), "must be an array of strings");
    let items = value.as_array().ok_or_else(err)?;
    items
        .iter()
        .map(|v| v.as_str().map(str::to_string).ok_or_else(err))
        .collect()
}

/// Compiles a non-empty array of subschemas at `keyword/<index>`.
pub(crate) fn expect_schema_array(
    keyword: &str,
    value: &Value,
    ctx: &mut CompileCtx<'_>,
) -> Result<Vec<Arc<Schema>>, SchemaError> {
    let items = value.as_array().ok_or_else(|| {
        SchemaError::compile(keyword, ctx.location(), "must be an array of schemas")
    })?;
    if items.is_empty() {
        return Err(SchemaError::compile(
            keyword,
            ctx.location(),
            "must not be empty",
        ));
    }
    let mut schemas = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let index = i.to_string();
        schemas.push(ctx.compile_child(item, &[keyword, &index])?);
    }
    Ok(schemas)
}

/// Compiles an object of subschemas at `keyword/<name>`.
pub(crate) fn expect_schema_map(
    keyword: &str,
    value: &Value,
    ctx: &mut CompileCtx<'_>,
) -> Result<BTreeMap<String, Arc<Schema>>, SchemaError> {
    let entries = value.as_object().ok_or_else(|| {
        SchemaError::compile(keyword, ctx.location(), "must be an object of schemas")
    })?;
    let mut schemas = BTreeMap::new();
    for (name, sub) in entries {
        schemas.insert(name.clone(), ctx.compile_child(sub, &[keyword, name])?);
    }
    Ok(schemas)
}

/// Compiles a pattern with the `regex` crate. Deviation from ECMA-262:
/// backreferences and lookaround are unsupported and fail compilation.
pub(crate) fn compile_regex(
    keyword: &str,
    pattern: &str,
    ctx: &CompileCtx<'_>,
) -> Result<Regex, SchemaError> {
    Regex::new(pattern).map_err(|e| {
        SchemaError::compile(
            keyword,
            ctx.location(),
            format!("unsupported pattern {:?}: {}", pattern, e),
        )
    })
}
