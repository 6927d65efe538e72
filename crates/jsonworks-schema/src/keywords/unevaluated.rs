//! `unevaluatedProperties` / `unevaluatedItems`.
//!
//! These run last among their siblings (the highest priorities in the
//! catalog) and consume annotations from the current schema *and* every
//! valid descendant schema evaluated against the same instance location.
//! That is how coverage established inside `allOf`, `$ref` and `if`
//! branches becomes visible here.

use crate::context::EvalContext;
use crate::draft::DraftSet;
use crate::error::SchemaError;
use crate::keyword::{priority, Keyword, KeywordDef, ParseFn};
use crate::schema::{CompileCtx, Schema};
use crate::vocabulary::Vocabulary;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

fn parse_unevaluated_properties(
    value: &Value,
    ctx: &mut CompileCtx<'_>,
) -> Result<Keyword, SchemaError> {
    Ok(Keyword::UnevaluatedProperties(
        ctx.compile_child(value, &["unevaluatedProperties"])?,
    ))
}

fn parse_unevaluated_items(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    Ok(Keyword::UnevaluatedItems(
        ctx.compile_child(value, &["unevaluatedItems"])?,
    ))
}

const PROPERTY_SOURCES: &[&str] = &[
    "properties",
    "patternProperties",
    "additionalProperties",
    "unevaluatedProperties",
];

const ITEM_SOURCES: &[&str] = &[
    "prefixItems",
    "items",
    "additionalItems",
    "contains",
    "unevaluatedItems",
];

pub(crate) fn eval_unevaluated_properties(
    schema: &Arc<Schema>,
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    let names: Vec<String> = match ctx.instance() {
        Value::Object(o) => o.keys().cloned().collect(),
        _ => return Ok(()),
    };
    let mut covered: HashSet<String> = HashSet::new();
    for annotation in ctx.collect_local_annotations(PROPERTY_SOURCES) {
        if let Value::Array(list) = annotation {
            for entry in list {
                if let Value::String(name) = entry {
                    covered.insert(name);
                }
            }
        }
    }

    let mut evaluated = Vec::new();
    let mut failed = Vec::new();
    for name in names.iter().filter(|n| !covered.contains(*n)) {
        let node = ctx.apply_at_property(schema, &["unevaluatedProperties"], name)?;
        if !node.valid {
            failed.push(name.clone());
        }
        ctx.attach(node);
        evaluated.push(json!(name));
    }
    ctx.annotate("unevaluatedProperties", Value::Array(evaluated));
    if !failed.is_empty() {
        ctx.fail(
            "unevaluatedProperties",
            "UnevaluatedProperties",
            &[("properties", json!(failed))],
        );
    }
    Ok(())
}

pub(crate) fn eval_unevaluated_items(
    schema: &Arc<Schema>,
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    let len = match ctx.instance() {
        Value::Array(a) => a.len(),
        _ => return Ok(()),
    };
    // Positional annotations cover a prefix; `contains` and earlier
    // unevaluatedItems cover individual indices.
    let mut covered_up_to: Option<u64> = None;
    let mut covered: HashSet<usize> = HashSet::new();
    for annotation in ctx.collect_local_annotations(ITEM_SOURCES) {
        match annotation {
            Value::Number(n) => {
                if let Some(i) = n.as_u64() {
                    covered_up_to = Some(covered_up_to.map_or(i, |prev| prev.max(i)));
                }
            }
            Value::Array(list) => {
                for entry in list {
                    if let Some(i) = entry.as_u64() {
                        covered.insert(i as usize);
                    }
                }
            }
            _ => {}
        }
    }

    let start = covered_up_to.map_or(0, |i| i as usize + 1);
    let mut evaluated = Vec::new();
    let mut failed = Vec::new();
    for i in (0..len).filter(|i| *i >= start && !covered.contains(i)) {
        let node = ctx.apply_at_index(schema, &["unevaluatedItems"], i)?;
        if !node.valid {
            failed.push(i);
        }
        ctx.attach(node);
        evaluated.push(json!(i));
    }
    ctx.annotate("unevaluatedItems", Value::Array(evaluated));
    if !failed.is_empty() {
        ctx.fail(
            "unevaluatedItems",
            "UnevaluatedItems",
            &[("indices", json!(failed))],
        );
    }
    Ok(())
}

fn def(
    name: &'static str,
    drafts: DraftSet,
    vocabulary: Vocabulary,
    priority: u8,
    parse: ParseFn,
) -> Arc<KeywordDef> {
    Arc::new(KeywordDef {
        name,
        drafts,
        vocabulary,
        priority,
        is_applicator: true,
        parse,
    })
}

pub fn defs() -> Vec<Arc<KeywordDef>> {
    vec![
        // 2019-09 files these under the applicator vocabulary; 2020-12 moved
        // them into their own.
        def(
            "unevaluatedProperties",
            DraftSet::ONLY_2019,
            Vocabulary::Applicator,
            priority::UNEVALUATED_PROPERTIES,
            parse_unevaluated_properties,
        ),
        def(
            "unevaluatedProperties",
            DraftSet::SINCE_2020,
            Vocabulary::Unevaluated,
            priority::UNEVALUATED_PROPERTIES,
            parse_unevaluated_properties,
        ),
        def(
            "unevaluatedItems",
            DraftSet::ONLY_2019,
            Vocabulary::Applicator,
            priority::UNEVALUATED_ITEMS,
            parse_unevaluated_items,
        ),
        def(
            "unevaluatedItems",
            DraftSet::SINCE_2020,
            Vocabulary::Unevaluated,
            priority::UNEVALUATED_ITEMS,
            parse_unevaluated_items,
        ),
    ]
}
