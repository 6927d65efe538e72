//! Core-vocabulary keywords: identifiers, anchors and references.

use super::{expect_bool, expect_string};
use crate::context::EvalContext;
use crate::draft::DraftSet;
use crate::error::SchemaError;
use crate::keyword::{priority, Keyword, KeywordDef};
use crate::reference;
use crate::schema::{CompileCtx, Schema};
use crate::vocabulary::Vocabulary;
use regex::Regex;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

fn anchor_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][-A-Za-z0-9._]*$").unwrap())
}

// ── Parsing ────────────────────────────────────────────────────────────────

fn parse_meta_schema(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    Ok(Keyword::MetaSchema(expect_string("$schema", value, ctx)?))
}

fn parse_id(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    Ok(Keyword::Id(expect_string("$id", value, ctx)?))
}

fn parse_anchor_name(
    keyword: &str,
    value: &Value,
    ctx: &CompileCtx<'_>,
) -> Result<String, SchemaError> {
    let name = expect_string(keyword, value, ctx)?;
    if !anchor_regex().is_match(&name) {
        return Err(SchemaError::compile(
            keyword,
            ctx.location(),
            format!("{:?} is not a valid plain name", name),
        ));
    }
    Ok(name)
}

fn parse_anchor(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    Ok(Keyword::Anchor(parse_anchor_name("$anchor", value, ctx)?))
}

fn parse_dynamic_anchor(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    Ok(Keyword::DynamicAnchor(parse_anchor_name(
        "$dynamicAnchor",
        value,
        ctx,
    )?))
}

fn parse_recursive_anchor(
    value: &Value,
    ctx: &mut CompileCtx<'_>,
) -> Result<Keyword, SchemaError> {
    Ok(Keyword::RecursiveAnchor(expect_bool(
        "$recursiveAnchor",
        value,
        ctx,
    )?))
}

fn parse_ref(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    Ok(Keyword::Ref(expect_string("$ref", value, ctx)?))
}

fn parse_dynamic_ref(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    Ok(Keyword::DynamicRef(expect_string("$dynamicRef", value, ctx)?))
}

fn parse_recursive_ref(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    let target = expect_string("$recursiveRef", value, ctx)?;
    if target != "#" {
        return Err(SchemaError::compile(
            "$recursiveRef",
            ctx.location(),
            "only \"#\" is allowed",
        ));
    }
    Ok(Keyword::RecursiveRef)
}

fn compile_defs(
    keyword: &str,
    value: &Value,
    ctx: &mut CompileCtx<'_>,
) -> Result<Keyword, SchemaError> {
    // Definitions are never evaluated directly; compiling them up front
    // surfaces malformed subschemas at construction time.
    let entries = value.as_object().ok_or_else(|| {
        SchemaError::compile(keyword, ctx.location(), "must be an object of schemas")
    })?;
    let mut defs = BTreeMap::new();
    for (name, sub) in entries {
        defs.insert(name.clone(), ctx.compile_child(sub, &[keyword, name])?);
    }
    Ok(Keyword::Defs(defs))
}

fn parse_defs(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    compile_defs("$defs", value, ctx)
}

fn parse_definitions(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    compile_defs("definitions", value, ctx)
}

fn parse_comment(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    Ok(Keyword::Comment(expect_string("$comment", value, ctx)?))
}

fn parse_vocabulary(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    let entries = value.as_object().ok_or_else(|| {
        SchemaError::compile("$vocabulary", ctx.location(), "must be an object")
    })?;
    let mut vocabularies = BTreeMap::new();
    for (uri, required) in entries {
        let required = required.as_bool().ok_or_else(|| {
            SchemaError::compile("$vocabulary", ctx.location(), "values must be booleans")
        })?;
        vocabularies.insert(uri.clone(), required);
    }
    Ok(Keyword::Vocabulary(vocabularies))
}

// ── Evaluation ─────────────────────────────────────────────────────────────

fn apply_reference(
    keyword: &'static str,
    resolved: Result<Arc<Schema>, SchemaError>,
    reference_value: &str,
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    match resolved {
        Ok(target) => {
            let node = ctx.apply(&target, &[keyword])?;
            let valid = node.valid;
            ctx.attach(node);
            if !valid {
                ctx.fail(keyword, "Ref", &[]);
            }
            Ok(())
        }
        // An unresolvable reference is fatal for this branch only: the
        // result carries a diagnostic and siblings keep evaluating.
        Err(SchemaError::UnresolvedReference { .. }) => {
            ctx.fail(
                keyword,
                "UnresolvedRef",
                &[("reference", json!(reference_value))],
            );
            Ok(())
        }
        Err(other) => Err(other),
    }
}

pub(crate) fn eval_ref(raw: &str, ctx: &mut EvalContext<'_>) -> Result<(), SchemaError> {
    let resolved = reference::resolve_ref(ctx, raw);
    apply_reference("$ref", resolved, raw, ctx)
}

pub(crate) fn eval_dynamic_ref(raw: &str, ctx: &mut EvalContext<'_>) -> Result<(), SchemaError> {
    let resolved = reference::resolve_dynamic_ref(ctx, raw);
    apply_reference("$dynamicRef", resolved, raw, ctx)
}

pub(crate) fn eval_recursive_ref(ctx: &mut EvalContext<'_>) -> Result<(), SchemaError> {
    let resolved = reference::resolve_recursive_ref(ctx);
    apply_reference("$recursiveRef", resolved, "#", ctx)
}

// ── Catalog ────────────────────────────────────────────────────────────────

pub fn defs() -> Vec<Arc<KeywordDef>> {
    vec![
        Arc::new(KeywordDef {
            name: "$schema",
            drafts: DraftSet::ALL,
            vocabulary: Vocabulary::Core,
            priority: priority::META,
            is_applicator: false,
            parse: parse_meta_schema,
        }),
        Arc::new(KeywordDef {
            name: "$id",
            drafts: DraftSet::ALL,
            vocabulary: Vocabulary::Core,
            priority: priority::IDENTIFIER,
            is_applicator: false,
            parse: parse_id,
        }),
        Arc::new(KeywordDef {
            name: "$anchor",
            drafts: DraftSet::SINCE_2019,
            vocabulary: Vocabulary::Core,
            priority: priority::ANCHOR,
            is_applicator: false,
            parse: parse_anchor,
        }),
        Arc::new(KeywordDef {
            name: "$dynamicAnchor",
            drafts: DraftSet::SINCE_2020,
            vocabulary: Vocabulary::Core,
            priority: priority::ANCHOR,
            is_applicator: false,
            parse: parse_dynamic_anchor,
        }),
        Arc::new(KeywordDef {
            name: "$recursiveAnchor",
            drafts: DraftSet::ONLY_2019,
            vocabulary: Vocabulary::Core,
            priority: priority::ANCHOR,
            is_applicator: false,
            parse: parse_recursive_anchor,
        }),
        Arc::new(KeywordDef {
            name: "$ref",
            drafts: DraftSet::ALL,
            vocabulary: Vocabulary::Core,
            priority: priority::REFERENCE,
            is_applicator: true,
            parse: parse_ref,
        }),
        Arc::new(KeywordDef {
            name: "$dynamicRef",
            drafts: DraftSet::SINCE_2020,
            vocabulary: Vocabulary::Core,
            priority: priority::REFERENCE,
            is_applicator: true,
            parse: parse_dynamic_ref,
        }),
        Arc::new(KeywordDef {
            name: "$recursiveRef",
            drafts: DraftSet::ONLY_2019,
            vocabulary: Vocabulary::Core,
            priority: priority::REFERENCE,
            is_applicator: true,
            parse: parse_recursive_ref,
        }),
        Arc::new(KeywordDef {
            name: "$defs",
            drafts: DraftSet::SINCE_2019,
            vocabulary: Vocabulary::Core,
            priority: priority::ANCHOR,
            is_applicator: false,
            parse: parse_defs,
        }),
        Arc::new(KeywordDef {
            name: "definitions",
            drafts: DraftSet::UNTIL_7,
            vocabulary: Vocabulary::Core,
            priority: priority::ANCHOR,
            is_applicator: false,
            parse: parse_definitions,
        }),
        Arc::new(KeywordDef {
            name: "$comment",
            drafts: DraftSet::SINCE_7,
            vocabulary: Vocabulary::Core,
            priority: priority::ANCHOR,
            is_applicator: false,
            parse: parse_comment,
        }),
        Arc::new(KeywordDef {
            name: "$vocabulary",
            drafts: DraftSet::SINCE_2019,
            vocabulary: Vocabulary::Core,
            priority: priority::ANCHOR,
            is_applicator: false,
            parse: parse_vocabulary,
        }),
    ]
}
