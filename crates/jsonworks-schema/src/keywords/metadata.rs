//! Metadata and content keywords. Annotations only.

use super::{expect_bool, expect_string};
use crate::context::EvalContext;
use crate::draft::DraftSet;
use crate::error::SchemaError;
use crate::keyword::{priority, Keyword, KeywordDef, ParseFn};
use crate::schema::CompileCtx;
use crate::vocabulary::Vocabulary;
use serde_json::{json, Value};
use std::sync::Arc;

fn parse_title(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    Ok(Keyword::Title(expect_string("title", value, ctx)?))
}

fn parse_description(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    Ok(Keyword::Description(expect_string("description", value, ctx)?))
}

fn parse_default(value: &Value, _ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    Ok(Keyword::Default(value.clone()))
}

fn parse_deprecated(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    Ok(Keyword::Deprecated(expect_bool("deprecated", value, ctx)?))
}

fn parse_read_only(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    Ok(Keyword::ReadOnly(expect_bool("readOnly", value, ctx)?))
}

fn parse_write_only(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    Ok(Keyword::WriteOnly(expect_bool("writeOnly", value, ctx)?))
}

fn parse_examples(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    let items = value
        .as_array()
        .ok_or_else(|| SchemaError::compile("examples", ctx.location(), "must be an array"))?;
    Ok(Keyword::Examples(items.clone()))
}

fn parse_content_encoding(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    Ok(Keyword::ContentEncoding(expect_string(
        "contentEncoding",
        value,
        ctx,
    )?))
}

fn parse_content_media_type(
    value: &Value,
    ctx: &mut CompileCtx<'_>,
) -> Result<Keyword, SchemaError> {
    Ok(Keyword::ContentMediaType(expect_string(
        "contentMediaType",
        value,
        ctx,
    )?))
}

fn parse_content_schema(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    if !value.is_object() && !value.is_boolean() {
        return Err(SchemaError::compile(
            "contentSchema",
            ctx.location(),
            "must be a schema",
        ));
    }
    Ok(Keyword::ContentSchema(value.clone()))
}

pub(crate) fn eval_string_annotation(
    keyword: &str,
    value: &str,
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    ctx.annotate(keyword, json!(value));
    Ok(())
}

pub(crate) fn eval_bool_annotation(
    keyword: &str,
    value: bool,
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    ctx.annotate(keyword, json!(value));
    Ok(())
}

pub(crate) fn eval_value_annotation(
    keyword: &str,
    value: &Value,
    ctx: &mut EvalContext<'_>,
) -> Result<(), SchemaError> {
    ctx.annotate(keyword, value.clone());
    Ok(())
}

pub(crate) fn eval_examples(values: &[Value], ctx: &mut EvalContext<'_>) -> Result<(), SchemaError> {
    ctx.annotate("examples", Value::Array(values.to_vec()));
    Ok(())
}

fn def(
    name: &'static str,
    drafts: DraftSet,
    vocabulary: Vocabulary,
    parse: ParseFn,
) -> Arc<KeywordDef> {
    Arc::new(KeywordDef {
        name,
        drafts,
        vocabulary,
        priority: priority::ANNOTATION,
        is_applicator: false,
        parse,
    })
}

pub fn defs() -> Vec<Arc<KeywordDef>> {
    vec![
        def("title", DraftSet::ALL, Vocabulary::MetaData, parse_title),
        def("description", DraftSet::ALL, Vocabulary::MetaData, parse_description),
        def("default", DraftSet::ALL, Vocabulary::MetaData, parse_default),
        def("deprecated", DraftSet::SINCE_2019, Vocabulary::MetaData, parse_deprecated),
        def("readOnly", DraftSet::SINCE_7, Vocabulary::MetaData, parse_read_only),
        def("writeOnly", DraftSet::SINCE_7, Vocabulary::MetaData, parse_write_only),
        def("examples", DraftSet::ALL, Vocabulary::MetaData, parse_examples),
        def(
            "contentEncoding",
            DraftSet::SINCE_7,
            Vocabulary::Content,
            parse_content_encoding,
        ),
        def(
            "contentMediaType",
            DraftSet::SINCE_7,
            Vocabulary::Content,
            parse_content_media_type,
        ),
        def(
            "contentSchema",
            DraftSet::SINCE_2019,
            Vocabulary::Content,
            parse_content_schema,
        ),
    ]
}
