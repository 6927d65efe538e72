//! The `format` keyword.
//!
//! An annotation by default; an assertion when the caller demands it or the
//! active meta-schema enables the format-assertion vocabulary. Unknown
//! format names always pass.

use super::expect_string;
use crate::context::EvalContext;
use crate::draft::DraftSet;
use crate::error::SchemaError;
use crate::formats;
use crate::keyword::{priority, Keyword, KeywordDef};
use crate::schema::CompileCtx;
use crate::vocabulary::Vocabulary;
use serde_json::{json, Value};
use std::sync::Arc;

fn parse_format(value: &Value, ctx: &mut CompileCtx<'_>) -> Result<Keyword, SchemaError> {
    Ok(Keyword::Format(expect_string("format", value, ctx)?))
}

pub(crate) fn eval_format(name: &str, ctx: &mut EvalContext<'_>) -> Result<(), SchemaError> {
    ctx.annotate("format", json!(name));
    let assert = ctx.options().require_format_validation
        || ctx.vocab().contains(Vocabulary::FormatAssertion);
    if !assert {
        return Ok(());
    }
    let ok = formats::check(name, ctx.instance());
    if !ok {
        ctx.fail("format", "Format", &[("format", json!(name))]);
    }
    Ok(())
}

pub fn defs() -> Vec<Arc<KeywordDef>> {
    vec![Arc::new(KeywordDef {
        name: "format",
        drafts: DraftSet::ALL,
        vocabulary: Vocabulary::FormatAnnotation,
        priority: priority::ANNOTATION,
        is_applicator: false,
        parse: parse_format,
    })]
}
