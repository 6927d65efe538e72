//! Keyword descriptors and the compiled keyword model.
//!
//! The catalog (see `keywords`) holds one [`KeywordDef`] per keyword variant:
//! its name, the drafts it is recognized in, its vocabulary, its evaluation
//! priority and a parse function. Parsing turns the raw keyword value into a
//! [`Keyword`], an immutable tagged variant holding the parsed arguments,
//! with subschemas compiled to [`Schema`] handles. Draft variance is resolved
//! here: a draft picks its variant of a keyword at parse time, so the
//! evaluator only ever sees one semantic per instance.

use crate::draft::DraftSet;
use crate::error::SchemaError;
use crate::schema::{CompileCtx, Schema};
use crate::vocabulary::Vocabulary;
use jsonworks_value::ValueKind;
use regex::Regex;
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Intra-schema evaluation ordering. Lower runs first; ties break on the
/// keyword name.
pub mod priority {
    /// `$schema` — establishes the draft.
    pub const META: u8 = 0;
    /// `$id` — establishes the base URI.
    pub const IDENTIFIER: u8 = 1;
    /// Anchors, `$defs`, `$comment`, `$vocabulary` — inert at evaluation.
    pub const ANCHOR: u8 = 5;
    /// `$ref`, `$dynamicRef`, `$recursiveRef`.
    pub const REFERENCE: u8 = 10;
    /// Plain assertions.
    pub const ASSERTION: u8 = 50;
    /// `properties`, `prefixItems`, legacy `items`.
    pub const FIRST_APPLICATOR: u8 = 60;
    /// `patternProperties`, 2020-12 `items` (consume the annotations above).
    pub const SECOND_APPLICATOR: u8 = 61;
    /// `additionalProperties`, `additionalItems`.
    pub const THIRD_APPLICATOR: u8 = 62;
    /// `minContains`/`maxContains` — annotate before `contains` consumes.
    pub const CONTAINS_BOUNDS: u8 = 63;
    pub const CONTAINS: u8 = 64;
    pub const IF: u8 = 70;
    pub const THEN: u8 = 71;
    pub const ELSE: u8 = 72;
    /// In-place applicators with no sibling ordering demands.
    pub const APPLICATOR: u8 = 80;
    /// Metadata, content and `format` annotations.
    pub const ANNOTATION: u8 = 90;
    /// Keywords the engine does not know.
    pub const UNKNOWN: u8 = 100;
    /// Unevaluated-* run last among siblings; this is required for
    /// correctness, not a tuning choice.
    pub const UNEVALUATED_ITEMS: u8 = 240;
    pub const UNEVALUATED_PROPERTIES: u8 = 241;
}

/// Parses a raw keyword value into its compiled form.
pub type ParseFn = fn(&Value, &mut CompileCtx<'_>) -> Result<Keyword, SchemaError>;

/// A keyword descriptor: one row of the catalog.
pub struct KeywordDef {
    pub name: &'static str,
    pub drafts: DraftSet,
    pub vocabulary: Vocabulary,
    pub priority: u8,
    /// Whether evaluation descends into subschemas.
    pub is_applicator: bool,
    pub parse: ParseFn,
}

/// One compiled keyword occurrence inside a schema object.
#[derive(Debug, Clone)]
pub struct KeywordInstance {
    pub name: String,
    pub priority: u8,
    /// `None` for keywords unknown to the engine.
    pub vocabulary: Option<Vocabulary>,
    pub keyword: Keyword,
}

/// Pre-2020-12 `items`: a single schema for every element, or a positional
/// tuple.
#[derive(Debug, Clone)]
pub enum ItemsForm {
    Single(Arc<Schema>),
    Tuple(Vec<Arc<Schema>>),
}

/// The parsed arguments of a keyword.
#[derive(Debug, Clone)]
pub enum Keyword {
    // Core
    MetaSchema(String),
    Id(String),
    Anchor(String),
    DynamicAnchor(String),
    RecursiveAnchor(bool),
    Ref(String),
    DynamicRef(String),
    RecursiveRef,
    Defs(BTreeMap<String, Arc<Schema>>),
    Comment(String),
    Vocabulary(BTreeMap<String, bool>),

    // Assertions
    Type(Vec<ValueKind>),
    Const(Value),
    Enum(Vec<Value>),
    MultipleOf(Number),
    Minimum(Number),
    Maximum(Number),
    ExclusiveMinimum(Number),
    ExclusiveMaximum(Number),
    MinLength(u64),
    MaxLength(u64),
    Pattern(Regex),
    MinItems(u64),
    MaxItems(u64),
    UniqueItems(bool),
    MinContains(u64),
    MaxContains(u64),
    MinProperties(u64),
    MaxProperties(u64),
    Required(Vec<String>),
    DependentRequired(BTreeMap<String, Vec<String>>),
    Format(String),

    // Applicators
    AllOf(Vec<Arc<Schema>>),
    AnyOf(Vec<Arc<Schema>>),
    OneOf(Vec<Arc<Schema>>),
    Not(Arc<Schema>),
    If(Arc<Schema>),
    Then(Arc<Schema>),
    Else(Arc<Schema>),
    DependentSchemas(BTreeMap<String, Arc<Schema>>),
    DependenciesLegacy {
        required: BTreeMap<String, Vec<String>>,
        schemas: BTreeMap<String, Arc<Schema>>,
    },
    Properties(BTreeMap<String, Arc<Schema>>),
    /// `(raw pattern, compiled regex, schema)` triples in document key order.
    PatternProperties(Vec<(String, Regex, Arc<Schema>)>),
    AdditionalProperties(Arc<Schema>),
    PropertyNames(Arc<Schema>),
    PrefixItems(Vec<Arc<Schema>>),
    /// 2020-12 `items`: applies past the `prefixItems` coverage.
    Items(Arc<Schema>),
    ItemsLegacy(ItemsForm),
    AdditionalItems(Arc<Schema>),
    Contains(Arc<Schema>),
    UnevaluatedItems(Arc<Schema>),
    UnevaluatedProperties(Arc<Schema>),

    // Annotations
    Title(String),
    Description(String),
    Default(Value),
    Deprecated(bool),
    ReadOnly(bool),
    WriteOnly(bool),
    Examples(Vec<Value>),
    ContentEncoding(String),
    ContentMediaType(String),
    ContentSchema(Value),
    Unknown(Value),
}
