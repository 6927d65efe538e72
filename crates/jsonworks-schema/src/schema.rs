//! The compiled schema model and its construction from JSON.
//!
//! A compiled schema is either a boolean or a priority-ordered list of
//! keyword instances, plus the base URI, draft and absolute location of the
//! object it came from. Subschemas are owned `Arc<Schema>` handles;
//! cross-resource links go through URI lookup in the registry, never through
//! pointers into a foreign tree. References compile lazily: `$ref` targets
//! are built on first resolution and cached per location in the registry, so
//! self-referencing schemas cost nothing extra at construction time.

use crate::draft::{Draft, DEFAULT_DRAFT};
use crate::error::SchemaError;
use crate::keyword::{priority, Keyword, KeywordInstance};
use crate::keywords;
use crate::options::EvalOptions;
use crate::registry::{Resource, SchemaRegistry};
use crate::result::EvaluationResults;
use jsonworks_value::pointer;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;

/// A compiled schema node.
#[derive(Debug)]
pub struct Schema {
    pub kind: SchemaKind,
    /// Absolute URI of the enclosing schema resource.
    pub base_uri: String,
    /// The draft this schema was compiled under.
    pub draft: Draft,
    /// The resolved `$schema` URI, when one was declared.
    pub meta_uri: Option<String>,
    /// Absolute keyword location: `{base_uri}#{pointer}`.
    pub location: String,
    /// Whether this object carries an unevaluated-* keyword; annotation
    /// collection cannot be skipped below such a schema.
    pub has_unevaluated: bool,
}

#[derive(Debug)]
pub enum SchemaKind {
    Bool(bool),
    /// Keyword instances, sorted by priority then name.
    Keyed(Vec<KeywordInstance>),
}

// ── Compilation ────────────────────────────────────────────────────────────

/// Compilation state threaded through keyword parse functions.
pub struct CompileCtx<'r> {
    pub registry: &'r SchemaRegistry,
    pub base_uri: Url,
    pub draft: Draft,
    /// `evaluate_as` override; wins over any `$schema` declaration.
    pub force_draft: Option<Draft>,
    /// JSON Pointer of the current object within its resource.
    pub pointer: String,
}

impl<'r> CompileCtx<'r> {
    pub fn eff_draft(&self) -> Draft {
        self.force_draft.unwrap_or(self.draft)
    }

    pub fn location(&self) -> String {
        format!("{}#{}", self.base_uri, self.pointer)
    }

    /// Compiles a subschema at `tokens` below the current pointer.
    pub fn compile_child(
        &mut self,
        raw: &Value,
        tokens: &[&str],
    ) -> Result<Arc<Schema>, SchemaError> {
        let saved = self.pointer.len();
        for token in tokens {
            self.pointer = pointer::append(&self.pointer, token);
        }
        let result = compile_value(raw, self);
        self.pointer.truncate(saved);
        result
    }
}

pub(crate) fn compile_value(
    raw: &Value,
    ctx: &mut CompileCtx<'_>,
) -> Result<Arc<Schema>, SchemaError> {
    match raw {
        Value::Bool(b) => Ok(Arc::new(Schema {
            kind: SchemaKind::Bool(*b),
            base_uri: ctx.base_uri.to_string(),
            draft: ctx.eff_draft(),
            meta_uri: None,
            location: ctx.location(),
            has_unevaluated: false,
        })),
        Value::Object(map) => compile_object(map, ctx),
        _ => Err(SchemaError::compile(
            "",
            ctx.location(),
            "a schema must be an object or a boolean",
        )),
    }
}

fn compile_object(
    map: &Map<String, Value>,
    ctx: &mut CompileCtx<'_>,
) -> Result<Arc<Schema>, SchemaError> {
    let saved_base = ctx.base_uri.clone();
    let saved_draft = ctx.draft;
    let mut saved_pointer: Option<String> = None;

    let mut meta_uri = None;
    if let Some(schema_val) = map.get("$schema") {
        let uri = schema_val.as_str().ok_or_else(|| {
            SchemaError::compile("$schema", ctx.location(), "must be a string")
        })?;
        match Draft::from_meta_schema_uri(uri)? {
            Some(draft) => {
                ctx.draft = draft;
                meta_uri = Some(draft.meta_schema_uri().to_string());
            }
            None => {
                // Custom meta-schema: it must be resolvable, and it hands us
                // its draft. Nothing beyond this lookup is validated.
                let resolved = Url::parse(uri).map_err(|e| SchemaError::InvalidUri {
                    uri: uri.to_string(),
                    reason: e.to_string(),
                })?;
                let mut bare = resolved;
                bare.set_fragment(None);
                let resource = ctx
                    .registry
                    .lookup(bare.as_str())
                    .ok_or_else(|| SchemaError::UnknownMetaSchema(uri.to_string()))?;
                ctx.draft = resource.draft;
                meta_uri = Some(resource.uri.clone());
            }
        }
    }

    // `$id` rebases the subtree. At a resource root (empty pointer) the
    // context base already reflects it, courtesy of registration.
    if !ctx.pointer.is_empty() {
        if let Some(id_val) = map.get("$id") {
            let id = id_val
                .as_str()
                .ok_or_else(|| SchemaError::compile("$id", ctx.location(), "must be a string"))?;
            if !id.starts_with('#') {
                let joined = ctx.base_uri.join(id).map_err(|e| SchemaError::InvalidUri {
                    uri: id.to_string(),
                    reason: e.to_string(),
                })?;
                let mut new_base = joined;
                new_base.set_fragment(None);
                ctx.base_uri = new_base;
                saved_pointer = Some(std::mem::take(&mut ctx.pointer));
            }
        }
    }

    let location = ctx.location();
    let draft = ctx.eff_draft();

    // Pre-2019-09, `$ref` is exclusive: siblings are dropped at compile time.
    let entries: Vec<(&String, &Value)> =
        if draft.ref_suppresses_siblings() && map.contains_key("$ref") {
            map.iter().filter(|(name, _)| name.as_str() == "$ref").collect()
        } else {
            map.iter().collect()
        };

    let mut instances = Vec::with_capacity(entries.len());
    for (name, value) in entries {
        match keywords::lookup(name, draft) {
            Some(def) => {
                let keyword = (def.parse)(value, ctx)?;
                instances.push(KeywordInstance {
                    name: name.clone(),
                    priority: def.priority,
                    vocabulary: Some(def.vocabulary),
                    keyword,
                });
            }
            None => instances.push(KeywordInstance {
                name: name.clone(),
                priority: priority::UNKNOWN,
                vocabulary: None,
                keyword: Keyword::Unknown(value.clone()),
            }),
        }
    }
    instances.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));

    let has_unevaluated = instances.iter().any(|inst| {
        matches!(
            inst.keyword,
            Keyword::UnevaluatedItems(_) | Keyword::UnevaluatedProperties(_)
        )
    });

    let schema = Arc::new(Schema {
        kind: SchemaKind::Keyed(instances),
        base_uri: ctx.base_uri.to_string(),
        draft,
        meta_uri,
        location,
        has_unevaluated,
    });

    ctx.base_uri = saved_base;
    ctx.draft = saved_draft;
    if let Some(p) = saved_pointer {
        ctx.pointer = p;
    }
    Ok(schema)
}

// ── Resource scanning ──────────────────────────────────────────────────────

/// How a keyword nests subschemas, for the anchor/`$id` scan.
enum Shape {
    None,
    Single,
    Map,
    List,
    /// Legacy `items`: a schema or a positional tuple.
    SchemaOrList,
    /// Legacy `dependencies`: array entries are property lists, the rest are
    /// schemas.
    Dependencies,
}

fn subschema_shape(name: &str) -> Shape {
    match name {
        "additionalProperties" | "propertyNames" | "not" | "if" | "then" | "else" | "contains"
        | "unevaluatedProperties" | "unevaluatedItems" | "contentSchema" | "additionalItems" => {
            Shape::Single
        }
        "properties" | "patternProperties" | "dependentSchemas" | "$defs" | "definitions" => {
            Shape::Map
        }
        "allOf" | "anyOf" | "oneOf" | "prefixItems" => Shape::List,
        "items" => Shape::SchemaOrList,
        "dependencies" => Shape::Dependencies,
        _ => Shape::None,
    }
}

/// Scans a document for schema resources: every `$id` starts one, and each
/// resource collects its own anchors. Returns the root resource URI.
///
/// Scanning is structure-aware: only subschema positions are walked, so an
/// `$id` inside `const` data registers nothing.
pub(crate) fn scan_resources(
    raw: &Value,
    retrieval_base: &Url,
    default_draft: Draft,
    out: &mut Vec<Resource>,
) -> Result<String, SchemaError> {
    let mut draft = default_draft;
    let mut base = retrieval_base.clone();
    let mut vocabulary = None;

    if let Value::Object(map) = raw {
        if let Some(Value::String(uri)) = map.get("$schema") {
            if let Some(d) = Draft::from_meta_schema_uri(uri)? {
                draft = d;
            }
        }
        if let Some(Value::String(id)) = map.get("$id") {
            if !id.starts_with('#') {
                let joined = base.join(id).map_err(|e| SchemaError::InvalidUri {
                    uri: id.clone(),
                    reason: e.to_string(),
                })?;
                base = joined;
                base.set_fragment(None);
            }
        }
        if let Some(Value::Object(vocab)) = map.get("$vocabulary") {
            vocabulary = Some(
                vocab
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect::<BTreeMap<String, Value>>(),
            );
        }
    }

    let mut resource = Resource {
        uri: base.to_string(),
        raw: raw.clone(),
        draft,
        anchors: Default::default(),
        dynamic_anchors: Default::default(),
        recursive_anchor: false,
        vocabulary,
    };
    let uri = resource.uri.clone();
    walk_schema(raw, "", true, &base, &mut resource, out)?;
    out.push(resource);
    Ok(uri)
}

fn walk_schema(
    value: &Value,
    ptr: &str,
    is_resource_root: bool,
    base: &Url,
    resource: &mut Resource,
    out: &mut Vec<Resource>,
) -> Result<(), SchemaError> {
    let map = match value {
        Value::Object(m) => m,
        _ => return Ok(()),
    };

    if let Some(Value::String(id)) = map.get("$id") {
        if let Some(name) = id.strip_prefix('#') {
            // Drafts 6/7 spell anchors as plain-name `$id` fragments.
            if !name.is_empty() {
                resource.anchors.insert(name.to_string(), ptr.to_string());
            }
        } else if !is_resource_root {
            // A nested resource: scan it independently, starting from this
            // resource's base. Its anchors are its own.
            scan_resources(value, base, resource.draft, out)?;
            return Ok(());
        }
    }

    if let Some(Value::String(name)) = map.get("$anchor") {
        resource.anchors.insert(name.clone(), ptr.to_string());
    }
    if let Some(Value::String(name)) = map.get("$dynamicAnchor") {
        // A dynamic anchor is also addressable as a plain anchor.
        resource.anchors.insert(name.clone(), ptr.to_string());
        resource.dynamic_anchors.insert(name.clone(), ptr.to_string());
    }
    if is_resource_root {
        if let Some(Value::Bool(true)) = map.get("$recursiveAnchor") {
            resource.recursive_anchor = true;
        }
    }

    for (name, child) in map {
        match subschema_shape(name) {
            Shape::None => {}
            Shape::Single => {
                let p = pointer::append(ptr, name);
                walk_schema(child, &p, false, base, resource, out)?;
            }
            Shape::Map => {
                if let Value::Object(entries) = child {
                    for (key, sub) in entries {
                        let p = pointer::append(&pointer::append(ptr, name), key);
                        walk_schema(sub, &p, false, base, resource, out)?;
                    }
                }
            }
            Shape::List => {
                if let Value::Array(items) = child {
                    for (i, sub) in items.iter().enumerate() {
                        let p = pointer::append_index(&pointer::append(ptr, name), i);
                        walk_schema(sub, &p, false, base, resource, out)?;
                    }
                }
            }
            Shape::SchemaOrList => match child {
                Value::Array(items) => {
                    for (i, sub) in items.iter().enumerate() {
                        let p = pointer::append_index(&pointer::append(ptr, name), i);
                        walk_schema(sub, &p, false, base, resource, out)?;
                    }
                }
                other => {
                    let p = pointer::append(ptr, name);
                    walk_schema(other, &p, false, base, resource, out)?;
                }
            },
            Shape::Dependencies => {
                if let Value::Object(entries) = child {
                    for (key, sub) in entries {
                        if !sub.is_array() {
                            let p = pointer::append(&pointer::append(ptr, name), key);
                            walk_schema(sub, &p, false, base, resource, out)?;
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

// ── Public entry point ─────────────────────────────────────────────────────

/// A schema document bound to a registry, ready to evaluate instances.
///
/// Construction compiles the root; the result is immutable and safe to share
/// across parallel evaluations.
#[derive(Debug, Clone)]
pub struct JsonSchema {
    registry: Arc<SchemaRegistry>,
    root_uri: String,
    root: Arc<Schema>,
}

impl JsonSchema {
    /// Builds a schema with its own registry and default options.
    pub fn from_value(raw: Value) -> Result<Self, SchemaError> {
        Self::from_value_with(raw, &EvalOptions::default())
    }

    /// Builds a schema with its own registry, honoring `default_base_uri`
    /// and `evaluate_as` from the options.
    pub fn from_value_with(raw: Value, options: &EvalOptions) -> Result<Self, SchemaError> {
        Self::from_value_in(raw, Arc::new(SchemaRegistry::new()), options)
    }

    /// Builds a schema into an existing registry, so it can reference (and
    /// be referenced by) other registered documents.
    pub fn from_value_in(
        raw: Value,
        registry: Arc<SchemaRegistry>,
        options: &EvalOptions,
    ) -> Result<Self, SchemaError> {
        let root_uri = registry.register_with_draft(&options.default_base_uri, raw, DEFAULT_DRAFT)?;
        let root = registry.compile_at(&root_uri, "", options.evaluate_as)?;
        Ok(JsonSchema {
            registry,
            root_uri,
            root,
        })
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn root(&self) -> &Arc<Schema> {
        &self.root
    }

    /// Evaluates an instance, producing a result in the requested shape.
    pub fn evaluate(
        &self,
        instance: &Value,
        options: &EvalOptions,
    ) -> Result<EvaluationResults, SchemaError> {
        let root = match options.evaluate_as {
            Some(draft) => self.registry.compile_at(&self.root_uri, "", Some(draft))?,
            None => self.root.clone(),
        };
        crate::context::EvalContext::run(root, instance, &self.registry, options)
    }
}
