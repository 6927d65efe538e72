//! The schema registry: absolute URI → schema resource, plus the lazy
//! compilation cache.
//!
//! Registries are seeded with the meta-schemas of every supported draft and
//! are read-mostly after setup; interior locking keeps them shareable across
//! parallel evaluations. A caller-supplied fetcher fills lookup misses.

use crate::draft::{Draft, DEFAULT_DRAFT};
use crate::error::SchemaError;
use crate::schema::{self, CompileCtx, Schema};
use jsonworks_value::pointer;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock};
use url::Url;

/// Loads a raw schema document for a URI, or signals not-found with `None`.
pub type FetchFn = dyn Fn(&str) -> Option<Value> + Send + Sync;

/// One schema resource: a document (or embedded subtree) with its own `$id`.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Absolute, fragmentless URI.
    pub uri: String,
    pub raw: Value,
    pub draft: Draft,
    /// Anchor name → JSON Pointer within this resource.
    pub anchors: HashMap<String, String>,
    pub dynamic_anchors: HashMap<String, String>,
    /// Root-level `$recursiveAnchor: true` (2019-09).
    pub recursive_anchor: bool,
    /// Root-level `$vocabulary`, kept for meta-schema lookups.
    pub vocabulary: Option<BTreeMap<String, Value>>,
}

type CompiledKey = (String, String, Option<Draft>);

pub struct SchemaRegistry {
    resources: RwLock<HashMap<String, Arc<Resource>>>,
    compiled: RwLock<HashMap<CompiledKey, Arc<Schema>>>,
    fetcher: Option<Arc<FetchFn>>,
    cache_fetch_failures: bool,
    failed_fetches: RwLock<HashSet<String>>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("resources", &self.resources.read().unwrap().len())
            .field("compiled", &self.compiled.read().unwrap().len())
            .field("fetcher", &self.fetcher.as_ref().map(|_| "fn"))
            .finish()
    }
}

impl SchemaRegistry {
    /// A registry pre-populated with the supported meta-schemas.
    pub fn new() -> Self {
        let registry = SchemaRegistry {
            resources: RwLock::new(HashMap::new()),
            compiled: RwLock::new(HashMap::new()),
            fetcher: None,
            cache_fetch_failures: false,
            failed_fetches: RwLock::new(HashSet::new()),
        };
        for draft in Draft::ALL {
            let uri = draft.meta_schema_uri();
            let raw = meta_schema_document(draft);
            // Seeding cannot fail: the documents are fixed.
            let _ = registry.register_with_draft(uri, raw, draft);
        }
        registry
    }

    /// Installs the lazy loader consulted on lookup misses. Must be
    /// reentrant if schemas are compiled concurrently.
    pub fn set_fetcher(&mut self, fetcher: Arc<FetchFn>) {
        self.fetcher = Some(fetcher);
    }

    /// Opts into negative caching: a URI the fetcher failed to produce is
    /// not fetched again.
    pub fn cache_fetch_failures(&mut self, cache: bool) {
        self.cache_fetch_failures = cache;
    }

    /// Registers a document under `base_uri`, scanning out every embedded
    /// resource. Returns the root resource URI (which differs from
    /// `base_uri` when the root carries `$id`).
    pub fn register(&self, base_uri: &str, raw: Value) -> Result<String, SchemaError> {
        self.register_with_draft(base_uri, raw, DEFAULT_DRAFT)
    }

    pub fn register_with_draft(
        &self,
        base_uri: &str,
        raw: Value,
        default_draft: Draft,
    ) -> Result<String, SchemaError> {
        let base = Url::parse(base_uri).map_err(|e| SchemaError::InvalidUri {
            uri: base_uri.to_string(),
            reason: e.to_string(),
        })?;
        let mut found = Vec::new();
        let root_uri = schema::scan_resources(&raw, &base, default_draft, &mut found)?;

        let mut resources = self.resources.write().unwrap();
        for resource in found {
            resources.insert(resource.uri.clone(), Arc::new(resource));
        }
        let retrieval = base.to_string();
        if retrieval != root_uri {
            if let Some(root) = resources.get(&root_uri).cloned() {
                resources.insert(retrieval, root);
            }
        }
        Ok(root_uri)
    }

    /// Looks up a resource, consulting the fetcher once on a miss.
    pub fn lookup(&self, uri: &str) -> Option<Arc<Resource>> {
        if let Some(resource) = self.resources.read().unwrap().get(uri) {
            return Some(resource.clone());
        }
        let fetcher = self.fetcher.clone()?;
        if self.cache_fetch_failures && self.failed_fetches.read().unwrap().contains(uri) {
            return None;
        }
        match fetcher(uri) {
            Some(raw) => {
                self.register(uri, raw).ok()?;
                self.resources.read().unwrap().get(uri).cloned()
            }
            None => {
                if self.cache_fetch_failures {
                    self.failed_fetches.write().unwrap().insert(uri.to_string());
                }
                None
            }
        }
    }

    /// Compiles (or retrieves from cache) the schema at a pointer within a
    /// resource. `force_draft` pins the draft, overriding `$schema`.
    pub fn compile_at(
        &self,
        uri: &str,
        fragment_pointer: &str,
        force_draft: Option<Draft>,
    ) -> Result<Arc<Schema>, SchemaError> {
        let key = (
            uri.to_string(),
            fragment_pointer.to_string(),
            force_draft,
        );
        if let Some(compiled) = self.compiled.read().unwrap().get(&key) {
            return Ok(compiled.clone());
        }

        let unresolved = || SchemaError::UnresolvedReference {
            reference: format!("{}#{}", uri, fragment_pointer),
            base: uri.to_string(),
        };
        let resource = self.lookup(uri).ok_or_else(unresolved)?;
        let tokens = pointer::split(fragment_pointer).ok_or_else(unresolved)?;

        let mut base = Url::parse(&resource.uri).map_err(|e| SchemaError::InvalidUri {
            uri: resource.uri.clone(),
            reason: e.to_string(),
        })?;
        let mut draft = resource.draft;
        let mut local_pointer = String::new();
        let mut value: &Value = &resource.raw;

        for (step, token) in tokens.iter().enumerate() {
            // `$id`/`$schema` of containers along the path shift the base
            // and draft; the final target's own are handled by compilation.
            if step > 0 {
                apply_inline_identifiers(value, &mut base, &mut draft, &mut local_pointer)?;
            }
            value = match value {
                Value::Object(map) => map.get(token).ok_or_else(unresolved)?,
                Value::Array(items) => token
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| items.get(i))
                    .ok_or_else(unresolved)?,
                _ => return Err(unresolved()),
            };
            local_pointer = pointer::append(&local_pointer, token);
        }

        let mut ctx = CompileCtx {
            registry: self,
            base_uri: base,
            draft,
            force_draft,
            pointer: local_pointer,
        };
        let compiled = schema::compile_value(value, &mut ctx)?;
        self.compiled.write().unwrap().insert(key, compiled.clone());
        Ok(compiled)
    }
}

fn apply_inline_identifiers(
    value: &Value,
    base: &mut Url,
    draft: &mut Draft,
    local_pointer: &mut String,
) -> Result<(), SchemaError> {
    let map = match value {
        Value::Object(m) => m,
        _ => return Ok(()),
    };
    if let Some(Value::String(uri)) = map.get("$schema") {
        if let Some(d) = Draft::from_meta_schema_uri(uri)? {
            *draft = d;
        }
    }
    if let Some(Value::String(id)) = map.get("$id") {
        if !id.starts_with('#') {
            if let Ok(joined) = base.join(id) {
                *base = joined;
                base.set_fragment(None);
                local_pointer.clear();
            }
        }
    }
    Ok(())
}

fn vocabulary_uris(draft: Draft) -> Vec<&'static str> {
    match draft {
        Draft::Draft2019_09 => vec![
            "https://json-schema.org/draft/2019-09/vocab/core",
            "https://json-schema.org/draft/2019-09/vocab/applicator",
            "https://json-schema.org/draft/2019-09/vocab/validation",
            "https://json-schema.org/draft/2019-09/vocab/meta-data",
            "https://json-schema.org/draft/2019-09/vocab/format",
            "https://json-schema.org/draft/2019-09/vocab/content",
        ],
        Draft::Draft2020_12 => vec![
            "https://json-schema.org/draft/2020-12/vocab/core",
            "https://json-schema.org/draft/2020-12/vocab/applicator",
            "https://json-schema.org/draft/2020-12/vocab/unevaluated",
            "https://json-schema.org/draft/2020-12/vocab/validation",
            "https://json-schema.org/draft/2020-12/vocab/meta-data",
            "https://json-schema.org/draft/2020-12/vocab/format-annotation",
            "https://json-schema.org/draft/2020-12/vocab/content",
        ],
        Draft::Next => vec![
            "https://json-schema.org/draft/next/vocab/core",
            "https://json-schema.org/draft/next/vocab/applicator",
            "https://json-schema.org/draft/next/vocab/unevaluated",
            "https://json-schema.org/draft/next/vocab/validation",
            "https://json-schema.org/draft/next/vocab/meta-data",
            "https://json-schema.org/draft/next/vocab/format-annotation",
            "https://json-schema.org/draft/next/vocab/content",
        ],
        _ => Vec::new(),
    }
}

/// The seeded meta-schema documents. Only identification and `$vocabulary`
/// matter to the engine; schema-validating schemas is a non-goal.
fn meta_schema_document(draft: Draft) -> Value {
    let uri = draft.meta_schema_uri();
    if !draft.has_vocabularies() {
        return json!({ "$schema": uri, "$id": uri });
    }
    let vocabulary: serde_json::Map<String, Value> = vocabulary_uris(draft)
        .into_iter()
        .map(|v| (v.to_string(), json!(true)))
        .collect();
    json!({ "$schema": uri, "$id": uri, "$vocabulary": vocabulary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_seeded_meta_schemas() {
        let registry = SchemaRegistry::new();
        for draft in Draft::ALL {
            // Registered URIs are URL-normalized.
            let uri = Url::parse(draft.meta_schema_uri()).unwrap().to_string();
            let resource = registry.lookup(&uri).expect("meta-schema seeded");
            assert_eq!(resource.draft, draft);
            assert_eq!(resource.vocabulary.is_some(), draft.has_vocabularies());
        }
    }

    #[test]
    fn test_register_returns_id_uri_and_aliases_retrieval() {
        let registry = SchemaRegistry::new();
        let root = registry
            .register(
                "https://example.com/retrieved",
                json!({"$id": "https://example.com/actual", "type": "object"}),
            )
            .unwrap();
        assert_eq!(root, "https://example.com/actual");
        assert!(registry.lookup("https://example.com/actual").is_some());
        assert!(registry.lookup("https://example.com/retrieved").is_some());
    }

    #[test]
    fn test_embedded_resource_and_anchor_scan() {
        let registry = SchemaRegistry::new();
        registry
            .register(
                "https://example.com/root",
                json!({
                    "$defs": {
                        "inner": {
                            "$id": "https://example.com/inner",
                            "$anchor": "top",
                            "type": "string"
                        },
                        "local": { "$anchor": "here", "type": "number" }
                    }
                }),
            )
            .unwrap();
        let root = registry.lookup("https://example.com/root").unwrap();
        assert_eq!(root.anchors.get("here").map(String::as_str), Some("/$defs/local"));
        assert!(!root.anchors.contains_key("top"));
        let inner = registry.lookup("https://example.com/inner").unwrap();
        assert_eq!(inner.anchors.get("top").map(String::as_str), Some(""));
    }

    #[test]
    fn test_fetcher_consulted_once_with_negative_cache() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let mut registry = SchemaRegistry::new();
        registry.set_fetcher(Arc::new(move |_uri: &str| {
            calls2.fetch_add(1, Ordering::SeqCst);
            None
        }));
        registry.cache_fetch_failures(true);

        assert!(registry.lookup("https://example.com/missing").is_none());
        assert!(registry.lookup("https://example.com/missing").is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fetcher_success_registers() {
        let mut registry = SchemaRegistry::new();
        registry.set_fetcher(Arc::new(|uri: &str| {
            (uri == "https://example.com/fetched").then(|| json!({"type": "string"}))
        }));
        assert!(registry.lookup("https://example.com/fetched").is_some());
    }
}
