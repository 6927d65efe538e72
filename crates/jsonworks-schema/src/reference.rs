//! Reference resolution: `$ref`, `$dynamicRef`, `$recursiveRef`.
//!
//! Static resolution joins the reference against the current schema's base
//! URI and addresses the target resource by pointer or anchor. Dynamic
//! resolution starts from the static target: when it lands on a
//! `$dynamicAnchor`, the dynamic scope is rescanned from the outermost
//! resource inward, and the first resource defining a same-named dynamic
//! anchor wins.

use crate::context::EvalContext;
use crate::error::SchemaError;
use crate::schema::Schema;
use std::sync::Arc;
use url::Url;

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

struct ResolvedUri {
    /// Absolute, fragmentless target URI.
    uri: String,
    /// Percent-decoded fragment, possibly empty.
    fragment: String,
}

fn join_against_base(ctx: &EvalContext<'_>, reference: &str) -> Result<ResolvedUri, SchemaError> {
    let base_str = ctx.current_base();
    let unresolved = || SchemaError::UnresolvedReference {
        reference: reference.to_string(),
        base: base_str.to_string(),
    };
    let base = Url::parse(base_str).map_err(|_| unresolved())?;
    let joined = base.join(reference).map_err(|_| unresolved())?;
    let fragment = percent_decode(joined.fragment().unwrap_or(""));
    let mut target = joined;
    target.set_fragment(None);
    Ok(ResolvedUri {
        uri: target.to_string(),
        fragment,
    })
}

fn compile_fragment(
    ctx: &EvalContext<'_>,
    resolved: &ResolvedUri,
    reference: &str,
) -> Result<Arc<Schema>, SchemaError> {
    let force = ctx.options().evaluate_as;
    let registry = ctx.registry();
    if resolved.fragment.is_empty() || resolved.fragment.starts_with('/') {
        return registry.compile_at(&resolved.uri, &resolved.fragment, force);
    }
    // Plain-name fragment: an anchor of the target resource.
    let unresolved = || SchemaError::UnresolvedReference {
        reference: reference.to_string(),
        base: ctx.current_base().to_string(),
    };
    let resource = registry.lookup(&resolved.uri).ok_or_else(unresolved)?;
    let pointer = resource
        .anchors
        .get(&resolved.fragment)
        .ok_or_else(unresolved)?
        .clone();
    registry.compile_at(&resource.uri, &pointer, force)
}

/// Resolves a `$ref` value to its target schema.
pub(crate) fn resolve_ref(
    ctx: &EvalContext<'_>,
    reference: &str,
) -> Result<Arc<Schema>, SchemaError> {
    let resolved = join_against_base(ctx, reference)?;
    compile_fragment(ctx, &resolved, reference)
}

/// Resolves a `$dynamicRef` value, consulting the dynamic scope when the
/// statically resolved target is a `$dynamicAnchor`.
pub(crate) fn resolve_dynamic_ref(
    ctx: &EvalContext<'_>,
    reference: &str,
) -> Result<Arc<Schema>, SchemaError> {
    let resolved = join_against_base(ctx, reference)?;
    let registry = ctx.registry();
    let force = ctx.options().evaluate_as;

    let is_plain_name = !resolved.fragment.is_empty() && !resolved.fragment.starts_with('/');
    if is_plain_name {
        let bootstraps = registry
            .lookup(&resolved.uri)
            .map(|r| r.dynamic_anchors.contains_key(&resolved.fragment))
            .unwrap_or(false);
        if bootstraps {
            for scope_uri in ctx.dynamic_scope() {
                if let Some(resource) = registry.lookup(&scope_uri) {
                    if let Some(pointer) = resource.dynamic_anchors.get(&resolved.fragment) {
                        return registry.compile_at(&resource.uri, pointer, force);
                    }
                }
            }
        }
    }
    compile_fragment(ctx, &resolved, reference)
}

/// Resolves `$recursiveRef: "#"` (2019-09): the current resource root, or,
/// when the whole recursive-anchor chain is in place, the outermost
/// dynamic-scope resource that sets `$recursiveAnchor: true`.
pub(crate) fn resolve_recursive_ref(ctx: &EvalContext<'_>) -> Result<Arc<Schema>, SchemaError> {
    let registry = ctx.registry();
    let force = ctx.options().evaluate_as;
    let current = ctx.current_base().to_string();

    let anchored = registry
        .lookup(&current)
        .map(|r| r.recursive_anchor)
        .unwrap_or(false);
    if anchored {
        for scope_uri in ctx.dynamic_scope() {
            if let Some(resource) = registry.lookup(&scope_uri) {
                if resource.recursive_anchor {
                    return registry.compile_at(&resource.uri, "", force);
                }
            }
        }
    }
    registry.compile_at(&current, "", force)
}

#[cfg(test)]
mod tests {
    use super::percent_decode;

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("/a%20b"), "/a b");
        assert_eq!(percent_decode("/a~1b"), "/a~1b");
        assert_eq!(percent_decode("plain"), "plain");
        assert_eq!(percent_decode("bad%zz"), "bad%zz");
    }
}
