//! JSON Pointer (RFC 6901) string helpers.
//!
//! The evaluator tracks instance locations and evaluation paths as pointer
//! strings; these helpers keep the `~0`/`~1` escaping in one place.

/// Escapes a single reference token (`~` → `~0`, `/` → `~1`).
pub fn escape(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Unescapes a single reference token (`~1` → `/`, `~0` → `~`).
pub fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Appends a (raw, unescaped) token to a pointer string.
pub fn append(pointer: &str, token: &str) -> String {
    format!("{}/{}", pointer, escape(token))
}

/// Appends an array index to a pointer string.
pub fn append_index(pointer: &str, index: usize) -> String {
    format!("{}/{}", pointer, index)
}

/// Splits a pointer string into unescaped tokens. `""` is the root pointer.
///
/// Returns `None` when the pointer is non-empty but does not start with `/`.
pub fn split(pointer: &str) -> Option<Vec<String>> {
    if pointer.is_empty() {
        return Some(Vec::new());
    }
    let rest = pointer.strip_prefix('/')?;
    Some(rest.split('/').map(unescape).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_roundtrip() {
        assert_eq!(escape("a~b/c"), "a~0b~1c");
        assert_eq!(unescape("a~0b~1c"), "a~b/c");
        assert_eq!(unescape(&escape("~~//")), "~~//");
    }

    #[test]
    fn test_append() {
        assert_eq!(append("", "foo"), "/foo");
        assert_eq!(append("/foo", "a/b"), "/foo/a~1b");
        assert_eq!(append_index("/foo", 3), "/foo/3");
    }

    #[test]
    fn test_split() {
        assert_eq!(split(""), Some(vec![]));
        assert_eq!(split("/"), Some(vec!["".to_string()]));
        assert_eq!(
            split("/foo/a~1b"),
            Some(vec!["foo".to_string(), "a/b".to_string()])
        );
        assert_eq!(split("foo"), None);
    }
}
