//! Vocabularies: named keyword groups enabled by a meta-schema.

use serde_json::Value;
use std::collections::BTreeMap;

/// The vocabularies known to the engine.
///
/// The 2019-09 single `format` vocabulary maps to `FormatAnnotation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vocabulary {
    Core,
    Applicator,
    Validation,
    Unevaluated,
    FormatAnnotation,
    FormatAssertion,
    Content,
    MetaData,
}

impl Vocabulary {
    /// Recognizes a vocabulary URI of any supported draft by its last path
    /// segment, e.g. `https://json-schema.org/draft/2020-12/vocab/applicator`.
    pub fn from_uri(uri: &str) -> Option<Vocabulary> {
        let segment = uri.rsplit('/').next()?;
        match segment {
            "core" => Some(Vocabulary::Core),
            "applicator" => Some(Vocabulary::Applicator),
            "validation" => Some(Vocabulary::Validation),
            "unevaluated" => Some(Vocabulary::Unevaluated),
            "format" | "format-annotation" => Some(Vocabulary::FormatAnnotation),
            "format-assertion" => Some(Vocabulary::FormatAssertion),
            "content" => Some(Vocabulary::Content),
            "meta-data" => Some(Vocabulary::MetaData),
            _ => None,
        }
    }

    fn bit(&self) -> u8 {
        match self {
            Vocabulary::Core => 1 << 0,
            Vocabulary::Applicator => 1 << 1,
            Vocabulary::Validation => 1 << 2,
            Vocabulary::Unevaluated => 1 << 3,
            Vocabulary::FormatAnnotation => 1 << 4,
            Vocabulary::FormatAssertion => 1 << 5,
            Vocabulary::Content => 1 << 6,
            Vocabulary::MetaData => 1 << 7,
        }
    }
}

/// The set of vocabularies active for one schema object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VocabularySet(u8);

impl VocabularySet {
    /// Everything except `FormatAssertion`, which only activates when a
    /// meta-schema declares it. This is the set for drafts without
    /// `$vocabulary` and for meta-schemas that declare none.
    pub const DEFAULT: VocabularySet = VocabularySet(0xFF & !(1 << 5));

    pub fn contains(&self, vocabulary: Vocabulary) -> bool {
        self.0 & vocabulary.bit() != 0
    }

    /// Builds the active set from a meta-schema's `$vocabulary` object.
    ///
    /// Core is always active. Unrecognized vocabulary URIs are ignored; the
    /// engine has no keywords for them anyway.
    pub fn from_meta(vocabulary: &BTreeMap<String, Value>) -> VocabularySet {
        let mut set = VocabularySet(Vocabulary::Core.bit());
        for uri in vocabulary.keys() {
            if let Some(v) = Vocabulary::from_uri(uri) {
                set.0 |= v.bit();
            }
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_uri() {
        assert_eq!(
            Vocabulary::from_uri("https://json-schema.org/draft/2020-12/vocab/unevaluated"),
            Some(Vocabulary::Unevaluated)
        );
        assert_eq!(
            Vocabulary::from_uri("https://json-schema.org/draft/2019-09/vocab/format"),
            Some(Vocabulary::FormatAnnotation)
        );
        assert_eq!(Vocabulary::from_uri("https://example.com/vocab/custom"), None);
    }

    #[test]
    fn test_default_set_excludes_format_assertion() {
        assert!(VocabularySet::DEFAULT.contains(Vocabulary::Validation));
        assert!(!VocabularySet::DEFAULT.contains(Vocabulary::FormatAssertion));
    }

    #[test]
    fn test_from_meta() {
        let mut meta = BTreeMap::new();
        meta.insert(
            "https://json-schema.org/draft/2020-12/vocab/validation".to_string(),
            json!(true),
        );
        let set = VocabularySet::from_meta(&meta);
        assert!(set.contains(Vocabulary::Core));
        assert!(set.contains(Vocabulary::Validation));
        assert!(!set.contains(Vocabulary::Applicator));
    }
}
