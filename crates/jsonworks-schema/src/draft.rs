//! JSON Schema draft identification and gating.

use crate::error::SchemaError;

/// A supported edition of the JSON Schema specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Draft {
    Draft6,
    Draft7,
    Draft2019_09,
    Draft2020_12,
    /// The rolling "next" draft.
    Next,
}

pub const DEFAULT_DRAFT: Draft = Draft::Draft2020_12;

const DRAFT4_URI: &str = "json-schema.org/draft-04/schema";

impl Draft {
    pub const ALL: [Draft; 5] = [
        Draft::Draft6,
        Draft::Draft7,
        Draft::Draft2019_09,
        Draft::Draft2020_12,
        Draft::Next,
    ];

    /// The canonical meta-schema URI for this draft.
    pub fn meta_schema_uri(&self) -> &'static str {
        match self {
            Draft::Draft6 => "http://json-schema.org/draft-06/schema",
            Draft::Draft7 => "http://json-schema.org/draft-07/schema",
            Draft::Draft2019_09 => "https://json-schema.org/draft/2019-09/schema",
            Draft::Draft2020_12 => "https://json-schema.org/draft/2020-12/schema",
            Draft::Next => "https://json-schema.org/draft/next/schema",
        }
    }

    /// Maps a `$schema` URI to a draft. Scheme and a trailing empty fragment
    /// are normalized away; draft 4 is recognized and rejected.
    pub fn from_meta_schema_uri(uri: &str) -> Result<Option<Draft>, SchemaError> {
        let trimmed = uri.trim_end_matches('#');
        let bare = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .unwrap_or(trimmed);
        if bare == DRAFT4_URI {
            return Err(SchemaError::UnknownMetaSchema(uri.to_string()));
        }
        for draft in Draft::ALL {
            let canonical = draft.meta_schema_uri();
            let canonical_bare = canonical
                .strip_prefix("https://")
                .or_else(|| canonical.strip_prefix("http://"))
                .unwrap_or(canonical);
            if bare == canonical_bare {
                return Ok(Some(draft));
            }
        }
        Ok(None)
    }

    /// Drafts before 2019-09 give `$ref` exclusive control of its schema
    /// object; siblings are ignored.
    pub fn ref_suppresses_siblings(&self) -> bool {
        *self <= Draft::Draft7
    }

    /// Whether meta-schemas of this draft declare `$vocabulary`.
    pub fn has_vocabularies(&self) -> bool {
        *self >= Draft::Draft2019_09
    }
}

/// A set of drafts a keyword is recognized in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftSet(u8);

const BIT_6: u8 = 1 << 0;
const BIT_7: u8 = 1 << 1;
const BIT_2019: u8 = 1 << 2;
const BIT_2020: u8 = 1 << 3;
const BIT_NEXT: u8 = 1 << 4;

impl DraftSet {
    pub const ALL: DraftSet = DraftSet(BIT_6 | BIT_7 | BIT_2019 | BIT_2020 | BIT_NEXT);
    pub const SINCE_7: DraftSet = DraftSet(BIT_7 | BIT_2019 | BIT_2020 | BIT_NEXT);
    pub const SINCE_2019: DraftSet = DraftSet(BIT_2019 | BIT_2020 | BIT_NEXT);
    pub const SINCE_2020: DraftSet = DraftSet(BIT_2020 | BIT_NEXT);
    pub const UNTIL_7: DraftSet = DraftSet(BIT_6 | BIT_7);
    pub const UNTIL_2019: DraftSet = DraftSet(BIT_6 | BIT_7 | BIT_2019);
    pub const ONLY_2019: DraftSet = DraftSet(BIT_2019);

    fn bit(draft: Draft) -> u8 {
        match draft {
            Draft::Draft6 => BIT_6,
            Draft::Draft7 => BIT_7,
            Draft::Draft2019_09 => BIT_2019,
            Draft::Draft2020_12 => BIT_2020,
            Draft::Next => BIT_NEXT,
        }
    }

    pub fn contains(&self, draft: Draft) -> bool {
        self.0 & Self::bit(draft) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_schema_uri_roundtrip() {
        for draft in Draft::ALL {
            assert_eq!(
                Draft::from_meta_schema_uri(draft.meta_schema_uri()).unwrap(),
                Some(draft)
            );
        }
    }

    #[test]
    fn test_trailing_fragment_and_scheme_normalized() {
        assert_eq!(
            Draft::from_meta_schema_uri("http://json-schema.org/draft-07/schema#").unwrap(),
            Some(Draft::Draft7)
        );
        assert_eq!(
            Draft::from_meta_schema_uri("https://json-schema.org/draft-07/schema").unwrap(),
            Some(Draft::Draft7)
        );
    }

    #[test]
    fn test_draft4_rejected() {
        assert!(Draft::from_meta_schema_uri("http://json-schema.org/draft-04/schema#").is_err());
    }

    #[test]
    fn test_unknown_is_none() {
        assert_eq!(
            Draft::from_meta_schema_uri("https://example.com/my-meta").unwrap(),
            None
        );
    }

    #[test]
    fn test_draft_set_gating() {
        assert!(DraftSet::SINCE_2020.contains(Draft::Next));
        assert!(!DraftSet::SINCE_2020.contains(Draft::Draft2019_09));
        assert!(DraftSet::UNTIL_2019.contains(Draft::Draft6));
        assert!(!DraftSet::UNTIL_2019.contains(Draft::Draft2020_12));
        assert!(DraftSet::ONLY_2019.contains(Draft::Draft2019_09));
        assert!(!DraftSet::ONLY_2019.contains(Draft::Draft7));
    }
}
