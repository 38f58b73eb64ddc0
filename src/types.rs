//! Shared identifier and language types used across the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque entity identifier, assigned by the external catalog.
///
/// The engine never parses or interprets it; it is only used as a storage
/// key and for addressing outcomes in a batch report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        EntityId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        EntityId(id.to_string())
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        EntityId(id.to_string())
    }
}

/// Effective target language for generation.
///
/// `Unset` is a valid, non-error outcome meaning "let the generator decide".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LanguageTag {
    /// A concrete BCP-47 style tag, e.g. `"ro"` or `"en-US"`.
    Tag(String),
    /// No language preference is known for the entity.
    Unset,
}

impl LanguageTag {
    pub fn tag(value: impl Into<String>) -> Self {
        LanguageTag::Tag(value.into())
    }

    /// The concrete tag, if one is set.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            LanguageTag::Tag(value) => Some(value),
            LanguageTag::Unset => None,
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, LanguageTag::Unset)
    }

    /// Whether this tag names the same language as an optional stored tag.
    ///
    /// `Unset` matches anything: with no preference there is nothing to
    /// disagree with.
    pub fn matches(&self, stored: Option<&str>) -> bool {
        match self {
            LanguageTag::Unset => true,
            LanguageTag::Tag(value) => stored == Some(value.as_str()),
        }
    }
}

impl From<Option<&str>> for LanguageTag {
    fn from(value: Option<&str>) -> Self {
        match value {
            Some(tag) => LanguageTag::Tag(tag.to_string()),
            None => LanguageTag::Unset,
        }
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LanguageTag::Tag(value) => f.write_str(value),
            LanguageTag::Unset => f.write_str("unset"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_tag_matches_stored_value() {
        let tag = LanguageTag::tag("ro");
        assert!(tag.matches(Some("ro")));
        assert!(!tag.matches(Some("en")));
        assert!(!tag.matches(None));
    }

    #[test]
    fn unset_language_matches_anything() {
        assert!(LanguageTag::Unset.matches(Some("en")));
        assert!(LanguageTag::Unset.matches(None));
    }

    #[test]
    fn entity_id_display_is_raw_value() {
        assert_eq!(EntityId::from(584).to_string(), "584");
        assert_eq!(EntityId::new("sku-99").as_str(), "sku-99");
    }
}
