//! Override Resolution
//!
//! Determines the effective target language for an entity. A human-set
//! override wins unconditionally over whatever language the generator
//! detected last time; with neither present the generator decides.

use crate::entity::Entity;
use crate::types::LanguageTag;

/// Resolve the effective target language for an entity.
///
/// Pure and infallible: absence of language data is a valid outcome
/// (`LanguageTag::Unset`), not an error.
pub fn resolve_language(entity: &Entity) -> LanguageTag {
    entity
        .manual_language_override
        .as_deref()
        .or(entity.cached_language.as_deref())
        .map(LanguageTag::tag)
        .unwrap_or(LanguageTag::Unset)
}
