//! Staleness Evaluation
//!
//! Decides, for a single entity and a requested scenario, whether cached
//! content may be reused or must be regenerated. Pure functions only; all
//! I/O stays in the orchestrator so decisions are testable against literal
//! fixtures.

use crate::entity::Entity;
use crate::types::LanguageTag;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-selected regeneration policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// Regenerate anything absent, language-mismatched, or older than the
    /// staleness window.
    RegenerateAll,
    /// Regenerate unconditionally. Still subject to the cost guard; force
    /// bypasses staleness checks, not budgets.
    Force,
    /// Regenerate only entities with no cached content.
    #[default]
    MissingOnly,
}

/// Why an entity was skipped rather than reused or regenerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    CostLimit,
    GenerationFailed,
    PersistFailed,
    Infrastructure,
    Cancelled,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::CostLimit => "cost_limit",
            SkipReason::GenerationFailed => "generation_failed",
            SkipReason::PersistFailed => "persist_failed",
            SkipReason::Infrastructure => "infrastructure",
            SkipReason::Cancelled => "cancelled",
        }
    }

    /// Skips caused by a per-entity failure count as failures in the
    /// aggregate report; admission-control skips do not.
    pub fn is_failure(&self) -> bool {
        matches!(self, SkipReason::GenerationFailed | SkipReason::PersistFailed)
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-entity outcome of the eligibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegenerationDecision {
    Reuse,
    Regenerate,
    Skipped(SkipReason),
}

impl RegenerationDecision {
    pub fn is_reuse(&self) -> bool {
        matches!(self, RegenerationDecision::Reuse)
    }

    pub fn is_regenerate(&self) -> bool {
        matches!(self, RegenerationDecision::Regenerate)
    }
}

/// Decide reuse vs regenerate for one entity.
///
/// A present manual override that disagrees with the cached language forces
/// regeneration under every scenario: content served in the wrong language
/// is incorrect, not merely stale.
pub fn decide(
    entity: &Entity,
    scenario: Scenario,
    effective_language: &LanguageTag,
    staleness_window: Duration,
    now: DateTime<Utc>,
) -> RegenerationDecision {
    if entity.manual_language_override.is_some()
        && !effective_language.matches(entity.cached_language.as_deref())
    {
        return RegenerationDecision::Regenerate;
    }

    match scenario {
        Scenario::Force => RegenerationDecision::Regenerate,
        Scenario::MissingOnly => {
            if entity.has_cached_content() {
                RegenerationDecision::Reuse
            } else {
                RegenerationDecision::Regenerate
            }
        }
        Scenario::RegenerateAll => {
            if !entity.has_cached_content() {
                return RegenerationDecision::Regenerate;
            }
            if !effective_language.matches(entity.cached_language.as_deref()) {
                return RegenerationDecision::Regenerate;
            }
            match entity.last_generated_at {
                Some(generated_at) if now - generated_at <= staleness_window => {
                    RegenerationDecision::Reuse
                }
                // Content without a timestamp violates the pairing invariant;
                // treat it as stale rather than trusting it.
                _ => RegenerationDecision::Regenerate,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::resolve_language;
    use crate::types::EntityId;

    fn window() -> Duration {
        Duration::hours(24)
    }

    fn fresh_entity() -> Entity {
        Entity {
            id: EntityId::from("1"),
            name: "Product".to_string(),
            cached_content: Some("copy".to_string()),
            cached_language: Some("ro".to_string()),
            manual_language_override: Some("ro".to_string()),
            last_generated_at: Some(Utc::now()),
        }
    }

    #[test]
    fn missing_content_regenerates_under_every_scenario() {
        let entity = Entity::new("1", "Product");
        let lang = resolve_language(&entity);
        for scenario in [Scenario::RegenerateAll, Scenario::Force, Scenario::MissingOnly] {
            assert!(
                decide(&entity, scenario, &lang, window(), Utc::now()).is_regenerate(),
                "scenario {:?} should regenerate missing content",
                scenario
            );
        }
    }

    #[test]
    fn fresh_cache_with_matching_override_reuses_under_regenerate_all() {
        let entity = fresh_entity();
        let lang = resolve_language(&entity);
        let decision = decide(&entity, Scenario::RegenerateAll, &lang, window(), Utc::now());
        assert_eq!(decision, RegenerationDecision::Reuse);
    }

    #[test]
    fn override_mismatch_regenerates_under_every_scenario() {
        let entity = Entity {
            cached_language: Some("en".to_string()),
            manual_language_override: Some("ro".to_string()),
            ..fresh_entity()
        };
        let lang = resolve_language(&entity);
        for scenario in [Scenario::RegenerateAll, Scenario::Force, Scenario::MissingOnly] {
            assert!(
                decide(&entity, scenario, &lang, window(), Utc::now()).is_regenerate(),
                "scenario {:?} must not reuse wrong-language content",
                scenario
            );
        }
    }

    #[test]
    fn force_regenerates_fresh_cache() {
        let entity = fresh_entity();
        let lang = resolve_language(&entity);
        let decision = decide(&entity, Scenario::Force, &lang, window(), Utc::now());
        assert_eq!(decision, RegenerationDecision::Regenerate);
    }

    #[test]
    fn stale_timestamp_regenerates_under_regenerate_all() {
        let entity = Entity {
            last_generated_at: Some(Utc::now() - Duration::hours(48)),
            ..fresh_entity()
        };
        let lang = resolve_language(&entity);
        let decision = decide(&entity, Scenario::RegenerateAll, &lang, window(), Utc::now());
        assert_eq!(decision, RegenerationDecision::Regenerate);
    }

    #[test]
    fn stale_timestamp_still_reuses_under_missing_only() {
        let entity = Entity {
            last_generated_at: Some(Utc::now() - Duration::hours(48)),
            ..fresh_entity()
        };
        let lang = resolve_language(&entity);
        let decision = decide(&entity, Scenario::MissingOnly, &lang, window(), Utc::now());
        assert_eq!(decision, RegenerationDecision::Reuse);
    }

    #[test]
    fn content_without_timestamp_is_treated_as_stale() {
        let entity = Entity {
            last_generated_at: None,
            ..fresh_entity()
        };
        let lang = resolve_language(&entity);
        let decision = decide(&entity, Scenario::RegenerateAll, &lang, window(), Utc::now());
        assert_eq!(decision, RegenerationDecision::Regenerate);
    }

    #[test]
    fn no_language_data_reuses_fresh_content_under_regenerate_all() {
        let entity = Entity {
            cached_language: None,
            manual_language_override: None,
            ..fresh_entity()
        };
        let lang = resolve_language(&entity);
        assert!(lang.is_unset());
        let decision = decide(&entity, Scenario::RegenerateAll, &lang, window(), Utc::now());
        assert_eq!(decision, RegenerationDecision::Reuse);
    }

    #[test]
    fn skip_reason_string_forms_are_stable() {
        assert_eq!(SkipReason::CostLimit.as_str(), "cost_limit");
        assert_eq!(SkipReason::PersistFailed.as_str(), "persist_failed");
        assert_eq!(SkipReason::Infrastructure.as_str(), "infrastructure");
    }
}
