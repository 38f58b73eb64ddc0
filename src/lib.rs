//! Descgen: Catalog Description Regeneration Engine
//!
//! Maintains AI-generated product descriptions attached to catalog
//! entities and decides, per entity or batch, whether cached content may
//! be reused or must be regenerated. Covers override resolution, staleness
//! evaluation, cost-budget enforcement, batch orchestration with per-item
//! isolation, and cache write-back. Transport, authentication and UI live
//! with the embedding application.

pub mod batch;
pub mod config;
pub mod cost;
pub mod entity;
pub mod error;
pub mod language;
pub mod logging;
pub mod provider;
pub mod staleness;
pub mod types;
pub mod writer;

pub use batch::{BatchHandle, BatchReport, ItemOutcome, RegenerationEngine, RegenerationRequest};
pub use config::{DescgenConfig, EngineConfig, ProviderConfig};
pub use entity::{CacheUpdate, Entity, EntityStore, MemoryEntityStore, SledEntityStore};
pub use error::{EngineError, StorageError};
pub use provider::{DescriptionGenerator, GeneratedDescription, OpenAiGenerator};
pub use staleness::{RegenerationDecision, Scenario, SkipReason};
pub use types::{EntityId, LanguageTag};
