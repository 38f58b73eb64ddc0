//! Cache Write-Back
//!
//! Persists a successful generation result through the storage
//! collaborator. The three cache fields travel together in one
//! `CacheUpdate`, and the update type has no way to express a change to
//! the manual language override.

use crate::entity::{CacheUpdate, EntityStore};
use crate::error::StorageError;
use crate::provider::GeneratedDescription;
use crate::types::EntityId;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

/// Commits generation results to the entity store.
pub struct CacheWriter {
    store: Arc<dyn EntityStore>,
}

impl CacheWriter {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Persist new content, its detected language, and the generation
    /// timestamp for one entity.
    pub async fn commit(
        &self,
        entity_id: &EntityId,
        description: &GeneratedDescription,
        generated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let update = CacheUpdate {
            cached_content: description.text.clone(),
            cached_language: description.detected_language.clone(),
            last_generated_at: generated_at,
        };

        self.store.update(entity_id, update).await?;
        debug!(
            entity_id = %entity_id,
            language = %description.detected_language,
            "Committed regenerated description"
        );
        Ok(())
    }
}
