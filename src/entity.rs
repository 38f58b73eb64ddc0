//! Entity Records and Storage
//!
//! Entities are long-lived catalog records owned by the storage
//! collaborator. The engine reads them and conditionally updates the three
//! cache fields; everything else on the record is opaque to it.

use crate::error::StorageError;
use crate::types::EntityId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// A catalog entity carrying cached AI-generated content.
///
/// Invariant: `cached_content` and `last_generated_at` are set together or
/// both `None`. `manual_language_override` is human-owned and read-only to
/// the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub cached_content: Option<String>,
    pub cached_language: Option<String>,
    pub manual_language_override: Option<String>,
    pub last_generated_at: Option<DateTime<Utc>>,
}

impl Entity {
    /// A bare entity with no cached content.
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            cached_content: None,
            cached_language: None,
            manual_language_override: None,
            last_generated_at: None,
        }
    }

    pub fn has_cached_content(&self) -> bool {
        self.cached_content.is_some()
    }
}

/// Replacement values for the three engine-owned cache fields.
///
/// There is deliberately no field for the manual override here; the type
/// makes it impossible for a cache commit to touch it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheUpdate {
    pub cached_content: String,
    pub cached_language: String,
    pub last_generated_at: DateTime<Utc>,
}

/// Entity persistence interface
///
/// `update` must apply all three cache fields atomically with respect to
/// the entity: a concurrent reader sees either the old record or the new
/// one, never a mix.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn get(&self, id: &EntityId) -> Result<Entity, StorageError>;
    async fn update(&self, id: &EntityId, update: CacheUpdate) -> Result<(), StorageError>;
}

/// In-memory entity store for tests and embedding scenarios.
#[derive(Default)]
pub struct MemoryEntityStore {
    entities: RwLock<HashMap<EntityId, Entity>>,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, entity: Entity) {
        self.entities.write().insert(entity.id.clone(), entity);
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn get(&self, id: &EntityId) -> Result<Entity, StorageError> {
        self.entities
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::EntityNotFound(id.clone()))
    }

    async fn update(&self, id: &EntityId, update: CacheUpdate) -> Result<(), StorageError> {
        let mut entities = self.entities.write();
        let entity = entities
            .get_mut(id)
            .ok_or_else(|| StorageError::EntityNotFound(id.clone()))?;
        entity.cached_content = Some(update.cached_content);
        entity.cached_language = Some(update.cached_language);
        entity.last_generated_at = Some(update.last_generated_at);
        Ok(())
    }
}

/// Sled-based entity store
///
/// Records are bincode-encoded and keyed by the entity id bytes. Each
/// update rewrites the whole record with a single insert, which gives the
/// per-entity all-or-nothing visibility the cache writer requires.
pub struct SledEntityStore {
    db: sled::Db,
}

impl SledEntityStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)
            .map_err(|e| StorageError::Backend(format!("Failed to open sled database: {}", e)))?;
        Ok(Self { db })
    }

    pub fn put(&self, entity: &Entity) -> Result<(), StorageError> {
        let value = bincode::serialize(entity)
            .map_err(|e| StorageError::Serialization(format!("Failed to encode entity: {}", e)))?;
        self.db
            .insert(entity.id.as_str().as_bytes(), value)
            .map_err(map_sled_error)?;
        Ok(())
    }

    fn fetch(&self, id: &EntityId) -> Result<Entity, StorageError> {
        match self.db.get(id.as_str().as_bytes()).map_err(map_sled_error)? {
            Some(value) => bincode::deserialize(&value)
                .map_err(|e| StorageError::Serialization(format!("Failed to decode entity: {}", e))),
            None => Err(StorageError::EntityNotFound(id.clone())),
        }
    }
}

fn map_sled_error(error: sled::Error) -> StorageError {
    match error {
        sled::Error::Io(e) => StorageError::Unavailable(format!("sled I/O failure: {}", e)),
        other => StorageError::Backend(format!("sled error: {}", other)),
    }
}

#[async_trait]
impl EntityStore for SledEntityStore {
    async fn get(&self, id: &EntityId) -> Result<Entity, StorageError> {
        self.fetch(id)
    }

    async fn update(&self, id: &EntityId, update: CacheUpdate) -> Result<(), StorageError> {
        let mut entity = self.fetch(id)?;
        entity.cached_content = Some(update.cached_content);
        entity.cached_language = Some(update.cached_language);
        entity.last_generated_at = Some(update.last_generated_at);
        self.put(&entity)
    }
}
