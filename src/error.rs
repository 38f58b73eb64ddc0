//! Error types for the description regeneration engine.

use crate::types::EntityId;
use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    /// The storage collaborator itself is down. Repeated occurrences
    /// short-circuit the remainder of a batch.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Whether this error indicates the backend as a whole is unreachable,
    /// as opposed to a problem with a single record.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, StorageError::Unavailable(_))
    }
}

/// Engine-level errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Provider request failed: {0}")]
    ProviderRequestFailed(String),

    #[error("Provider authentication failed: {0}")]
    ProviderAuthFailed(String),

    #[error("Provider rate limit exceeded: {0}")]
    ProviderRateLimit(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Generation timed out after {0} seconds")]
    Timeout(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_is_infrastructure() {
        assert!(StorageError::Unavailable("db down".to_string()).is_infrastructure());
        assert!(!StorageError::EntityNotFound(EntityId::from("x")).is_infrastructure());
    }
}
