//! Error types for the entity loading pipeline.

use crate::entity::Entity;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error types for load, count, and transaction operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Underlying persistence call failed.
    #[error("database error: {0}")]
    Database(String),

    /// Transaction begin, commit, or rollback failed.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// A requested identifier had no corresponding loaded entity.
    #[error("cannot load entity '{entity}' with id {id}: missing or access denied")]
    EntityAccess { entity: &'static str, id: String },
}

impl StoreError {
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction(message.into())
    }

    pub fn entity_access<E: Entity>(id: &E::Id) -> Self {
        Self::EntityAccess {
            entity: E::entity_name(),
            id: format!("{:?}", id),
        }
    }

    /// Whether this is the one failure the list-load surface propagates.
    pub fn is_entity_access(&self) -> bool {
        matches!(self, Self::EntityAccess { .. })
    }
}
