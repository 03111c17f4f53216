use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by storage adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sea-orm.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// The record to update or look up does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    /// Anything else an adapter wants to report (used by test doubles).
    #[error("Storage error: {0}")]
    Other(String),
}

impl StoreError {
    pub fn issue_not_found(id: Uuid) -> Self {
        Self::NotFound { entity: "issue", id }
    }

    pub fn connection_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: "repository connection",
            id,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
