use thiserror::Error;
use uuid::Uuid;

use crate::credentials::CredentialError;
use crate::provider::{ProviderError, short_error_message};
use crate::store::StoreError;

/// Errors that end a sync run or reject a request to start one.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Repository connection not found: {0}")]
    ConnectionNotFound(Uuid),

    #[error("Failed to decrypt access token: {0}")]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("A sync is already running for connection {connection_id} (operation {operation_id})")]
    AlreadyRunning {
        connection_id: Uuid,
        operation_id: Uuid,
    },

    #[error("Sync operation not found: {0}")]
    OperationNotFound(Uuid),
}

impl SyncError {
    /// Whether the run ended because rate-limit retries ran out.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SyncError::Provider(e) if e.is_rate_limited())
    }

    /// Message suitable for an operation record or a progress line.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            SyncError::Provider(e) if e.is_rate_limited() => format!(
                "Rate limit exceeded and retries exhausted: {}",
                short_error_message(e)
            ),
            SyncError::Provider(e) => short_error_message(e),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
