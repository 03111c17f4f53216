//! Lifecycle records for asynchronous sync runs.
//!
//! [`InMemoryOperationStore`] keeps records in process memory only: they are
//! lost on restart and invisible to other instances. Deployments with more
//! than one instance need a durable implementation of [`OperationStore`].

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::store::Result;

use super::types::{SyncOptions, SyncProgress, SyncResults, SyncType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl OperationStatus {
    /// Pending or in progress.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, OperationStatus::Pending | OperationStatus::InProgress)
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            OperationStatus::Pending => "pending",
            OperationStatus::InProgress => "inProgress",
            OperationStatus::Completed => "completed",
            OperationStatus::Failed => "failed",
        })
    }
}

/// One sync run as seen by pollers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOperation {
    pub id: Uuid,
    pub connection_id: Uuid,
    pub user_id: Uuid,
    pub status: OperationStatus,
    pub sync_type: SyncType,
    pub include_closed: bool,
    pub progress: Option<SyncProgress>,
    pub results: Option<SyncResults>,
    pub error: Option<String>,
    /// The run stopped early because it was aborted.
    pub cancelled: bool,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub cancel: CancellationToken,
}

impl SyncOperation {
    /// A fresh `pending` record.
    pub fn new(connection_id: Uuid, user_id: Uuid, options: &SyncOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            connection_id,
            user_id,
            status: OperationStatus::Pending,
            sync_type: options.sync_type,
            include_closed: options.include_closed,
            progress: None,
            results: None,
            error: None,
            cancelled: false,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            cancel: CancellationToken::new(),
        }
    }

    fn apply(&mut self, update: OperationUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(progress) = update.progress {
            self.progress = Some(progress);
        }
        if let Some(results) = update.results {
            self.results = Some(results);
        }
        if let Some(error) = update.error {
            self.error = Some(error);
        }
        if let Some(cancelled) = update.cancelled {
            self.cancelled = cancelled;
        }
        if let Some(started_at) = update.started_at {
            self.started_at = Some(started_at);
        }
        if let Some(completed_at) = update.completed_at {
            self.completed_at = Some(completed_at);
        }
    }

    /// Time used for retention: completion, or creation if it never completed.
    fn age_reference(&self) -> DateTime<Utc> {
        self.completed_at.unwrap_or(self.created_at)
    }
}

/// Partial update merged into a stored [`SyncOperation`].
#[derive(Debug, Clone, Default)]
pub struct OperationUpdate {
    pub status: Option<OperationStatus>,
    pub progress: Option<SyncProgress>,
    pub results: Option<SyncResults>,
    pub error: Option<String>,
    pub cancelled: Option<bool>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl OperationUpdate {
    pub fn started(at: DateTime<Utc>) -> Self {
        Self {
            status: Some(OperationStatus::InProgress),
            started_at: Some(at),
            ..Self::default()
        }
    }

    pub fn progress(progress: SyncProgress) -> Self {
        Self {
            progress: Some(progress),
            ..Self::default()
        }
    }

    pub fn completed(results: SyncResults, cancelled: bool, at: DateTime<Utc>) -> Self {
        Self {
            status: Some(OperationStatus::Completed),
            results: Some(results),
            cancelled: Some(cancelled),
            completed_at: Some(at),
            ..Self::default()
        }
    }

    pub fn failed(error: String, results: SyncResults, at: DateTime<Utc>) -> Self {
        Self {
            status: Some(OperationStatus::Failed),
            results: Some(results),
            error: Some(error),
            completed_at: Some(at),
            ..Self::default()
        }
    }
}

/// Registry of sync operations.
#[async_trait]
pub trait OperationStore: Send + Sync {
    async fn create(&self, operation: SyncOperation) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<SyncOperation>>;

    /// Merge `update` into the record; `None` when there is no such record.
    async fn update(&self, id: Uuid, update: OperationUpdate) -> Result<Option<SyncOperation>>;

    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// A pending or in-progress operation for the connection, if any.
    async fn find_active_by_repository(&self, connection_id: Uuid)
    -> Result<Option<SyncOperation>>;

    /// Remove terminal operations older than `older_than_hours`. Returns how many went.
    async fn cleanup(&self, older_than_hours: u64) -> Result<usize>;
}

/// Map-backed [`OperationStore`].
#[derive(Debug, Default)]
pub struct InMemoryOperationStore {
    operations: RwLock<HashMap<Uuid, SyncOperation>>,
}

impl InMemoryOperationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.operations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.operations.read().await.is_empty()
    }
}

#[async_trait]
impl OperationStore for InMemoryOperationStore {
    async fn create(&self, operation: SyncOperation) -> Result<()> {
        self.operations
            .write()
            .await
            .insert(operation.id, operation);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<SyncOperation>> {
        Ok(self.operations.read().await.get(&id).cloned())
    }

    async fn update(&self, id: Uuid, update: OperationUpdate) -> Result<Option<SyncOperation>> {
        let mut operations = self.operations.write().await;
        Ok(operations.get_mut(&id).map(|op| {
            op.apply(update);
            op.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.operations.write().await.remove(&id).is_some())
    }

    async fn find_active_by_repository(
        &self,
        connection_id: Uuid,
    ) -> Result<Option<SyncOperation>> {
        let operations = self.operations.read().await;
        Ok(operations
            .values()
            .find(|op| op.connection_id == connection_id && op.status.is_active())
            .cloned())
    }

    async fn cleanup(&self, older_than_hours: u64) -> Result<usize> {
        let hours = i64::try_from(older_than_hours).unwrap_or(i64::MAX);
        let cutoff = Duration::try_hours(hours)
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut operations = self.operations.write().await;
        let before = operations.len();
        operations.retain(|_, op| op.status.is_active() || op.age_reference() >= cutoff);
        Ok(before - operations.len())
    }
}
