//! Asynchronous front door to the sync engine.
//!
//! [`SyncService`] owns the operation registry. `start_sync` records a
//! `pending` operation, spawns the run on the tokio runtime and returns the
//! operation id; pollers read progress and results back through
//! `get_sync_status`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::entity::issue::Model as Issue;

use super::context::SyncContext;
use super::engine::{RunControl, sync_repository_issues};
use super::errors::{Result, SyncError};
use super::link::{LinkError, LinkRequest, link_issue};
use super::operation::{InMemoryOperationStore, OperationStore, OperationUpdate, SyncOperation};
use super::progress::{EventSender, SyncEvent, event_channel};
use super::types::SyncOptions;

/// Terminal operations older than this are reaped.
pub const DEFAULT_RETENTION_HOURS: u64 = 24;

/// How often the reaper runs.
pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Clone)]
pub struct SyncService {
    ctx: SyncContext,
    operations: Arc<dyn OperationStore>,
    /// Serializes the active-check and create of `start_sync`.
    start_lock: Arc<Mutex<()>>,
}

impl SyncService {
    pub fn new(ctx: SyncContext, operations: Arc<dyn OperationStore>) -> Self {
        Self {
            ctx,
            operations,
            start_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Service with a process-local operation registry.
    pub fn with_memory_store(ctx: SyncContext) -> Self {
        Self::new(ctx, Arc::new(InMemoryOperationStore::new()))
    }

    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    pub fn operations(&self) -> &Arc<dyn OperationStore> {
        &self.operations
    }

    /// Start a run in the background and return its operation id.
    ///
    /// # Errors
    /// `SyncError::AlreadyRunning` when the connection has a pending or
    /// running operation; `SyncError::ConnectionNotFound` for unknown ids.
    pub async fn start_sync(
        &self,
        connection_id: Uuid,
        user_id: Uuid,
        options: SyncOptions,
    ) -> Result<Uuid> {
        self.start(connection_id, user_id, options, None).await
    }

    /// Like [`Self::start_sync`], additionally forwarding every event to `observer`.
    pub async fn start_sync_observed(
        &self,
        connection_id: Uuid,
        user_id: Uuid,
        options: SyncOptions,
        observer: EventSender,
    ) -> Result<Uuid> {
        self.start(connection_id, user_id, options, Some(observer))
            .await
    }

    async fn start(
        &self,
        connection_id: Uuid,
        user_id: Uuid,
        options: SyncOptions,
        observer: Option<EventSender>,
    ) -> Result<Uuid> {
        let operation = {
            let _guard = self.start_lock.lock().await;

            if let Some(active) = self
                .operations
                .find_active_by_repository(connection_id)
                .await?
            {
                return Err(SyncError::AlreadyRunning {
                    connection_id,
                    operation_id: active.id,
                });
            }
            if self
                .ctx
                .connections()
                .find_connection(connection_id)
                .await?
                .is_none()
            {
                return Err(SyncError::ConnectionNotFound(connection_id));
            }

            let operation = SyncOperation::new(connection_id, user_id, &options);
            self.operations.create(operation.clone()).await?;
            operation
        };

        let operation_id = operation.id;
        info!(%operation_id, %connection_id, sync_type = %options.sync_type, "Sync queued");

        tokio::spawn(run_operation(
            self.ctx.clone(),
            Arc::clone(&self.operations),
            operation,
            options,
            observer,
        ));

        Ok(operation_id)
    }

    /// Snapshot of an operation.
    pub async fn get_sync_status(&self, operation_id: Uuid) -> Result<SyncOperation> {
        self.operations
            .get(operation_id)
            .await?
            .ok_or(SyncError::OperationNotFound(operation_id))
    }

    /// Signal cancellation. The run keeps what it has imported so far and
    /// finishes as `completed` with `cancelled` set.
    pub async fn abort_sync(&self, operation_id: Uuid) -> Result<SyncOperation> {
        let operation = self.get_sync_status(operation_id).await?;
        if operation.status.is_active() {
            info!(%operation_id, "Aborting sync");
            operation.cancel.cancel();
        } else {
            debug!(%operation_id, status = %operation.status, "Abort of finished sync ignored");
        }
        Ok(operation)
    }

    /// Bind a local issue to a provider issue.
    pub async fn link_issue(
        &self,
        issue_id: Uuid,
        request: &LinkRequest,
    ) -> std::result::Result<Issue, LinkError> {
        link_issue(&self.ctx, issue_id, request).await
    }

    /// Periodically drop terminal operations older than `retention_hours`.
    ///
    /// Runs until `shutdown` is cancelled.
    pub fn spawn_reaper(
        &self,
        retention_hours: u64,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let operations = Arc::clone(&self.operations);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => match operations.cleanup(retention_hours).await {
                        Ok(0) => {}
                        Ok(removed) => info!(removed, "Reaped finished sync operations"),
                        Err(e) => warn!(error = %e, "Failed to reap sync operations"),
                    },
                }
            }
        })
    }
}

async fn run_operation(
    ctx: SyncContext,
    operations: Arc<dyn OperationStore>,
    operation: SyncOperation,
    options: SyncOptions,
    observer: Option<EventSender>,
) {
    let operation_id = operation.id;
    update(&*operations, operation_id, OperationUpdate::started(Utc::now())).await;

    let (tx, mut rx) = event_channel();
    let forward_to = Arc::clone(&operations);
    let forwarder = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let SyncEvent::Progress(progress) = &event {
                update(&*forward_to, operation_id, OperationUpdate::progress(*progress)).await;
            }
            if let Some(observer) = &observer {
                let _ = observer.send(event);
            }
        }
    });

    let run = RunControl::new(operation.cancel.clone())
        .with_events(tx)
        .with_operation_id(operation_id);
    let outcome = sync_repository_issues(
        &ctx,
        operation.connection_id,
        operation.user_id,
        &options,
        run,
    )
    .await;

    // All senders are gone once the run returns; drain remaining progress first.
    if let Err(e) = forwarder.await {
        warn!(%operation_id, error = %e, "Progress forwarder panicked");
    }

    let now = Utc::now();
    let final_update = match outcome.error {
        Some(error) => OperationUpdate::failed(error.user_message(), outcome.results, now),
        None => OperationUpdate::completed(outcome.results, outcome.cancelled, now),
    };
    update(&*operations, operation_id, final_update).await;
}

async fn update(operations: &dyn OperationStore, operation_id: Uuid, update: OperationUpdate) {
    match operations.update(operation_id, update).await {
        Ok(Some(_)) => {}
        Ok(None) => debug!(%operation_id, "Operation vanished before update"),
        Err(e) => warn!(%operation_id, error = %e, "Failed to update sync operation"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::credentials::PlaintextCipher;
    use crate::entity::provider_type::ProviderType;
    use crate::http::MockTransport;
    use crate::provider::HttpProviderFactory;
    use crate::store::{MemoryConnectionStore, MemoryIssueStore, NewConnection};
    use crate::sync::operation::OperationStatus;
    use crate::sync::types::SyncType;

    const API: &str = "https://api.github.com/repos/acme/widgets";

    async fn service(transport: &MockTransport) -> (SyncService, Uuid) {
        let connections = Arc::new(MemoryConnectionStore::new());
        let connection = connections
            .insert(NewConnection {
                project_id: Uuid::new_v4(),
                provider_type: ProviderType::GitHub,
                repository_url: "https://github.com/acme/widgets".to_string(),
                encrypted_access_token: "plain:t".to_string(),
                created_by: Uuid::new_v4(),
            })
            .await;
        let ctx = SyncContext::builder()
            .issue_store(Arc::new(MemoryIssueStore::new()))
            .connection_store(connections)
            .cipher(Arc::new(PlaintextCipher))
            .provider_factory(Arc::new(HttpProviderFactory::new(Arc::new(
                transport.clone(),
            ))))
            .build()
            .unwrap();
        (SyncService::with_memory_store(ctx), connection.id)
    }

    async fn wait_until_finished(service: &SyncService, id: Uuid) -> SyncOperation {
        for _ in 0..200 {
            let op = service.get_sync_status(id).await.unwrap();
            if op.status.is_terminal() {
                return op;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("operation {id} did not finish");
    }

    #[tokio::test]
    async fn completed_run_stores_results() {
        let transport = MockTransport::new();
        transport.push_json(API, json!({"id": 1, "full_name": "acme/widgets"}), vec![]);
        transport.push_json(
            format!("{API}/issues?state=open&per_page=100&page=1"),
            json!([{"id": 9, "number": 1, "title": "One", "state": "open"}]),
            vec![],
        );

        let (service, connection_id) = service(&transport).await;
        let id = service
            .start_sync(
                connection_id,
                Uuid::new_v4(),
                SyncOptions::new(SyncType::IssuesOnly, false),
            )
            .await
            .unwrap();

        let op = wait_until_finished(&service, id).await;
        assert_eq!(op.status, OperationStatus::Completed);
        assert!(op.started_at.is_some() && op.completed_at.is_some());
        assert_eq!(op.results.unwrap().created, 1);
        assert!(op.progress.is_some());
        assert!(!op.cancelled);
    }

    #[tokio::test]
    async fn fatal_error_marks_operation_failed() {
        let transport = MockTransport::new();
        // validate_access gets no mock response: network error
        let (service, connection_id) = service(&transport).await;
        let id = service
            .start_sync(connection_id, Uuid::new_v4(), SyncOptions::default())
            .await
            .unwrap();

        let op = wait_until_finished(&service, id).await;
        assert_eq!(op.status, OperationStatus::Failed);
        assert!(op.error.is_some());
    }

    #[tokio::test]
    async fn second_start_for_active_connection_is_rejected() {
        let transport = MockTransport::new();
        let (service, connection_id) = service(&transport).await;
        let pending = SyncOperation::new(connection_id, Uuid::new_v4(), &SyncOptions::default());
        let pending_id = pending.id;
        service.operations().create(pending).await.unwrap();

        let err = service
            .start_sync(connection_id, Uuid::new_v4(), SyncOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::AlreadyRunning { operation_id, .. } if operation_id == pending_id
        ));
    }

    #[tokio::test]
    async fn unknown_ids_are_reported() {
        let transport = MockTransport::new();
        let (service, _) = service(&transport).await;
        assert!(matches!(
            service
                .start_sync(Uuid::new_v4(), Uuid::new_v4(), SyncOptions::default())
                .await,
            Err(SyncError::ConnectionNotFound(_))
        ));
        assert!(matches!(
            service.get_sync_status(Uuid::new_v4()).await,
            Err(SyncError::OperationNotFound(_))
        ));
        assert!(matches!(
            service.abort_sync(Uuid::new_v4()).await,
            Err(SyncError::OperationNotFound(_))
        ));
    }

    #[tokio::test]
    async fn abort_cancels_the_stored_token() {
        let transport = MockTransport::new();
        let (service, connection_id) = service(&transport).await;
        let pending = SyncOperation::new(connection_id, Uuid::new_v4(), &SyncOptions::default());
        let token = pending.cancel.clone();
        let id = pending.id;
        service.operations().create(pending).await.unwrap();

        service.abort_sync(id).await.unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn reaper_cleans_up_until_shutdown() {
        let transport = MockTransport::new();
        let (service, connection_id) = service(&transport).await;
        let mut old = SyncOperation::new(connection_id, Uuid::new_v4(), &SyncOptions::default());
        old.status = OperationStatus::Completed;
        old.completed_at = Some(Utc::now() - chrono::Duration::hours(30));
        let old_id = old.id;
        service.operations().create(old).await.unwrap();

        let shutdown = CancellationToken::new();
        let handle = service.spawn_reaper(24, Duration::from_secs(60), shutdown.clone());
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(service.operations().get(old_id).await.unwrap().is_none());
        shutdown.cancel();
        handle.await.unwrap();
    }
}
