use std::sync::Arc;
use std::time::Duration;

use issuesync::DatabaseStore;
use issuesync::sync::{
    OperationStatus, SyncOperation, SyncOptions, SyncService, event_channel,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::SyncArgs;
use crate::commands::shared::{CliResult, build_context};
use crate::config::Config;
use crate::progress::{LoggingReporter, print_summary};
use crate::shutdown::cancel_on_ctrl_c;

/// Interval between status polls once the event stream has closed.
const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub(crate) async fn handle_sync(
    args: SyncArgs,
    config: &Config,
    store: Arc<DatabaseStore>,
) -> CliResult {
    let ctx = build_context(config, store)?;
    let service = SyncService::with_memory_store(ctx);

    let options = SyncOptions::new(
        args.sync_type,
        args.include_closed || config.sync.include_closed,
    )
    .with_page_size(args.page_size.unwrap_or(config.sync.page_size));

    let (observer, mut events) = event_channel();
    let operation_id = service
        .start_sync_observed(args.connection, config.user_id(), options, observer)
        .await?;

    let abort = CancellationToken::new();
    cancel_on_ctrl_c(abort.clone());

    let mut reporter = LoggingReporter::new();
    let mut abort_sent = false;
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => reporter.handle(&event),
                None => break,
            },
            () = abort.cancelled(), if !abort_sent => {
                abort_sent = true;
                service.abort_sync(operation_id).await?;
            }
        }
    }

    let operation = wait_until_finished(&service, operation_id).await?;
    print_summary(&operation);

    match (operation.status, operation.error) {
        (OperationStatus::Failed, Some(error)) => Err(error.into()),
        (OperationStatus::Failed, None) => Err("sync failed".into()),
        _ => Ok(()),
    }
}

/// The final status lands just after the event stream closes.
async fn wait_until_finished(service: &SyncService, operation_id: Uuid) -> CliResult<SyncOperation> {
    loop {
        let operation = service.get_sync_status(operation_id).await?;
        if operation.status.is_terminal() {
            return Ok(operation);
        }
        tokio::time::sleep(STATUS_POLL_INTERVAL).await;
    }
}
