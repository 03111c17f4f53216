//! Repository sync orchestrator.
//!
//! One run walks the regular issue listing and then the advisory listing of a
//! single repository connection, page by page, feeding every item through the
//! per-issue pipeline. Per-issue failures are recorded and skipped; failures
//! that make the rest of the run meaningless end it.

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::provider::{
    IssuePage, IssueProvider, IssueState, PageQuery, ProviderError, RawIssue, short_error_message,
};
use crate::retry::with_retry;

use super::context::SyncContext;
use super::errors::{Result, SyncError};
use super::pipeline::{SyncTarget, process_issue_tracked};
use super::progress::{EventSender, ProgressTracker, SyncEvent, emit};
use super::types::{
    IssueOutcome, MAX_CONSECUTIVE_PAGE_FAILURES, SyncOptions, SyncPhase, SyncResults,
};

/// Channels a caller uses to observe and steer a run.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    pub events: Option<EventSender>,
    pub cancel: CancellationToken,
    /// Operation this run belongs to, for log correlation.
    pub operation_id: Option<Uuid>,
}

impl RunControl {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    #[must_use]
    pub fn with_operation_id(mut self, operation_id: Uuid) -> Self {
        self.operation_id = Some(operation_id);
        self
    }
}

/// How a run ended.
///
/// `results` is always populated with whatever was accumulated, including
/// when `error` is set.
#[derive(Debug, Default)]
pub struct RepositorySyncOutcome {
    pub results: SyncResults,
    /// Fatal error that ended the run early.
    pub error: Option<SyncError>,
    /// Cancellation was observed.
    pub cancelled: bool,
}

impl RepositorySyncOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

struct RunState {
    results: SyncResults,
    tracker: ProgressTracker,
    cancelled: bool,
    /// At least one page of any listing came back.
    page_succeeded: bool,
}

/// Sync one repository connection into its project.
///
/// Never returns early with an error: fatal problems are reported in
/// [`RepositorySyncOutcome::error`] next to the partial results.
#[tracing::instrument(
    skip(ctx, options, run),
    fields(operation_id = ?run.operation_id, sync_type = %options.sync_type)
)]
pub async fn sync_repository_issues(
    ctx: &SyncContext,
    connection_id: Uuid,
    user_id: Uuid,
    options: &SyncOptions,
    run: RunControl,
) -> RepositorySyncOutcome {
    let mut state = RunState {
        results: SyncResults::default(),
        tracker: ProgressTracker::new(run.events.clone()),
        cancelled: false,
        page_succeeded: false,
    };

    let error = run_sync(ctx, connection_id, user_id, options, &run, &mut state)
        .await
        .err();

    match &error {
        Some(e) => warn!(error = %e, "Sync run failed"),
        None if state.cancelled => {
            info!(processed = state.results.processed(), "Sync run cancelled");
        }
        None => info!(
            created = state.results.created,
            updated = state.results.updated,
            skipped = state.results.skipped,
            failed = state.results.failed,
            "Sync run finished"
        ),
    }

    emit(
        run.events.as_ref(),
        SyncEvent::Finished {
            results: state.results.clone(),
            error: error.as_ref().map(SyncError::user_message),
        },
    );

    RepositorySyncOutcome {
        results: state.results,
        error,
        cancelled: state.cancelled,
    }
}

async fn run_sync(
    ctx: &SyncContext,
    connection_id: Uuid,
    user_id: Uuid,
    options: &SyncOptions,
    run: &RunControl,
    state: &mut RunState,
) -> Result<()> {
    let connection = ctx
        .connections()
        .find_connection(connection_id)
        .await?
        .ok_or(SyncError::ConnectionNotFound(connection_id))?;

    let token = ctx.cipher().decrypt(&connection.encrypted_access_token)?;
    let provider = ctx.providers().create(
        connection.provider_type,
        &connection.repository_url,
        &token,
    )?;

    emit(
        run.events.as_ref(),
        SyncEvent::Started {
            connection_id,
            repository_url: connection.repository_url.clone(),
            sync_type: options.sync_type,
        },
    );
    info!(
        provider = %connection.provider_type,
        repository = %connection.repository_url,
        "Starting repository sync"
    );

    match with_retry(
        || provider.validate_access(),
        ctx.retry_config(),
        &run.cancel,
        run.events.as_ref(),
    )
    .await
    {
        Ok(()) => {}
        Err(ProviderError::Cancelled) => {
            mark_cancelled(run, state);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    let target = SyncTarget {
        project_id: connection.project_id,
        user_id,
        provider: connection.provider_type,
        repository_url: provider.repository().web_url.clone(),
    };

    if options.sync_type.includes_issues() {
        run_phase(ctx, provider.as_ref(), &target, SyncPhase::Issues, options, run, state).await?;
    }

    if options.sync_type.includes_advisories() && !state.cancelled {
        if provider.supports_advisories() {
            run_phase(
                ctx,
                provider.as_ref(),
                &target,
                SyncPhase::Advisories,
                options,
                run,
                state,
            )
            .await?;
        } else {
            debug!(provider = %connection.provider_type, "Provider has no advisory listing");
        }
    }

    if !state.cancelled
        && let Err(e) = ctx.connections().mark_synced(connection_id, Utc::now()).await
    {
        warn!(error = %e, "Failed to record last sync time");
    }

    Ok(())
}

async fn fetch_page(
    provider: &dyn IssueProvider,
    phase: SyncPhase,
    query: &PageQuery,
) -> crate::provider::Result<IssuePage> {
    match phase {
        SyncPhase::Issues => provider.list_issues(query).await,
        SyncPhase::Advisories => provider.list_advisories(query).await,
    }
}

async fn run_phase(
    ctx: &SyncContext,
    provider: &dyn IssueProvider,
    target: &SyncTarget,
    phase: SyncPhase,
    options: &SyncOptions,
    run: &RunControl,
    state: &mut RunState,
) -> Result<()> {
    emit(run.events.as_ref(), SyncEvent::PhaseStarted { phase });
    state.tracker.begin_phase();

    let mut page = 1u32;
    let mut consecutive_failures = 0u32;

    loop {
        if run.cancel.is_cancelled() {
            mark_cancelled(run, state);
            return Ok(());
        }

        state.tracker.fetching(page);
        let query = PageQuery::new(page, options.page_size, options.include_closed);
        let fetched = with_retry(
            || fetch_page(provider, phase, &query),
            ctx.retry_config(),
            &run.cancel,
            run.events.as_ref(),
        )
        .await;

        let listing = match fetched {
            Ok(listing) => listing,
            Err(ProviderError::Cancelled) => {
                mark_cancelled(run, state);
                return Ok(());
            }
            Err(e) if e.is_rate_limited() || !state.page_succeeded => return Err(e.into()),
            Err(e) => {
                consecutive_failures += 1;
                let message = short_error_message(&e);
                warn!(%phase, page, error = %message, "Failed to fetch page");
                state
                    .results
                    .push_error(None, format!("{phase} page {page}: {message}"));
                emit(
                    run.events.as_ref(),
                    SyncEvent::PageFailed {
                        phase,
                        page,
                        error: message,
                    },
                );
                if consecutive_failures >= MAX_CONSECUTIVE_PAGE_FAILURES {
                    warn!(%phase, consecutive_failures, "Giving up on listing");
                    return Ok(());
                }
                page += 1;
                continue;
            }
        };

        consecutive_failures = 0;
        state.page_succeeded = true;
        debug!(%phase, page, count = listing.issues.len(), has_next = listing.has_next, "Fetched page");
        emit(
            run.events.as_ref(),
            SyncEvent::PageFetched {
                phase,
                page,
                count: listing.issues.len(),
                has_next: listing.has_next,
            },
        );

        if listing.issues.is_empty() {
            return Ok(());
        }

        state
            .tracker
            .page_loaded(listing.total_count.and_then(|n| u64::try_from(n).ok()));

        for raw in &listing.issues {
            if run.cancel.is_cancelled() {
                mark_cancelled(run, state);
                return Ok(());
            }
            handle_item(ctx, target, raw, phase, options, run, state).await;
            let processed = state.results.processed();
            state.tracker.issue_done(processed);
        }
        let processed = state.results.processed();
        state.tracker.page_done(processed);

        if !listing.has_next {
            return Ok(());
        }
        page = listing.next_page.unwrap_or(page + 1);
    }
}

async fn handle_item(
    ctx: &SyncContext,
    target: &SyncTarget,
    raw: &RawIssue,
    phase: SyncPhase,
    options: &SyncOptions,
    run: &RunControl,
    state: &mut RunState,
) {
    let advisory = phase == SyncPhase::Advisories;

    if raw.is_pull_request() {
        state.results.record(IssueOutcome::Skipped, advisory);
        return;
    }

    let issue = match raw.normalize() {
        Ok(issue) => issue,
        Err(e) => {
            record_failure(run, state, raw.identifier(), short_error_message(&e), advisory);
            return;
        }
    };

    if issue.state == IssueState::Closed && !options.include_closed {
        state.results.record(IssueOutcome::Skipped, advisory);
        return;
    }

    match process_issue_tracked(ctx, target, &issue, Utc::now(), Some(&mut state.tracker)).await {
        Ok(processed) => state.results.record(processed.outcome, advisory),
        Err(e) => record_failure(
            run,
            state,
            Some(issue.id.to_string()),
            short_error_message(&e),
            advisory,
        ),
    }
}

fn record_failure(
    run: &RunControl,
    state: &mut RunState,
    issue_id: Option<String>,
    error: String,
    advisory: bool,
) {
    warn!(issue_id = ?issue_id, error = %error, "Failed to sync issue");
    emit(
        run.events.as_ref(),
        SyncEvent::IssueFailed {
            issue_id: issue_id.clone(),
            error: error.clone(),
        },
    );
    state.results.record_failure(issue_id, error, advisory);
}

fn mark_cancelled(run: &RunControl, state: &mut RunState) {
    if !state.cancelled {
        state.cancelled = true;
        emit(run.events.as_ref(), SyncEvent::Cancelled);
    }
}
