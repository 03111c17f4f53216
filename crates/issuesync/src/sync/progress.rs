//! Progress events for sync runs.
//!
//! The engine publishes [`SyncEvent`]s on an unbounded `mpsc` channel. The
//! sync service forwards progress snapshots into the operation store; the CLI
//! turns them into log lines.

use tokio::sync::mpsc;
use uuid::Uuid;

use super::types::{PROGRESS_EVERY, SyncPhase, SyncProgress, SyncResults, SyncStage, SyncType};

/// Events emitted during a sync run.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SyncEvent {
    /// The run loaded its connection and is about to validate access.
    Started {
        connection_id: Uuid,
        repository_url: String,
        sync_type: SyncType,
    },

    /// A listing phase is starting.
    PhaseStarted { phase: SyncPhase },

    /// Replaces the previous progress snapshot.
    Progress(SyncProgress),

    /// A page came back from the provider.
    PageFetched {
        phase: SyncPhase,
        page: u32,
        count: usize,
        has_next: bool,
    },

    /// A page could not be fetched; the phase may continue with the next one.
    PageFailed {
        phase: SyncPhase,
        page: u32,
        error: String,
    },

    /// Rate limited, backing off before retry.
    RateLimitBackoff {
        /// Attempt that was throttled (1-based).
        attempt: u32,
        /// Time to wait before retry (ms).
        retry_after_ms: u64,
    },

    /// One issue failed; the run continues.
    IssueFailed {
        issue_id: Option<String>,
        error: String,
    },

    /// Cancellation was observed; accumulated results are kept.
    Cancelled,

    /// The run ended. `error` is set when it ended fatally.
    Finished {
        results: SyncResults,
        error: Option<String>,
    },
}

/// Sending half of a run's event channel.
pub type EventSender = mpsc::UnboundedSender<SyncEvent>;

/// Receiving half of a run's event channel.
pub type EventReceiver = mpsc::UnboundedReceiver<SyncEvent>;

/// Create an event channel.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Emit an event if a sender is provided.
///
/// A closed channel is not an error: nobody is listening any more.
#[inline]
pub fn emit(events: Option<&EventSender>, event: SyncEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}

/// Builds progress snapshots at page boundaries and every
/// [`PROGRESS_EVERY`] issues.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    events: Option<EventSender>,
    snapshot: SyncProgress,
    since_last: u64,
}

impl ProgressTracker {
    pub(crate) fn new(events: Option<EventSender>) -> Self {
        Self {
            events,
            snapshot: SyncProgress::default(),
            since_last: 0,
        }
    }

    pub(crate) fn events(&self) -> Option<&EventSender> {
        self.events.as_ref()
    }

    /// A new listing starts; page numbers and totals restart.
    pub(crate) fn begin_phase(&mut self) {
        self.snapshot.current = 0;
        self.snapshot.total = None;
    }

    /// Start of a page fetch.
    pub(crate) fn fetching(&mut self, page: u32) {
        self.snapshot.current = page;
        self.snapshot.stage = SyncStage::Fetching;
        self.publish();
    }

    /// A page arrived; its items are about to be matched.
    pub(crate) fn page_loaded(&mut self, total: Option<u64>) {
        if total.is_some() {
            self.snapshot.total = total;
        }
        self.snapshot.stage = SyncStage::Matching;
        self.publish();
    }

    /// Record the stage of the issue in flight.
    pub(crate) fn stage(&mut self, stage: SyncStage) {
        self.snapshot.stage = stage;
    }

    /// One issue handled; publishes every [`PROGRESS_EVERY`] issues.
    pub(crate) fn issue_done(&mut self, processed: u64) {
        self.snapshot.processed = processed;
        self.since_last += 1;
        if self.since_last >= PROGRESS_EVERY {
            self.publish();
        }
    }

    /// End of a page.
    pub(crate) fn page_done(&mut self, processed: u64) {
        self.snapshot.processed = processed;
        self.publish();
    }

    pub(crate) fn snapshot(&self) -> SyncProgress {
        self.snapshot
    }

    fn publish(&mut self) {
        self.since_last = 0;
        emit(self.events.as_ref(), SyncEvent::Progress(self.snapshot));
    }
}
