//! Repository issue synchronization.
//!
//! # Module Structure
//!
//! - [`types`] - `SyncResults`, `SyncOptions`, `SyncProgress`, constants
//! - [`progress`] - `SyncEvent` channel and `emit()`
//! - [`context`] - `SyncContext`: stores, cipher, provider factory, retry config
//! - [`pipeline`] - per-issue match then create or update
//! - [`engine`] - `sync_repository_issues()`, the paged orchestrator
//! - [`operation`] - `OperationStore` and its in-memory implementation
//! - [`service`] - `SyncService`: start, poll, abort, link
//! - [`link`] - manual linking of local issues
//!
//! # Example
//!
//! ```ignore
//! use issuesync::sync::{SyncOptions, SyncService, SyncType};
//!
//! let service = SyncService::with_memory_store(ctx);
//! let id = service
//!     .start_sync(connection_id, user_id, SyncOptions::new(SyncType::Full, false))
//!     .await?;
//! let status = service.get_sync_status(id).await?;
//! println!("{}: {:?}", status.status, status.progress);
//! ```

mod context;
pub mod engine;
mod errors;
mod link;
mod operation;
pub mod pipeline;
mod progress;
mod service;
mod types;

pub use context::{SyncContext, SyncContextBuilder, SyncContextError};
pub use engine::{RepositorySyncOutcome, RunControl, sync_repository_issues};
pub use errors::{Result, SyncError};
pub use link::{LinkError, LinkRequest, link_issue};
pub use operation::{
    InMemoryOperationStore, OperationStatus, OperationStore, OperationUpdate, SyncOperation,
};
pub use pipeline::{ProcessedIssue, SyncTarget, process_issue};
pub use progress::{EventReceiver, EventSender, SyncEvent, emit, event_channel};
pub use service::{DEFAULT_REAP_INTERVAL, DEFAULT_RETENTION_HOURS, SyncService};
pub use types::{
    DEFAULT_PAGE_SIZE, IssueOutcome, MAX_CONSECUTIVE_PAGE_FAILURES, MAX_RECORDED_ERRORS,
    PROGRESS_EVERY, SyncCounts, SyncErrorRecord, SyncOptions, SyncPhase, SyncProgress,
    SyncResults, SyncStage, SyncType,
};
