//! issuesync - import issues and security advisories from Git hosts.
//!
//! Pulls issues from GitHub, GitLab and Bitbucket repositories (plus
//! Dependabot alerts and GitLab vulnerability findings), matches them against
//! previously imported local issues, and creates or updates local issues
//! through a small storage contract.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use issuesync::{DatabaseStore, HttpProviderFactory, PlaintextCipher};
//! use issuesync::sync::{SyncContext, SyncOptions, SyncService};
//!
//! let db = issuesync::db::connect_and_prepare("sqlite://issuesync.db?mode=rwc").await?;
//! let store = Arc::new(DatabaseStore::new(db));
//! let ctx = SyncContext::builder()
//!     .issue_store(store.clone())
//!     .connection_store(store)
//!     .cipher(Arc::new(PlaintextCipher))
//!     .provider_factory(Arc::new(HttpProviderFactory::with_timeout(timeout)?.with_default_rate_limits()))
//!     .build()?;
//!
//! let service = SyncService::with_memory_store(ctx);
//! let operation_id = service.start_sync(connection_id, user_id, SyncOptions::default()).await?;
//! ```

pub mod bitbucket;
pub mod credentials;
pub mod db;
pub mod entity;
pub mod external_id;
pub mod github;
pub mod gitlab;
pub mod http;
pub mod matcher;
pub mod provider;
pub mod retry;
pub mod store;
pub mod sync;

pub use credentials::{CredentialError, PlaintextCipher, SecretCipher};
pub use db::{connect, connect_and_prepare, ensure_schema};
pub use entity::prelude::*;
pub use external_id::{ExternalId, ExternalIdError};
pub use matcher::{DuplicateMatcher, MatchResult, MatchType};
pub use provider::{
    ApiRateLimiter, HttpProviderFactory, IssueProvider, ProviderError, ProviderFactory,
    ProviderIssue, RateLimitInfo, rate_limits,
};
pub use retry::{RetryConfig, calculate_backoff_delay, with_retry};
pub use store::{
    ConnectionStore, DatabaseStore, IssuePatch, IssueStore, MemoryConnectionStore,
    MemoryIssueStore, NewConnection, NewIssue, StoreError,
};
