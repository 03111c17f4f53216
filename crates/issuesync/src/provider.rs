//! Provider-agnostic adapter contract.
//!
//! Each supported host ([`crate::github`], [`crate::gitlab`],
//! [`crate::bitbucket`]) implements [`IssueProvider`] over the shared
//! [`crate::http::HttpTransport`] seam. Raw records come back as
//! [`RawIssue`] and are normalized into [`ProviderIssue`] before anything
//! else looks at them.
//!
//! ```ignore
//! use issuesync::provider::{HttpProviderFactory, PageQuery, ProviderFactory};
//!
//! let provider = factory.create(ProviderType::GitHub, "https://github.com/o/r", &token)?;
//! provider.validate_access().await?;
//! let page = provider.list_issues(&PageQuery::new(1, 100, false)).await?;
//! for raw in &page.issues {
//!     let issue = raw.normalize()?;
//! }
//! ```

mod errors;
mod factory;
mod rate_limit;
mod raw;
mod repo_ref;
mod request;
mod types;

pub use errors::{ProviderError, Result, short_error_message};
pub use factory::{HttpProviderFactory, ProviderFactory};
pub use rate_limit::{
    ApiRateLimiter, RateLimitDetection, RateLimitInfo, default_rps_for_provider, detect, detect_at,
    parse_rate_limit_headers, rate_limits,
};
pub use raw::RawIssue;
pub use repo_ref::RepoRef;
pub use types::{
    Assignee, IssuePage, IssueProvider, IssueState, Label, PageQuery, PriorityHint, ProviderIssue,
    ProviderIssueId, StateFilter,
};

pub(crate) use raw::decode_items;
pub(crate) use request::{decode_array, decode_json, send_get};
