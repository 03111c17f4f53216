//! GitHub adapter: issues and Dependabot alerts for one repository.
//!
//! - [`types`] - REST payloads
//! - [`convert`] - normalization into [`crate::provider::ProviderIssue`]
//! - [`client`] - paged listing over [`crate::http::HttpTransport`]

mod client;
mod convert;
mod types;

pub use client::{API_VERSION, GitHubClient, LinkPagination, MAX_PAGE_SIZE, parse_link_header};
pub use convert::{alert_to_provider_issue, issue_to_provider_issue};
pub use types::{
    GitHubAlert, GitHubDependency, GitHubIssue, GitHubLabel, GitHubPackage, GitHubPatchedVersion,
    GitHubRepository, GitHubSecurityAdvisory, GitHubUser, GitHubVulnerability,
};
