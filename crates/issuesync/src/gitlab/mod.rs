//! GitLab adapter: issues and vulnerability findings for one project.

mod client;
mod convert;
mod types;

pub use client::{GitLabClient, MAX_PAGE_SIZE, parse_pagination_headers};
pub use convert::{finding_to_provider_issue, issue_to_provider_issue};
pub use types::{
    GitLabFinding, GitLabIdentifier, GitLabIssue, GitLabProject, GitLabScanner, GitLabUser,
};
