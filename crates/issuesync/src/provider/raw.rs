use serde::de::DeserializeOwned;

use crate::bitbucket::BitbucketIssue;
use crate::entity::provider_type::ProviderType;
use crate::github::{GitHubAlert, GitHubIssue};
use crate::gitlab::{GitLabFinding, GitLabIssue};

use super::errors::{ProviderError, Result};
use super::types::ProviderIssue;

/// A provider record exactly as fetched, before normalization.
#[derive(Debug, Clone)]
pub enum RawIssue {
    GitHub(GitHubIssue),
    GitHubAlert(GitHubAlert),
    GitLab(GitLabIssue),
    GitLabFinding(GitLabFinding),
    Bitbucket(BitbucketIssue),
    /// A page entry that did not match the expected shape.
    Malformed {
        provider: ProviderType,
        identifier: Option<String>,
        message: String,
    },
}

impl RawIssue {
    /// Normalize into the canonical shape. Pure; no I/O.
    pub fn normalize(&self) -> Result<ProviderIssue> {
        match self {
            RawIssue::GitHub(issue) => crate::github::issue_to_provider_issue(issue),
            RawIssue::GitHubAlert(alert) => crate::github::alert_to_provider_issue(alert),
            RawIssue::GitLab(issue) => crate::gitlab::issue_to_provider_issue(issue),
            RawIssue::GitLabFinding(finding) => crate::gitlab::finding_to_provider_issue(finding),
            RawIssue::Bitbucket(issue) => crate::bitbucket::issue_to_provider_issue(issue),
            RawIssue::Malformed {
                provider, message, ..
            } => Err(ProviderError::decode(*provider, message.clone())),
        }
    }

    /// GitHub lists pull requests on the issues endpoint.
    pub fn is_pull_request(&self) -> bool {
        matches!(self, RawIssue::GitHub(issue) if issue.pull_request.is_some())
    }

    /// Provider-side identifier, for error records.
    pub fn identifier(&self) -> Option<String> {
        match self {
            RawIssue::GitHub(issue) => Some(issue.number.to_string()),
            RawIssue::GitHubAlert(alert) => Some(format!("dependabot-{}", alert.number)),
            RawIssue::GitLab(issue) => Some(issue.iid.to_string()),
            RawIssue::GitLabFinding(finding) => Some(format!("finding-{}", finding.id)),
            RawIssue::Bitbucket(issue) => Some(issue.id.to_string()),
            RawIssue::Malformed { identifier, .. } => identifier.clone(),
        }
    }
}

/// Decode page entries one by one; entries that fail become [`RawIssue::Malformed`].
pub(crate) fn decode_items<T: DeserializeOwned>(
    provider: ProviderType,
    values: Vec<serde_json::Value>,
    id_key: &str,
    wrap: fn(T) -> RawIssue,
) -> Vec<RawIssue> {
    values
        .into_iter()
        .map(|value| {
            let identifier = value.get(id_key).map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            });
            match serde_json::from_value::<T>(value) {
                Ok(item) => wrap(item),
                Err(e) => RawIssue::Malformed {
                    provider,
                    identifier,
                    message: e.to_string(),
                },
            }
        })
        .collect()
}
