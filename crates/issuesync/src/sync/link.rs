//! Manual linking of a local issue to a provider issue.

use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::entity::custom_fields::{ExternalSync, SyncedIssueCustomFields};
use crate::entity::issue::Model as Issue;
use crate::entity::provider_type::ProviderType;
use crate::external_id;
use crate::provider::{ProviderError, RepoRef};
use crate::store::{IssuePatch, StoreError};

use super::context::SyncContext;

/// Which provider issue to bind. One of `external_id` or `issue_number` is required.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRequest {
    pub provider: ProviderType,
    pub repository_url: String,
    /// Either a full external id or the provider-side issue id.
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub issue_number: Option<u64>,
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Issue not found: {0}")]
    IssueNotFound(Uuid),

    #[error("Either an external id or an issue number is required")]
    MissingIdentifier,

    #[error("External id {external_id} belongs to provider {found}, not {expected}")]
    ProviderMismatch {
        external_id: String,
        expected: ProviderType,
        found: ProviderType,
    },

    #[error("External id {external_id} belongs to repository {found}, not {expected}")]
    RepositoryMismatch {
        external_id: String,
        expected: String,
        found: String,
    },

    #[error(transparent)]
    InvalidRepository(#[from] ProviderError),

    #[error("External id {external_id} is already linked to another issue")]
    Conflict { external_id: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Bind `issue_id` to a provider issue by writing its sync custom fields.
///
/// # Errors
/// `LinkError::Conflict` when another issue in the project already carries
/// the resulting external id.
pub async fn link_issue(
    ctx: &SyncContext,
    issue_id: Uuid,
    request: &LinkRequest,
) -> Result<Issue, LinkError> {
    let issue = ctx
        .issues()
        .find_issue_by_id(issue_id)
        .await?
        .ok_or(LinkError::IssueNotFound(issue_id))?;

    let repository_url = RepoRef::parse(request.provider, &request.repository_url)?.web_url;
    let (external_id, issue_number) = resolve_external_id(request, &repository_url)?;

    if ctx
        .matcher()
        .is_external_id_in_use(issue.project_id, &external_id, Some(issue_id))
        .await?
    {
        return Err(LinkError::Conflict { external_id });
    }

    let now = Utc::now();
    let mut fields = SyncedIssueCustomFields::recover(&issue.custom_fields);
    let synced_at = fields
        .external_sync
        .as_ref()
        .map_or(now, |sync| sync.synced_at);
    fields.external_id = Some(external_id.clone());
    fields.external_sync = Some(ExternalSync {
        provider_type: request.provider,
        repository_url,
        issue_number,
        synced_at,
        last_synced_at: Some(now),
        security_advisory: None,
    });

    let updated = ctx
        .issues()
        .update_issue(
            issue_id,
            IssuePatch {
                custom_fields: Some(fields.to_json()),
                ..IssuePatch::default()
            },
        )
        .await?;
    info!(issue_id = %issue_id, external_id, "Linked issue");
    Ok(updated)
}

/// Canonical external id for the request, plus the issue number when known.
///
/// A full external id is rebuilt around the canonical repository URL, so
/// `.git` and SSH spellings produce the same id a sync would generate.
fn resolve_external_id(
    request: &LinkRequest,
    repository_url: &str,
) -> Result<(String, Option<u64>), LinkError> {
    if let Some(raw) = request.external_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        return match external_id::parse(raw) {
            Ok(parsed) if parsed.provider != request.provider => Err(LinkError::ProviderMismatch {
                external_id: raw.to_string(),
                expected: request.provider,
                found: parsed.provider,
            }),
            Ok(parsed) => {
                let found = RepoRef::parse(parsed.provider, &parsed.repository_url)
                    .map_or_else(|_| parsed.repository_url.clone(), |repo| repo.web_url);
                if !found.eq_ignore_ascii_case(repository_url) {
                    return Err(LinkError::RepositoryMismatch {
                        external_id: raw.to_string(),
                        expected: repository_url.to_string(),
                        found,
                    });
                }
                let number = parsed.issue_id.parse().ok().or(request.issue_number);
                Ok((
                    external_id::generate(request.provider, repository_url, &parsed.issue_id),
                    number,
                ))
            }
            Err(_) => Ok((
                external_id::generate(request.provider, repository_url, raw),
                raw.parse().ok().or(request.issue_number),
            )),
        };
    }

    let number = request.issue_number.ok_or(LinkError::MissingIdentifier)?;
    Ok((
        external_id::generate(request.provider, repository_url, &number.to_string()),
        Some(number),
    ))
}
