//! Per-issue pipeline: external id, duplicate match, then create or update.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::entity::custom_fields::{ExternalSync, SyncedIssueCustomFields};
use crate::entity::issue_kind::{IssuePriority, IssueStatus, IssueType};
use crate::entity::provider_type::ProviderType;
use crate::external_id;
use crate::matcher::MatchType;
use crate::provider::{IssueState, PriorityHint, ProviderIssue};
use crate::store::{IssuePatch, NewIssue, Result, StoreError};

use super::context::SyncContext;
use super::progress::ProgressTracker;
use super::types::{IssueOutcome, SyncStage};

/// Where imported issues land and how they are attributed.
#[derive(Debug, Clone)]
pub struct SyncTarget {
    pub project_id: Uuid,
    /// Reporter of newly created issues.
    pub user_id: Uuid,
    pub provider: ProviderType,
    /// Canonical repository URL; part of every external id.
    pub repository_url: String,
}

/// What the pipeline did with one provider issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessedIssue {
    pub outcome: IssueOutcome,
    pub issue_id: Uuid,
    pub match_type: Option<MatchType>,
}

/// Import one normalized issue.
///
/// A matched issue gets its title, description and sync bookkeeping
/// refreshed; status and classification stay as the local workflow left
/// them. An unmatched issue is created.
pub async fn process_issue(
    ctx: &SyncContext,
    target: &SyncTarget,
    issue: &ProviderIssue,
    now: DateTime<Utc>,
) -> Result<ProcessedIssue> {
    process_issue_tracked(ctx, target, issue, now, None).await
}

pub(crate) async fn process_issue_tracked(
    ctx: &SyncContext,
    target: &SyncTarget,
    issue: &ProviderIssue,
    now: DateTime<Utc>,
    mut tracker: Option<&mut ProgressTracker>,
) -> Result<ProcessedIssue> {
    let external_id =
        external_id::generate(target.provider, &target.repository_url, &issue.id.to_string());

    if let Some(t) = tracker.as_deref_mut() {
        t.stage(SyncStage::Matching);
    }
    let found = ctx
        .matcher()
        .find_duplicate(
            target.project_id,
            &external_id,
            &issue.title,
            &target.repository_url,
        )
        .await?;

    match found.issue_id {
        Some(existing_id) => {
            if let Some(t) = tracker.as_deref_mut() {
                t.stage(SyncStage::Updating);
            }
            let existing = ctx
                .issues()
                .find_issue_by_id(existing_id)
                .await?
                .ok_or_else(|| StoreError::issue_not_found(existing_id))?;

            let custom_fields =
                merged_custom_fields(&existing.custom_fields, target, issue, &external_id, now);
            let patch = IssuePatch {
                title: Some(issue.title.clone()),
                description: Some(issue.body.clone()),
                custom_fields: Some(custom_fields),
            };
            ctx.issues().update_issue(existing_id, patch).await?;
            debug!(issue_id = %existing_id, external_id, "updated synced issue");

            Ok(ProcessedIssue {
                outcome: IssueOutcome::Updated,
                issue_id: existing_id,
                match_type: found.match_type,
            })
        }
        None => {
            if let Some(t) = tracker.as_deref_mut() {
                t.stage(SyncStage::Creating);
            }
            let fields = SyncedIssueCustomFields {
                external_id: Some(external_id.clone()),
                external_sync: Some(external_sync(target, issue, now, None)),
                extra: Map::new(),
            };
            let created = ctx
                .issues()
                .create_issue(NewIssue {
                    project_id: target.project_id,
                    title: issue.title.clone(),
                    description: issue.body.clone(),
                    issue_type: issue_type_for(issue),
                    priority: priority_for(issue),
                    status: status_for(issue.state),
                    reporter_id: target.user_id,
                    custom_fields: fields.to_json(),
                })
                .await?;
            debug!(issue_id = %created.id, external_id, "created synced issue");

            Ok(ProcessedIssue {
                outcome: IssueOutcome::Created,
                issue_id: created.id,
                match_type: None,
            })
        }
    }
}

/// Advisories are bugs; otherwise `bug` → Bug, `enhancement`/`feature` → Feature.
pub fn issue_type_for(issue: &ProviderIssue) -> IssueType {
    if issue.security_advisory || issue.has_label("bug") {
        IssueType::Bug
    } else if issue.has_label("enhancement") || issue.has_label("feature") {
        IssueType::Feature
    } else {
        IssueType::Task
    }
}

pub fn priority_for(issue: &ProviderIssue) -> Option<IssuePriority> {
    if !issue.security_advisory {
        return None;
    }
    issue.priority_hint.map(|hint| match hint {
        PriorityHint::Critical => IssuePriority::Critical,
        PriorityHint::High => IssuePriority::High,
    })
}

pub fn status_for(state: IssueState) -> IssueStatus {
    match state {
        IssueState::Open => IssueStatus::Open,
        IssueState::Closed => IssueStatus::Closed,
    }
}

fn external_sync(
    target: &SyncTarget,
    issue: &ProviderIssue,
    synced_at: DateTime<Utc>,
    last_synced_at: Option<DateTime<Utc>>,
) -> ExternalSync {
    ExternalSync {
        provider_type: target.provider,
        repository_url: target.repository_url.clone(),
        issue_number: Some(issue.number),
        synced_at,
        last_synced_at,
        security_advisory: issue.security_advisory.then_some(true),
    }
}

/// Refresh the engine-owned keys, keep everything else.
///
/// `syncedAt` survives from the stored bag when it parses; a bag whose
/// `externalSync` is unreadable is rewritten from scratch, foreign keys kept.
fn merged_custom_fields(
    stored: &Value,
    target: &SyncTarget,
    issue: &ProviderIssue,
    external_id: &str,
    now: DateTime<Utc>,
) -> Value {
    let mut fields = SyncedIssueCustomFields::recover(stored);

    let synced_at = fields
        .external_sync
        .as_ref()
        .map_or(now, |sync| sync.synced_at);
    fields.external_id = Some(external_id.to_string());
    fields.external_sync = Some(external_sync(target, issue, synced_at, Some(now)));
    fields.to_json()
}
