use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::entity::issue::Model as Issue;
use crate::entity::issue_kind::{IssuePriority, IssueStatus, IssueType};
use crate::entity::provider_type::ProviderType;
use crate::entity::repository_connection::Model as RepositoryConnection;

use super::errors::Result;

/// Fields for a new local issue. The store assigns the id and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIssue {
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub issue_type: IssueType,
    pub priority: Option<IssuePriority>,
    pub status: IssueStatus,
    pub reporter_id: Uuid,
    pub custom_fields: Value,
}

/// Partial update of an issue. `None` leaves the column alone.
///
/// `description` is doubly optional so a patch can clear it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssuePatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub custom_fields: Option<Value>,
}

impl IssuePatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.custom_fields.is_none()
    }

    /// Apply onto an in-memory model, bumping `updated_at`.
    pub(crate) fn apply(self, issue: &mut Issue, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            issue.title = title;
        }
        if let Some(description) = self.description {
            issue.description = description;
        }
        if let Some(custom_fields) = self.custom_fields {
            issue.custom_fields = custom_fields;
        }
        issue.updated_at = now.fixed_offset();
    }
}

/// Fields for registering a repository connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConnection {
    pub project_id: Uuid,
    pub provider_type: ProviderType,
    pub repository_url: String,
    pub encrypted_access_token: String,
    pub created_by: Uuid,
}

/// Issue persistence as seen by the sync engine.
#[async_trait]
pub trait IssueStore: Send + Sync {
    /// All issues of a project, oldest first.
    async fn find_issues_by_project(&self, project_id: Uuid) -> Result<Vec<Issue>>;

    async fn find_issue_by_id(&self, id: Uuid) -> Result<Option<Issue>>;

    async fn create_issue(&self, issue: NewIssue) -> Result<Issue>;

    /// Apply `patch` to an existing issue.
    ///
    /// # Errors
    /// `StoreError::NotFound` when no issue has this id.
    async fn update_issue(&self, id: Uuid, patch: IssuePatch) -> Result<Issue>;
}

/// Repository connection lookups as seen by the sync engine.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    async fn find_connection(&self, id: Uuid) -> Result<Option<RepositoryConnection>>;

    /// Record the completion time of a successful run.
    async fn mark_synced(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;
}
