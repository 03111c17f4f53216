use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::entity::issue::Model as Issue;
use crate::entity::repository_connection::Model as RepositoryConnection;

use super::errors::{Result, StoreError};
use super::traits::{ConnectionStore, IssuePatch, IssueStore, NewConnection, NewIssue};

/// Issue store backed by a vector, in insertion order.
#[derive(Debug, Default)]
pub struct MemoryIssueStore {
    issues: RwLock<Vec<Issue>>,
}

impl MemoryIssueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with pre-existing issues.
    pub fn with_issues(issues: Vec<Issue>) -> Self {
        Self {
            issues: RwLock::new(issues),
        }
    }

    /// Snapshot of every stored issue.
    pub async fn all(&self) -> Vec<Issue> {
        self.issues.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.issues.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.issues.read().await.is_empty()
    }
}

#[async_trait]
impl IssueStore for MemoryIssueStore {
    async fn find_issues_by_project(&self, project_id: Uuid) -> Result<Vec<Issue>> {
        let issues = self.issues.read().await;
        Ok(issues
            .iter()
            .filter(|issue| issue.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn find_issue_by_id(&self, id: Uuid) -> Result<Option<Issue>> {
        let issues = self.issues.read().await;
        Ok(issues.iter().find(|issue| issue.id == id).cloned())
    }

    async fn create_issue(&self, issue: NewIssue) -> Result<Issue> {
        let now = Utc::now().fixed_offset();
        let model = Issue {
            id: Uuid::new_v4(),
            project_id: issue.project_id,
            title: issue.title,
            description: issue.description,
            issue_type: issue.issue_type,
            priority: issue.priority,
            status: issue.status,
            reporter_id: issue.reporter_id,
            custom_fields: issue.custom_fields,
            created_at: now,
            updated_at: now,
        };
        self.issues.write().await.push(model.clone());
        Ok(model)
    }

    async fn update_issue(&self, id: Uuid, patch: IssuePatch) -> Result<Issue> {
        let mut issues = self.issues.write().await;
        let issue = issues
            .iter_mut()
            .find(|issue| issue.id == id)
            .ok_or_else(|| StoreError::issue_not_found(id))?;
        patch.apply(issue, Utc::now());
        Ok(issue.clone())
    }
}

/// Connection store backed by a vector.
#[derive(Debug, Default)]
pub struct MemoryConnectionStore {
    connections: RwLock<Vec<RepositoryConnection>>,
}

impl MemoryConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and return the stored row.
    pub async fn insert(&self, connection: NewConnection) -> RepositoryConnection {
        let model = RepositoryConnection {
            id: Uuid::new_v4(),
            project_id: connection.project_id,
            provider_type: connection.provider_type,
            repository_url: connection.repository_url,
            encrypted_access_token: connection.encrypted_access_token,
            created_by: connection.created_by,
            created_at: Utc::now().fixed_offset(),
            last_synced_at: None,
        };
        self.connections.write().await.push(model.clone());
        model
    }
}

#[async_trait]
impl ConnectionStore for MemoryConnectionStore {
    async fn find_connection(&self, id: Uuid) -> Result<Option<RepositoryConnection>> {
        let connections = self.connections.read().await;
        Ok(connections.iter().find(|c| c.id == id).cloned())
    }

    async fn mark_synced(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let mut connections = self.connections.write().await;
        let connection = connections
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::connection_not_found(id))?;
        connection.last_synced_at = Some(at.fixed_offset());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::issue_kind::{IssueStatus, IssueType};
    use crate::entity::provider_type::ProviderType;
    use serde_json::json;

    fn new_issue(project_id: Uuid, title: &str) -> NewIssue {
        NewIssue {
            project_id,
            title: title.to_string(),
            description: Some("body".to_string()),
            issue_type: IssueType::Task,
            priority: None,
            status: IssueStatus::Open,
            reporter_id: Uuid::new_v4(),
            custom_fields: json!({"externalId": "x"}),
        }
    }

    #[tokio::test]
    async fn issues_are_scoped_by_project_and_keep_insertion_order() {
        let store = MemoryIssueStore::new();
        let project = Uuid::new_v4();
        store.create_issue(new_issue(project, "first")).await.unwrap();
        store
            .create_issue(new_issue(Uuid::new_v4(), "elsewhere"))
            .await
            .unwrap();
        store.create_issue(new_issue(project, "second")).await.unwrap();

        let titles: Vec<_> = store
            .find_issues_by_project(project)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(titles, vec!["first", "second"]);
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn update_applies_only_patched_columns() {
        let store = MemoryIssueStore::new();
        let created = store
            .create_issue(new_issue(Uuid::new_v4(), "before"))
            .await
            .unwrap();

        let updated = store
            .update_issue(
                created.id,
                IssuePatch {
                    title: Some("after".to_string()),
                    description: Some(None),
                    custom_fields: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "after");
        assert_eq!(updated.description, None);
        assert_eq!(updated.custom_fields, created.custom_fields);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn update_of_missing_issue_is_not_found() {
        let store = MemoryIssueStore::new();
        let err = store
            .update_issue(Uuid::new_v4(), IssuePatch::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn mark_synced_sets_timestamp() {
        let store = MemoryConnectionStore::new();
        let conn = store
            .insert(NewConnection {
                project_id: Uuid::new_v4(),
                provider_type: ProviderType::GitHub,
                repository_url: "https://github.com/o/r".to_string(),
                encrypted_access_token: "plain:t".to_string(),
                created_by: Uuid::new_v4(),
            })
            .await;
        assert!(conn.last_synced_at.is_none());

        let at = Utc::now();
        store.mark_synced(conn.id, at).await.unwrap();
        let found = store.find_connection(conn.id).await.unwrap().unwrap();
        assert_eq!(found.last_synced_at, Some(at.fixed_offset()));

        assert!(
            store
                .mark_synced(Uuid::new_v4(), at)
                .await
                .unwrap_err()
                .is_not_found()
        );
    }
}
