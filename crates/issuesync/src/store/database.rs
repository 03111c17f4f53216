use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entity::issue::{
    ActiveModel as IssueActiveModel, Column as IssueColumn, Entity as IssueEntity, Model as Issue,
};
use crate::entity::repository_connection::{
    ActiveModel as ConnectionActiveModel, Column as ConnectionColumn, Entity as ConnectionEntity,
    Model as RepositoryConnection,
};

use super::errors::{Result, StoreError};
use super::traits::{ConnectionStore, IssuePatch, IssueStore, NewConnection, NewIssue};

/// sea-orm backed store for both issues and repository connections.
///
/// Share it behind an `Arc`; `DatabaseConnection` is not `Clone` under the
/// `mock` feature.
#[derive(Debug)]
pub struct DatabaseStore {
    db: DatabaseConnection,
}

impl DatabaseStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Insert a repository connection.
    pub async fn insert_connection(&self, connection: NewConnection) -> Result<RepositoryConnection> {
        let model = ConnectionActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(connection.project_id),
            provider_type: Set(connection.provider_type),
            repository_url: Set(connection.repository_url),
            encrypted_access_token: Set(connection.encrypted_access_token),
            created_by: Set(connection.created_by),
            created_at: Set(Utc::now().fixed_offset()),
            last_synced_at: Set(None),
        };
        model.insert(&self.db).await.map_err(StoreError::from)
    }

    /// All connections, oldest first.
    pub async fn list_connections(&self) -> Result<Vec<RepositoryConnection>> {
        ConnectionEntity::find()
            .order_by_asc(ConnectionColumn::CreatedAt)
            .all(&self.db)
            .await
            .map_err(StoreError::from)
    }
}

#[async_trait]
impl IssueStore for DatabaseStore {
    async fn find_issues_by_project(&self, project_id: Uuid) -> Result<Vec<Issue>> {
        IssueEntity::find()
            .filter(IssueColumn::ProjectId.eq(project_id))
            .order_by_asc(IssueColumn::CreatedAt)
            .all(&self.db)
            .await
            .map_err(StoreError::from)
    }

    async fn find_issue_by_id(&self, id: Uuid) -> Result<Option<Issue>> {
        IssueEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(StoreError::from)
    }

    async fn create_issue(&self, issue: NewIssue) -> Result<Issue> {
        let now = Utc::now().fixed_offset();
        let model = IssueActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(issue.project_id),
            title: Set(issue.title),
            description: Set(issue.description),
            issue_type: Set(issue.issue_type),
            priority: Set(issue.priority),
            status: Set(issue.status),
            reporter_id: Set(issue.reporter_id),
            custom_fields: Set(issue.custom_fields),
            created_at: Set(now),
            updated_at: Set(now),
        };
        model.insert(&self.db).await.map_err(StoreError::from)
    }

    async fn update_issue(&self, id: Uuid, patch: IssuePatch) -> Result<Issue> {
        let existing = self
            .find_issue_by_id(id)
            .await?
            .ok_or_else(|| StoreError::issue_not_found(id))?;

        let mut model: IssueActiveModel = existing.into();
        if let Some(title) = patch.title {
            model.title = Set(title);
        }
        if let Some(description) = patch.description {
            model.description = Set(description);
        }
        if let Some(custom_fields) = patch.custom_fields {
            model.custom_fields = Set(custom_fields);
        }
        model.updated_at = Set(Utc::now().fixed_offset());

        model.update(&self.db).await.map_err(StoreError::from)
    }
}

#[async_trait]
impl ConnectionStore for DatabaseStore {
    async fn find_connection(&self, id: Uuid) -> Result<Option<RepositoryConnection>> {
        ConnectionEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(StoreError::from)
    }

    async fn mark_synced(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let existing = self
            .find_connection(id)
            .await?
            .ok_or_else(|| StoreError::connection_not_found(id))?;

        let mut model: ConnectionActiveModel = existing.into();
        model.last_synced_at = Set(Some(at.fixed_offset()));
        model.update(&self.db).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_and_prepare;
    use crate::entity::issue_kind::{IssuePriority, IssueStatus, IssueType};
    use crate::entity::provider_type::ProviderType;
    use serde_json::json;

    async fn setup() -> DatabaseStore {
        let db = connect_and_prepare("sqlite::memory:")
            .await
            .expect("in-memory sqlite should prepare");
        DatabaseStore::new(db)
    }

    fn new_issue(project_id: Uuid, title: &str) -> NewIssue {
        NewIssue {
            project_id,
            title: title.to_string(),
            description: None,
            issue_type: IssueType::Bug,
            priority: Some(IssuePriority::High),
            status: IssueStatus::Open,
            reporter_id: Uuid::new_v4(),
            custom_fields: json!({
                "externalId": "github:https://github.com/o/r:1",
                "storyPoints": 3
            }),
        }
    }

    #[tokio::test]
    async fn create_and_find_round_trips_enums_and_json() {
        let store = setup().await;
        let project = Uuid::new_v4();

        let created = store.create_issue(new_issue(project, "crash")).await.unwrap();
        let found = store.find_issue_by_id(created.id).await.unwrap().unwrap();

        assert_eq!(found.title, "crash");
        assert_eq!(found.issue_type, IssueType::Bug);
        assert_eq!(found.priority, Some(IssuePriority::High));
        assert_eq!(found.custom_fields["storyPoints"], 3);

        let listed = store.find_issues_by_project(project).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(
            store
                .find_issues_by_project(Uuid::new_v4())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn update_changes_patched_columns() {
        let store = setup().await;
        let created = store
            .create_issue(new_issue(Uuid::new_v4(), "old"))
            .await
            .unwrap();

        let updated = store
            .update_issue(
                created.id,
                IssuePatch {
                    title: Some("new".to_string()),
                    description: Some(Some("details".to_string())),
                    custom_fields: Some(json!({"externalId": "changed"})),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "new");
        assert_eq!(updated.description.as_deref(), Some("details"));
        assert_eq!(updated.custom_fields["externalId"], "changed");
        assert_eq!(updated.status, IssueStatus::Open);
    }

    #[tokio::test]
    async fn update_missing_issue_is_not_found() {
        let store = setup().await;
        let err = store
            .update_issue(Uuid::new_v4(), IssuePatch::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn connections_insert_list_and_mark_synced() {
        let store = setup().await;
        let conn = store
            .insert_connection(NewConnection {
                project_id: Uuid::new_v4(),
                provider_type: ProviderType::GitLab,
                repository_url: "https://gitlab.com/g/p".to_string(),
                encrypted_access_token: "plain:secret".to_string(),
                created_by: Uuid::new_v4(),
            })
            .await
            .unwrap();

        let listed = store.list_connections().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].provider_type, ProviderType::GitLab);

        store.mark_synced(conn.id, Utc::now()).await.unwrap();
        let found = store.find_connection(conn.id).await.unwrap().unwrap();
        assert!(found.last_synced_at.is_some());
    }
}
