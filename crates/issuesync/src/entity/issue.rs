//! Issue entity: a local work item, possibly imported from a provider.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::custom_fields::SyncedIssueCustomFields;
use super::issue_kind::{IssuePriority, IssueStatus, IssueType};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "issues")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Owning project.
    pub project_id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: Option<String>,
    pub issue_type: IssueType,
    pub priority: Option<IssuePriority>,
    pub status: IssueStatus,
    /// User the issue is attributed to. For imported issues, the user who ran the sync.
    pub reporter_id: Uuid,
    /// Open key/value bag; see [`SyncedIssueCustomFields`].
    #[sea_orm(column_type = "Json")]
    pub custom_fields: Json,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Typed view of `custom_fields`.
    pub fn synced_fields(&self) -> Result<SyncedIssueCustomFields, serde_json::Error> {
        SyncedIssueCustomFields::from_json(&self.custom_fields)
    }
}
