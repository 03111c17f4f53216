//! RepositoryConnection entity: a project's link to one remote repository.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::provider_type::ProviderType;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "repository_connections")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Project that receives the synced issues.
    pub project_id: Uuid,
    pub provider_type: ProviderType,
    /// Web URL of the repository as entered by the user.
    #[sea_orm(column_type = "Text")]
    pub repository_url: String,
    /// Access token, encrypted at rest.
    #[serde(skip_serializing)]
    #[sea_orm(column_type = "Text")]
    pub encrypted_access_token: String,
    pub created_by: Uuid,
    pub created_at: DateTimeWithTimeZone,
    /// Completion time of the last successful sync run.
    pub last_synced_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
