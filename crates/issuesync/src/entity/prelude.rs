//! Common re-exports for convenient entity usage.

pub use super::custom_fields::{ExternalSync, SyncedIssueCustomFields};
pub use super::issue::{
    ActiveModel as IssueActiveModel, Column as IssueColumn, Entity as IssueEntity,
    Model as Issue,
};
pub use super::issue_kind::{IssuePriority, IssueStatus, IssueType};
pub use super::provider_type::ProviderType;
pub use super::repository_connection::{
    ActiveModel as RepositoryConnectionActiveModel, Column as RepositoryConnectionColumn,
    Entity as RepositoryConnectionEntity, Model as RepositoryConnection,
};
