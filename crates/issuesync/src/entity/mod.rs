//! SeaORM entity definitions for the issuesync database schema.

pub mod custom_fields;
pub mod issue;
pub mod issue_kind;
pub mod prelude;
pub mod provider_type;
pub mod repository_connection;
