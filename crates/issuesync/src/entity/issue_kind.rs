//! Issue classification enums: type, priority and status.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of work an issue represents.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    #[default]
    #[sea_orm(string_value = "task")]
    Task,
    #[sea_orm(string_value = "bug")]
    Bug,
    #[sea_orm(string_value = "feature")]
    Feature,
}

/// Issue priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum IssuePriority {
    #[sea_orm(string_value = "low")]
    Low,
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "high")]
    High,
    #[sea_orm(string_value = "critical")]
    Critical,
}

/// Local workflow status. Synced issues only ever land in `Open` or `Closed`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum IssueStatus {
    #[default]
    #[sea_orm(string_value = "open")]
    Open,
    #[sea_orm(string_value = "closed")]
    Closed,
}

macro_rules! impl_display {
    ($ty:ty { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($text),)+
                }
            }
        }
    };
}

impl_display!(IssueType { Task => "task", Bug => "bug", Feature => "feature" });
impl_display!(IssuePriority { Low => "low", Medium => "medium", High => "high", Critical => "critical" });
impl_display!(IssueStatus { Open => "open", Closed => "closed" });

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(IssueType::Feature.to_string(), "feature");
        assert_eq!(IssuePriority::Critical.to_string(), "critical");
        assert_eq!(IssueStatus::Closed.to_string(), "closed");
    }

    #[test]
    fn test_defaults() {
        assert_eq!(IssueType::default(), IssueType::Task);
        assert_eq!(IssueStatus::default(), IssueStatus::Open);
    }
}
