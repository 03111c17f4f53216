//! Provider type enum for the three supported Git hosts.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Supported issue providers.
///
/// This is the *kind* of host software, not a specific deployment: both
/// `github.com` and a GitHub Enterprise server are `ProviderType::GitHub`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// GitHub (github.com or GitHub Enterprise)
    #[sea_orm(string_value = "github")]
    GitHub,
    /// GitLab (gitlab.com or self-hosted GitLab)
    #[sea_orm(string_value = "gitlab")]
    GitLab,
    /// Bitbucket Cloud
    #[sea_orm(string_value = "bitbucket")]
    Bitbucket,
}

impl ProviderType {
    /// Stable lowercase identifier, also used as the external id prefix.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderType::GitHub => "github",
            ProviderType::GitLab => "gitlab",
            ProviderType::Bitbucket => "bitbucket",
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "github" => Ok(ProviderType::GitHub),
            "gitlab" => Ok(ProviderType::GitLab),
            "bitbucket" => Ok(ProviderType::Bitbucket),
            _ => Err(format!("Unknown provider type: {}", s)),
        }
    }
}
