//! External identifiers: `{provider}:{repositoryUrl}:{issueId}`.
//!
//! Repository URLs contain colons (`https://`, ports), so parsing takes the
//! provider up to the first colon and the issue id after the last one;
//! everything in between is the URL.

use thiserror::Error;

use crate::entity::provider_type::ProviderType;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExternalIdError {
    #[error("Malformed external id: {0}")]
    Malformed(String),

    #[error("Unknown provider in external id: {0}")]
    UnknownProvider(String),
}

/// Parsed form of an external id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalId {
    pub provider: ProviderType,
    pub repository_url: String,
    pub issue_id: String,
}

/// Build the external id for an issue.
pub fn generate(provider: ProviderType, repository_url: &str, issue_id: &str) -> String {
    format!("{provider}:{repository_url}:{issue_id}")
}

/// Split an external id back into its parts.
pub fn parse(external_id: &str) -> Result<ExternalId, ExternalIdError> {
    let malformed = || ExternalIdError::Malformed(external_id.to_string());

    let (provider, rest) = external_id.split_once(':').ok_or_else(malformed)?;
    let (repository_url, issue_id) = rest.rsplit_once(':').ok_or_else(malformed)?;
    if repository_url.is_empty() || issue_id.is_empty() {
        return Err(malformed());
    }

    let provider = provider
        .parse::<ProviderType>()
        .map_err(|_| ExternalIdError::UnknownProvider(provider.to_string()))?;

    Ok(ExternalId {
        provider,
        repository_url: repository_url.to_string(),
        issue_id: issue_id.to_string(),
    })
}

impl std::fmt::Display for ExternalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&generate(self.provider, &self.repository_url, &self.issue_id))
    }
}
