use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use crate::bitbucket::BitbucketClient;
use crate::entity::provider_type::ProviderType;
use crate::github::GitHubClient;
use crate::gitlab::GitLabClient;
use crate::http::{HttpError, HttpTransport};
use crate::http::reqwest_transport::ReqwestTransport;

use super::errors::Result;
use super::rate_limit::ApiRateLimiter;
use super::repo_ref::RepoRef;
use super::types::IssueProvider;

/// Builds a provider adapter for a connection.
pub trait ProviderFactory: Send + Sync {
    /// Resolve `repository_url` and bind an adapter to it with `token`.
    fn create(
        &self,
        provider: ProviderType,
        repository_url: &str,
        token: &str,
    ) -> Result<Arc<dyn IssueProvider>>;
}

/// Factory producing the HTTP adapters over a shared transport.
///
/// Pacers are per provider and shared by every adapter the factory creates,
/// so concurrent runs against the same host draw from one budget.
#[derive(Clone)]
pub struct HttpProviderFactory {
    transport: Arc<dyn HttpTransport>,
    limiters: HashMap<ProviderType, ApiRateLimiter>,
    api_bases: HashMap<ProviderType, String>,
}

impl HttpProviderFactory {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            limiters: HashMap::new(),
            api_bases: HashMap::new(),
        }
    }

    /// Factory over a reqwest transport with the given request timeout.
    pub fn with_timeout(timeout: StdDuration) -> std::result::Result<Self, HttpError> {
        let transport = ReqwestTransport::with_timeout(timeout)?;
        Ok(Self::new(Arc::new(transport)))
    }

    /// Pace requests to `provider` at `requests_per_second`.
    #[must_use]
    pub fn with_rate_limit(mut self, provider: ProviderType, requests_per_second: u32) -> Self {
        self.limiters
            .insert(provider, ApiRateLimiter::new(requests_per_second));
        self
    }

    /// Pace every provider at its default rate.
    #[must_use]
    pub fn with_default_rate_limits(mut self) -> Self {
        for provider in [
            ProviderType::GitHub,
            ProviderType::GitLab,
            ProviderType::Bitbucket,
        ] {
            self.limiters
                .insert(provider, ApiRateLimiter::for_provider(provider));
        }
        self
    }

    /// Override the API root derived from repository URLs.
    #[must_use]
    pub fn with_api_base(mut self, provider: ProviderType, api_base: impl Into<String>) -> Self {
        self.api_bases.insert(provider, api_base.into());
        self
    }
}

impl ProviderFactory for HttpProviderFactory {
    fn create(
        &self,
        provider: ProviderType,
        repository_url: &str,
        token: &str,
    ) -> Result<Arc<dyn IssueProvider>> {
        let mut repo = RepoRef::parse(provider, repository_url)?;
        if let Some(base) = self.api_bases.get(&provider) {
            repo = repo.with_api_base(base.clone());
        }
        let limiter = self.limiters.get(&provider).cloned();
        let transport = Arc::clone(&self.transport);

        Ok(match provider {
            ProviderType::GitHub => Arc::new(GitHubClient::new_with_transport(
                repo, token, limiter, transport,
            )),
            ProviderType::GitLab => Arc::new(GitLabClient::new_with_transport(
                repo, token, limiter, transport,
            )),
            ProviderType::Bitbucket => Arc::new(BitbucketClient::new_with_transport(
                repo, token, limiter, transport,
            )),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockTransport;
    use crate::provider::ProviderError;

    #[test]
    fn creates_adapter_for_each_provider() {
        let factory = HttpProviderFactory::new(Arc::new(MockTransport::new()))
            .with_default_rate_limits()
            .with_api_base(ProviderType::GitLab, "http://localhost:8080/api/v4/");

        let gh = factory
            .create(ProviderType::GitHub, "https://github.com/o/r", "t")
            .unwrap();
        assert_eq!(gh.provider_type(), ProviderType::GitHub);
        assert_eq!(gh.max_page_size(), 100);

        let gl = factory
            .create(ProviderType::GitLab, "https://gitlab.com/g/p", "t")
            .unwrap();
        assert_eq!(gl.repository().api_base, "http://localhost:8080/api/v4");

        let bb = factory
            .create(ProviderType::Bitbucket, "https://bitbucket.org/w/s", "t")
            .unwrap();
        assert_eq!(bb.max_page_size(), 50);
        assert!(!bb.supports_advisories());
    }

    #[test]
    fn invalid_url_is_rejected() {
        let factory = HttpProviderFactory::new(Arc::new(MockTransport::new()));
        let err = factory
            .create(ProviderType::GitHub, "not a repo", "t")
            .err()
            .unwrap();
        assert!(matches!(err, ProviderError::InvalidRepository(_)));
    }
}
