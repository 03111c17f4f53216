//! GitLab REST client for issues and vulnerability findings.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use tracing::debug;

use crate::entity::provider_type::ProviderType;
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpRequest, HttpResponse, HttpTransport};
use crate::provider::{
    ApiRateLimiter, IssuePage, IssueProvider, PageQuery, ProviderError, RawIssue, RepoRef, Result,
    StateFilter, decode_array, decode_items, decode_json, send_get,
};

use super::types::{GitLabFinding, GitLabIssue, GitLabProject};

/// Largest `per_page` GitLab accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Read GitLab's offset pagination headers.
///
/// `x-next-page` is empty on the last page; `x-total` is omitted for large
/// collections.
pub fn parse_pagination_headers(response: &HttpResponse) -> (Option<u32>, Option<usize>) {
    let next = response
        .header("x-next-page")
        .and_then(|v| v.trim().parse::<u32>().ok());
    let total = response
        .header("x-total")
        .and_then(|v| v.trim().parse::<usize>().ok());
    (next, total)
}

/// GitLab client bound to one project.
#[derive(Clone)]
pub struct GitLabClient {
    transport: Arc<dyn HttpTransport>,
    repo: RepoRef,
    token: String,
    rate_limiter: Option<ApiRateLimiter>,
}

impl GitLabClient {
    /// Create a client using a reqwest transport with a 30s timeout.
    pub fn new(repo: RepoRef, token: &str, rate_limiter: Option<ApiRateLimiter>) -> Result<Self> {
        let transport = ReqwestTransport::with_timeout(StdDuration::from_secs(30))
            .map_err(|e| ProviderError::network(ProviderType::GitLab, e))?;
        Ok(Self::new_with_transport(
            repo,
            token,
            rate_limiter,
            Arc::new(transport),
        ))
    }

    pub fn new_with_transport(
        repo: RepoRef,
        token: &str,
        rate_limiter: Option<ApiRateLimiter>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            transport,
            repo,
            token: token.to_string(),
            rate_limiter,
        }
    }

    fn project_url(&self) -> String {
        format!("{}/projects/{}", self.repo.api_base, self.repo.encoded_path())
    }

    /// Make an authenticated GET request.
    async fn get(&self, url: String) -> Result<HttpResponse> {
        let mut request = HttpRequest::get(url).header("Accept", "application/json");
        if !self.token.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.token));
        }
        send_get(
            ProviderType::GitLab,
            self.transport.as_ref(),
            self.rate_limiter.as_ref(),
            request,
        )
        .await
    }

    fn page_from(response: &HttpResponse, issues: Vec<RawIssue>) -> IssuePage {
        let (next_page, total_count) = parse_pagination_headers(response);
        let has_next = next_page.is_some() && !issues.is_empty();
        IssuePage {
            issues,
            has_next,
            next_page: next_page.filter(|_| has_next),
            total_count,
        }
    }
}

#[async_trait]
impl IssueProvider for GitLabClient {
    fn provider_type(&self) -> ProviderType {
        ProviderType::GitLab
    }

    fn repository(&self) -> &RepoRef {
        &self.repo
    }

    fn max_page_size(&self) -> u32 {
        MAX_PAGE_SIZE
    }

    fn supports_advisories(&self) -> bool {
        true
    }

    async fn validate_access(&self) -> Result<()> {
        let response = self.get(self.project_url()).await?;
        let project: GitLabProject = decode_json(ProviderType::GitLab, &response)?;
        debug!(
            id = project.id,
            path = %project.path_with_namespace,
            issues_enabled = ?project.issues_enabled,
            "GitLab project accessible"
        );
        Ok(())
    }

    async fn list_issues(&self, query: &PageQuery) -> Result<IssuePage> {
        let state = match query.state {
            StateFilter::Open => "opened",
            StateFilter::All => "all",
        };
        let url = format!(
            "{}/issues?state={}&per_page={}&page={}",
            self.project_url(),
            state,
            query.page_size(MAX_PAGE_SIZE),
            query.page
        );

        let response = self.get(url).await?;
        let values = decode_array(ProviderType::GitLab, &response)?;
        let issues =
            decode_items::<GitLabIssue>(ProviderType::GitLab, values, "iid", RawIssue::GitLab);
        Ok(Self::page_from(&response, issues))
    }

    async fn list_advisories(&self, query: &PageQuery) -> Result<IssuePage> {
        let url = format!(
            "{}/vulnerability_findings?per_page={}&page={}",
            self.project_url(),
            query.page_size(MAX_PAGE_SIZE),
            query.page
        );

        let response = match self.get(url).await {
            Ok(response) => response,
            // Security dashboards are a paid tier; treat absence as "no findings".
            Err(ProviderError::NotFound { .. }) => {
                debug!(project = %self.repo.full_path(), "Vulnerability findings unavailable");
                return Ok(IssuePage::empty());
            }
            Err(e) => return Err(e),
        };

        let values = decode_array(ProviderType::GitLab, &response)?;
        let findings = decode_items::<GitLabFinding>(
            ProviderType::GitLab,
            values,
            "id",
            RawIssue::GitLabFinding,
        );
        Ok(Self::page_from(&response, findings))
    }
}
