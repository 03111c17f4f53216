//! GitHub REST client for issues and Dependabot alerts.

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

use super::types::{GitHubAlert, GitHubIssue, GitHubRepository};

/// Largest `per_page` GitHub accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// REST API version requested on every call.
pub const API_VERSION: &str = "2022-11-28";

/// Pagination parsed from a `Link` header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkPagination {
    /// The last page number (from rel="last" link).
    pub last_page: Option<u32>,
    /// The next page number (from rel="next" link).
    pub next_page: Option<u32>,
    /// Whether a rel="next" link exists at all (cursor links carry no page number).
    pub has_next: bool,
}

/// Parse the Link header to extract pagination info.
///
/// GitHub Link headers look like:
/// `<https://api.github.com/repositories/1/issues?per_page=100&page=2>; rel="next", <...&page=3>; rel="last"`
pub fn parse_link_header(link_header: &str) -> LinkPagination {
    let mut info = LinkPagination::default();

    for part in link_header.split(',') {
        let mut url = None;
        let mut rel = None;

        for segment in part.trim().split(';') {
            let segment = segment.trim();
            if let Some(inner) = segment.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
                url = Some(inner);
            } else if let Some(rel_value) = segment.strip_prefix("rel=") {
                rel = Some(rel_value.trim_matches('"'));
            }
        }

        let (Some(url), Some(rel)) = (url, rel) else {
            continue;
        };
        match rel {
            "next" => {
                info.has_next = true;
                info.next_page = extract_page_from_url(url);
            }
            "last" => info.last_page = extract_page_from_url(url),
            _ => {}
        }
    }

    info
}

/// Extract the `page` query parameter from a URL.
fn extract_page_from_url(url: &str) -> Option<u32> {
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "page")
        .and_then(|(_, value)| value.parse().ok())
}

/// GitHub client bound to one repository.
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    repo: RepoRef,
    token: String,
    /// Optional proactive pacer.
    rate_limiter: Option<ApiRateLimiter>,
}

impl GitHubClient {
    /// Create a client using a reqwest transport with a 30s timeout.
    pub fn new(repo: RepoRef, token: &str, rate_limiter: Option<ApiRateLimiter>) -> Result<Self> {
        let transport = ReqwestTransport::with_timeout(StdDuration::from_secs(30))
            .map_err(|e| ProviderError::network(ProviderType::GitHub, e))?;
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

    fn repo_url(&self) -> String {
        format!(
            "{}/repos/{}/{}",
            self.repo.api_base, self.repo.namespace, self.repo.name
        )
    }

    /// Make an authenticated GET request.
    async fn get(&self, url: String) -> Result<HttpResponse> {
        let mut request = HttpRequest::get(url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", "issuesync");
        if !self.token.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.token));
        }
        send_get(
            ProviderType::GitHub,
            self.transport.as_ref(),
            self.rate_limiter.as_ref(),
            request,
        )
        .await
    }

    fn page_from(response: &HttpResponse, issues: Vec<RawIssue>, query: &PageQuery) -> IssuePage {
        let link = response
            .header("link")
            .map(parse_link_header)
            .unwrap_or_default();
        let has_next = link.has_next && !issues.is_empty();
        IssuePage {
            issues,
            has_next,
            next_page: has_next.then(|| link.next_page.unwrap_or(query.page + 1)),
            total_count: None,
        }
    }
}

#[async_trait]
impl IssueProvider for GitHubClient {
    fn provider_type(&self) -> ProviderType {
        ProviderType::GitHub
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
        let response = self.get(self.repo_url()).await?;
        let repo: GitHubRepository = decode_json(ProviderType::GitHub, &response)?;
        debug!(
            id = repo.id,
            full_name = %repo.full_name,
            has_issues = ?repo.has_issues,
            "GitHub repository accessible"
        );
        Ok(())
    }

    async fn list_issues(&self, query: &PageQuery) -> Result<IssuePage> {
        let state = match query.state {
            StateFilter::Open => "open",
            StateFilter::All => "all",
        };
        let url = format!(
            "{}/issues?state={}&per_page={}&page={}",
            self.repo_url(),
            state,
            query.page_size(MAX_PAGE_SIZE),
            query.page
        );

        let response = self.get(url).await?;
        let values = decode_array(ProviderType::GitHub, &response)?;
        let issues = decode_items::<GitHubIssue>(
            ProviderType::GitHub,
            values,
            "number",
            RawIssue::GitHub,
        );
        Ok(Self::page_from(&response, issues, query))
    }

    async fn list_advisories(&self, query: &PageQuery) -> Result<IssuePage> {
        let mut url = format!(
            "{}/dependabot/alerts?per_page={}&page={}",
            self.repo_url(),
            query.page_size(MAX_PAGE_SIZE),
            query.page
        );
        if query.state == StateFilter::Open {
            url.push_str("&state=open");
        }

        let response = match self.get(url).await {
            Ok(response) => response,
            // Dependabot disabled, or the token cannot see alerts.
            Err(ProviderError::NotFound { .. }) => {
                debug!(repo = %self.repo.full_path(), "Dependabot alerts unavailable");
                return Ok(IssuePage::empty());
            }
            Err(e) => return Err(e),
        };

        let values = decode_array(ProviderType::GitHub, &response)?;
        let alerts = decode_items::<GitHubAlert>(
            ProviderType::GitHub,
            values,
            "number",
            RawIssue::GitHubAlert,
        );
        Ok(Self::page_from(&response, alerts, query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpMethod, MockTransport, header_get};
    use serde_json::json;

    const API: &str = "https://api.github.com/repos/octo/app";

    fn client(transport: &MockTransport, token: &str) -> GitHubClient {
        let repo = RepoRef::parse(ProviderType::GitHub, "https://github.com/octo/app").unwrap();
        GitHubClient::new_with_transport(repo, token, None, Arc::new(transport.clone()))
    }

    fn issue_json(number: u64) -> serde_json::Value {
        json!({
            "id": 1000 + number,
            "number": number,
            "title": format!("Issue {number}"),
            "state": "open",
            "labels": [],
            "assignees": []
        })
    }

    #[test]
    fn test_parse_link_header_full() {
        let header = r#"<https://api.github.com/repositories/1/issues?per_page=100&page=2>; rel="next", <https://api.github.com/repositories/1/issues?per_page=100&page=3>; rel="last""#;
        let info = parse_link_header(header);
        assert!(info.has_next);
        assert_eq!(info.next_page, Some(2));
        assert_eq!(info.last_page, Some(3));
    }

    #[test]
    fn test_parse_link_header_cursor_only() {
        let header = r#"<https://api.github.com/repos/o/r/dependabot/alerts?after=Y3Vyc29y>; rel="next""#;
        let info = parse_link_header(header);
        assert!(info.has_next);
        assert_eq!(info.next_page, None);
    }

    #[test]
    fn test_parse_link_header_last_page() {
        let header = r#"<https://api.github.com/x?page=1>; rel="prev", <https://api.github.com/x?page=1>; rel="first""#;
        assert_eq!(parse_link_header(header), LinkPagination::default());
    }

    #[tokio::test]
    async fn list_issues_pages_and_clamps_page_size() {
        let transport = MockTransport::new();
        transport.push_json(
            format!("{API}/issues?state=all&per_page=100&page=1"),
            json!([issue_json(1), issue_json(2)]),
            vec![(
                "Link".into(),
                format!(r#"<{API}/issues?state=all&per_page=100&page=2>; rel="next""#),
            )],
        );

        let gh = client(&transport, "tok");
        let page = gh.list_issues(&PageQuery::new(1, 500, true)).await.unwrap();
        assert_eq!(page.issues.len(), 2);
        assert!(page.has_next);
        assert_eq!(page.next_page, Some(2));

        let requests = transport.requests();
        assert_eq!(
            header_get(&requests[0].headers, "authorization"),
            Some("Bearer tok")
        );
        assert_eq!(
            header_get(&requests[0].headers, "x-github-api-version"),
            Some(API_VERSION)
        );
    }

    #[tokio::test]
    async fn anonymous_client_sends_no_authorization() {
        let transport = MockTransport::new();
        transport.push_json(
            format!("{API}/issues?state=open&per_page=30&page=1"),
            json!([]),
            vec![],
        );
        let page = client(&transport, "")
            .list_issues(&PageQuery::new(1, 30, false))
            .await
            .unwrap();
        assert!(page.issues.is_empty());
        assert!(!page.has_next);
        assert_eq!(header_get(&transport.requests()[0].headers, "authorization"), None);
    }

    #[tokio::test]
    async fn forbidden_is_rate_limited_with_reset_delay() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Get,
            format!("{API}/issues?state=open&per_page=100&page=1"),
            HttpResponse {
                status: 403,
                headers: vec![("Retry-After".into(), "30".into())],
                body: br#"{"message":"API rate limit exceeded"}"#.to_vec(),
            },
        );
        let err = client(&transport, "t")
            .list_issues(&PageQuery::new(1, 100, false))
            .await
            .unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(err.retry_after(), Some(StdDuration::from_secs(30)));
    }

    #[tokio::test]
    async fn advisories_use_state_filter_and_tolerate_404() {
        let transport = MockTransport::new();
        transport.push_json(
            format!("{API}/dependabot/alerts?per_page=50&page=1&state=open"),
            json!([{
                "number": 9,
                "state": "open",
                "security_advisory": {
                    "ghsa_id": "GHSA-1", "summary": "Bad", "severity": "high"
                }
            }]),
            vec![],
        );
        let gh = client(&transport, "t");
        let page = gh
            .list_advisories(&PageQuery::new(1, 50, false))
            .await
            .unwrap();
        assert_eq!(page.issues.len(), 1);
        assert!(page.issues[0].normalize().unwrap().security_advisory);

        transport.push_response(
            HttpMethod::Get,
            format!("{API}/dependabot/alerts?per_page=50&page=1"),
            HttpResponse {
                status: 404,
                headers: vec![],
                body: vec![],
            },
        );
        let page = gh
            .list_advisories(&PageQuery::new(1, 50, true))
            .await
            .unwrap();
        assert!(page.issues.is_empty());
    }

    #[tokio::test]
    async fn validate_access_reads_repository() {
        let transport = MockTransport::new();
        transport.push_json(API, json!({"id": 1, "full_name": "octo/app"}), vec![]);
        assert!(client(&transport, "t").validate_access().await.is_ok());

        transport.push_response(
            HttpMethod::Get,
            API,
            HttpResponse {
                status: 401,
                headers: vec![],
                body: vec![],
            },
        );
        let err = client(&transport, "t").validate_access().await.unwrap_err();
        assert!(matches!(err, ProviderError::Unauthorized { .. }));
    }
}
