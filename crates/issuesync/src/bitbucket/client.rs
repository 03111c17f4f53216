//! Bitbucket Cloud REST client for repository issues.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use tracing::debug;

use crate::entity::provider_type::ProviderType;
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpRequest, HttpResponse, HttpTransport};
use crate::provider::{
    ApiRateLimiter, IssuePage, IssueProvider, PageQuery, ProviderError, RawIssue, RepoRef, Result,
    decode_items, decode_json, send_get,
};

use super::types::{BitbucketIssue, BitbucketPage, BitbucketRepository};

/// Largest `pagelen` Bitbucket accepts for issues.
pub const MAX_PAGE_SIZE: u32 = 50;

/// Bitbucket client bound to one repository.
///
/// Bitbucket has no advisory endpoint and no server-side open/closed filter
/// that maps cleanly onto the two-state model; closed issues are returned and
/// filtered by the caller when `include_closed` is off.
#[derive(Clone)]
pub struct BitbucketClient {
    transport: Arc<dyn HttpTransport>,
    repo: RepoRef,
    token: String,
    rate_limiter: Option<ApiRateLimiter>,
}

impl BitbucketClient {
    /// Create a client using a reqwest transport with a 30s timeout.
    pub fn new(repo: RepoRef, token: &str, rate_limiter: Option<ApiRateLimiter>) -> Result<Self> {
        let transport = ReqwestTransport::with_timeout(StdDuration::from_secs(30))
            .map_err(|e| ProviderError::network(ProviderType::Bitbucket, e))?;
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
            "{}/repositories/{}/{}",
            self.repo.api_base, self.repo.namespace, self.repo.name
        )
    }

    /// Make an authenticated GET request.
    async fn get(&self, url: String) -> Result<HttpResponse> {
        let mut request = HttpRequest::get(url).header("Accept", "application/json");
        if !self.token.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.token));
        }
        send_get(
            ProviderType::Bitbucket,
            self.transport.as_ref(),
            self.rate_limiter.as_ref(),
            request,
        )
        .await
    }
}

/// Page number of a `next` link, if it carries one.
fn page_of(next: &str) -> Option<u32> {
    let url = url::Url::parse(next).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "page")
        .and_then(|(_, v)| v.parse().ok())
}

#[async_trait]
impl IssueProvider for BitbucketClient {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Bitbucket
    }

    fn repository(&self) -> &RepoRef {
        &self.repo
    }

    fn max_page_size(&self) -> u32 {
        MAX_PAGE_SIZE
    }

    async fn validate_access(&self) -> Result<()> {
        let response = self.get(self.repo_url()).await?;
        let repo: BitbucketRepository = decode_json(ProviderType::Bitbucket, &response)?;
        if repo.has_issues == Some(false) {
            return Err(ProviderError::not_found(
                ProviderType::Bitbucket,
                format!("issue tracker of {}", repo.full_name),
            ));
        }
        debug!(full_name = %repo.full_name, "Bitbucket repository accessible");
        Ok(())
    }

    async fn list_issues(&self, query: &PageQuery) -> Result<IssuePage> {
        let url = format!(
            "{}/issues?pagelen={}&page={}",
            self.repo_url(),
            query.page_size(MAX_PAGE_SIZE),
            query.page
        );

        let response = self.get(url).await?;
        let envelope: BitbucketPage<serde_json::Value> =
            decode_json(ProviderType::Bitbucket, &response)?;

        let issues = decode_items::<BitbucketIssue>(
            ProviderType::Bitbucket,
            envelope.values,
            "id",
            RawIssue::Bitbucket,
        );
        let has_next = envelope.next.is_some() && !issues.is_empty();
        let next_page = envelope
            .next
            .as_deref()
            .filter(|_| has_next)
            .map(|next| page_of(next).unwrap_or(query.page + 1));

        Ok(IssuePage {
            issues,
            has_next,
            next_page,
            total_count: envelope.size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpMethod, MockTransport};
    use crate::provider::IssueState;
    use serde_json::json;

    const API: &str = "https://api.bitbucket.org/2.0/repositories/ws/repo";

    fn client(transport: &MockTransport) -> BitbucketClient {
        let repo = RepoRef::parse(ProviderType::Bitbucket, "https://bitbucket.org/ws/repo").unwrap();
        BitbucketClient::new_with_transport(repo, "bb", None, Arc::new(transport.clone()))
    }

    #[tokio::test]
    async fn envelope_pagination_and_clamp() {
        let transport = MockTransport::new();
        transport.push_json(
            format!("{API}/issues?pagelen=50&page=1"),
            json!({
                "size": 2,
                "page": 1,
                "pagelen": 50,
                "next": format!("{API}/issues?pagelen=50&page=2"),
                "values": [
                    {"id": 1, "title": "one", "state": "new"},
                    {"id": 2, "title": "two", "state": "resolved"}
                ]
            }),
            vec![],
        );

        let page = client(&transport)
            .list_issues(&PageQuery::new(1, 100, false))
            .await
            .unwrap();
        assert_eq!(page.issues.len(), 2);
        assert!(page.has_next);
        assert_eq!(page.next_page, Some(2));
        assert_eq!(page.total_count, Some(2));
        assert_eq!(
            page.issues[1].normalize().unwrap().state,
            IssueState::Closed
        );
    }

    #[tokio::test]
    async fn last_page_has_no_next() {
        let transport = MockTransport::new();
        transport.push_json(
            format!("{API}/issues?pagelen=10&page=3"),
            json!({"values": [{"id": 9, "title": "nine", "state": "open"}]}),
            vec![],
        );
        let page = client(&transport)
            .list_issues(&PageQuery::new(3, 10, true))
            .await
            .unwrap();
        assert!(!page.has_next);
        assert_eq!(page.next_page, None);
    }

    #[tokio::test]
    async fn advisories_are_unsupported_and_empty() {
        let transport = MockTransport::new();
        let bb = client(&transport);
        assert!(!bb.supports_advisories());
        let page = bb.list_advisories(&PageQuery::new(1, 50, false)).await.unwrap();
        assert!(page.issues.is_empty());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn disabled_issue_tracker_fails_validation() {
        let transport = MockTransport::new();
        transport.push_json(API, json!({"full_name": "ws/repo", "has_issues": false}), vec![]);
        let err = client(&transport).validate_access().await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound { .. }));
    }

    #[tokio::test]
    async fn too_many_requests_is_rate_limited() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Get,
            format!("{API}/issues?pagelen=50&page=1"),
            HttpResponse {
                status: 429,
                headers: vec![],
                body: vec![],
            },
        );
        let err = client(&transport)
            .list_issues(&PageQuery::new(1, 50, false))
            .await
            .unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(err.retry_after(), None);
    }
}
