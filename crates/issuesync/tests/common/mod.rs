//! Shared fixtures for integration tests: a scripted HTTP transport, store
//! wrappers that fail or cancel on demand, and context builders.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use issuesync::http::{HttpError, HttpRequest, HttpResponse, HttpTransport};
use issuesync::store::{
    ConnectionStore, IssuePatch, IssueStore, MemoryConnectionStore, MemoryIssueStore,
    NewConnection, NewIssue, Result as StoreResult, StoreError,
};
use issuesync::sync::SyncContext;
use issuesync::{HttpProviderFactory, Issue, PlaintextCipher, ProviderType, RetryConfig};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const GITHUB_API: &str = "https://api.github.com/repos/acme/widgets";
pub const GITHUB_REPO: &str = "https://github.com/acme/widgets";

/// Transport answering from a per-URL queue of canned responses.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    inner: Arc<Mutex<Script>>,
}

#[derive(Default)]
struct Script {
    routes: HashMap<String, VecDeque<HttpResponse>>,
    requested: Vec<String>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: impl Into<String>, status: u16, headers: Vec<(String, String)>, body: Value) {
        let response = HttpResponse {
            status,
            headers,
            body: serde_json::to_vec(&body).unwrap(),
        };
        self.inner
            .lock()
            .unwrap()
            .routes
            .entry(url.into())
            .or_default()
            .push_back(response);
    }

    pub fn json(&self, url: impl Into<String>, body: Value) {
        self.respond(url, 200, vec![], body);
    }

    pub fn requested(&self) -> Vec<String> {
        self.inner.lock().unwrap().requested.clone()
    }

    pub fn was_requested(&self, url: &str) -> bool {
        self.requested().iter().any(|u| u == url)
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut script = self.inner.lock().unwrap();
        script.requested.push(request.url.clone());
        script
            .routes
            .get_mut(&request.url)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| HttpError::NoMockResponse {
                method: request.method.as_str().to_string(),
                url: request.url,
            })
    }
}

/// Issue store that fails `create_issue` for chosen titles and can cancel a
/// run after a number of successful creates.
pub struct ScriptedIssueStore {
    pub inner: MemoryIssueStore,
    fail_titles: Vec<String>,
    cancel_after: Option<(usize, CancellationToken)>,
    creates: AtomicUsize,
}

impl ScriptedIssueStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryIssueStore::new(),
            fail_titles: Vec::new(),
            cancel_after: None,
            creates: AtomicUsize::new(0),
        }
    }

    pub fn failing_on(mut self, title: &str) -> Self {
        self.fail_titles.push(title.to_string());
        self
    }

    pub fn cancelling_after(mut self, creates: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((creates, token));
        self
    }
}

#[async_trait]
impl IssueStore for ScriptedIssueStore {
    async fn find_issues_by_project(&self, project_id: Uuid) -> StoreResult<Vec<Issue>> {
        self.inner.find_issues_by_project(project_id).await
    }

    async fn find_issue_by_id(&self, id: Uuid) -> StoreResult<Option<Issue>> {
        self.inner.find_issue_by_id(id).await
    }

    async fn create_issue(&self, issue: NewIssue) -> StoreResult<Issue> {
        if self.fail_titles.contains(&issue.title) {
            return Err(StoreError::Other(format!("disk full writing {}", issue.title)));
        }
        let created = self.inner.create_issue(issue).await?;
        let count = self.creates.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, token)) = &self.cancel_after
            && count >= *after
        {
            token.cancel();
        }
        Ok(created)
    }

    async fn update_issue(&self, id: Uuid, patch: IssuePatch) -> StoreResult<Issue> {
        self.inner.update_issue(id, patch).await
    }
}

pub fn fast_retry() -> RetryConfig {
    RetryConfig::new(Duration::from_millis(10), 3, Duration::from_millis(50))
        .with_jitter(Duration::ZERO)
}

pub fn context(
    transport: &ScriptedTransport,
    issues: Arc<dyn IssueStore>,
    connections: Arc<dyn ConnectionStore>,
) -> SyncContext {
    SyncContext::builder()
        .issue_store(issues)
        .connection_store(connections)
        .cipher(Arc::new(PlaintextCipher))
        .provider_factory(Arc::new(HttpProviderFactory::new(Arc::new(
            transport.clone(),
        ))))
        .retry(fast_retry())
        .build()
        .unwrap()
}

pub async fn connection(
    store: &MemoryConnectionStore,
    provider: ProviderType,
    repository_url: &str,
) -> (Uuid, Uuid) {
    let project_id = Uuid::new_v4();
    let conn = store
        .insert(NewConnection {
            project_id,
            provider_type: provider,
            repository_url: repository_url.to_string(),
            encrypted_access_token: "plain:token".to_string(),
            created_by: Uuid::new_v4(),
        })
        .await;
    (conn.id, project_id)
}

pub fn github_issue(number: u64, title: &str) -> Value {
    serde_json::json!({
        "id": 90_000 + number,
        "number": number,
        "title": title,
        "body": format!("Body of {number}"),
        "state": "open",
        "labels": [],
        "assignees": [],
        "html_url": format!("{GITHUB_REPO}/issues/{number}")
    })
}

pub fn github_issues_url(page: u32) -> String {
    format!("{GITHUB_API}/issues?state=open&per_page=100&page={page}")
}

pub fn github_next_link(page: u32) -> Vec<(String, String)> {
    vec![(
        "Link".to_string(),
        format!(r#"<{}>; rel="next""#, github_issues_url(page)),
    )]
}

pub fn script_github_repo(transport: &ScriptedTransport) {
    transport.json(
        GITHUB_API,
        serde_json::json!({"id": 1, "full_name": "acme/widgets", "has_issues": true}),
    );
}
