//! Duplicate detection for incoming provider issues.
//!
//! Matching runs in two tiers against the project's local issues:
//!
//! 1. `customFields.externalId` equal to the incoming external id.
//! 2. Only when tier 1 found nothing: title and synced repository URL both
//!    equal, ignoring case and surrounding whitespace. Issues already tagged
//!    with an id for the same provider and repository belong to another
//!    remote issue and are never adopted.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;
use uuid::Uuid;

use crate::entity::custom_fields::{external_id_of, synced_repository_url_of};
use crate::entity::issue::Model as Issue;
use crate::external_id::{self, ExternalId};
use crate::store::{IssueStore, Result};

/// Which tier produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    ExternalId,
    TitleAndRepository,
}

/// Outcome of [`DuplicateMatcher::find_duplicate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchResult {
    pub matched: bool,
    pub issue_id: Option<Uuid>,
    pub match_type: Option<MatchType>,
}

impl MatchResult {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    fn found(issue_id: Uuid, match_type: MatchType) -> Self {
        Self {
            matched: true,
            issue_id: Some(issue_id),
            match_type: Some(match_type),
        }
    }
}

pub struct DuplicateMatcher {
    store: Arc<dyn IssueStore>,
    fallback_evaluations: AtomicU64,
}

impl DuplicateMatcher {
    pub fn new(store: Arc<dyn IssueStore>) -> Self {
        Self {
            store,
            fallback_evaluations: AtomicU64::new(0),
        }
    }

    /// Find the local issue an incoming provider issue corresponds to.
    pub async fn find_duplicate(
        &self,
        project_id: Uuid,
        external_id: &str,
        title: &str,
        repository_url: &str,
    ) -> Result<MatchResult> {
        let issues = self.store.find_issues_by_project(project_id).await?;

        if let Some(issue) = issues
            .iter()
            .find(|issue| external_id_of(&issue.custom_fields) == Some(external_id))
        {
            debug!(issue_id = %issue.id, external_id, "matched by external id");
            return Ok(MatchResult::found(issue.id, MatchType::ExternalId));
        }

        self.fallback_evaluations.fetch_add(1, Ordering::Relaxed);
        let incoming = external_id::parse(external_id).ok();
        let candidate = issues.iter().find(|issue| {
            matches_title_and_repository(issue, title, repository_url)
                && !tagged_for_same_repository(issue, incoming.as_ref())
        });

        Ok(match candidate {
            Some(issue) => {
                debug!(issue_id = %issue.id, external_id, "matched by title and repository");
                MatchResult::found(issue.id, MatchType::TitleAndRepository)
            }
            None => MatchResult::none(),
        })
    }

    /// Whether an issue other than `exclude_issue_id` already carries `external_id`.
    pub async fn is_external_id_in_use(
        &self,
        project_id: Uuid,
        external_id: &str,
        exclude_issue_id: Option<Uuid>,
    ) -> Result<bool> {
        let issues = self.store.find_issues_by_project(project_id).await?;
        Ok(issues.iter().any(|issue| {
            Some(issue.id) != exclude_issue_id
                && external_id_of(&issue.custom_fields) == Some(external_id)
        }))
    }

    /// Number of times the title/repository tier has run.
    #[must_use]
    pub fn fallback_evaluations(&self) -> u64 {
        self.fallback_evaluations.load(Ordering::Relaxed)
    }
}

fn matches_title_and_repository(issue: &Issue, title: &str, repository_url: &str) -> bool {
    let Some(synced_url) = synced_repository_url_of(&issue.custom_fields) else {
        return false;
    };
    loosely_equal(&issue.title, title) && loosely_equal(synced_url, repository_url)
}

/// The candidate already carries an id from the incoming issue's repository.
fn tagged_for_same_repository(issue: &Issue, incoming: Option<&ExternalId>) -> bool {
    let (Some(incoming), Some(existing)) = (incoming, external_id_of(&issue.custom_fields)) else {
        return false;
    };
    external_id::parse(existing).is_ok_and(|existing| {
        existing.provider == incoming.provider
            && loosely_equal(&existing.repository_url, &incoming.repository_url)
    })
}

fn loosely_equal(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryIssueStore, NewIssue};
    use crate::entity::issue_kind::{IssueStatus, IssueType};
    use serde_json::{Value, json};

    async fn seed(store: &MemoryIssueStore, project: Uuid, title: &str, fields: Value) -> Uuid {
        store
            .create_issue(NewIssue {
                project_id: project,
                title: title.to_string(),
                description: None,
                issue_type: IssueType::Task,
                priority: None,
                status: IssueStatus::Open,
                reporter_id: Uuid::nil(),
                custom_fields: fields,
            })
            .await
            .unwrap()
            .id
    }

    const REPO: &str = "https://github.com/acme/widgets";

    #[tokio::test]
    async fn external_id_match_skips_fallback_tier() {
        let store = Arc::new(MemoryIssueStore::new());
        let project = Uuid::new_v4();
        let id = seed(
            &store,
            project,
            "Unrelated title",
            json!({"externalId": "github:https://github.com/acme/widgets:7"}),
        )
        .await;

        let matcher = DuplicateMatcher::new(store);
        let result = matcher
            .find_duplicate(project, "github:https://github.com/acme/widgets:7", "x", REPO)
            .await
            .unwrap();

        assert_eq!(result.issue_id, Some(id));
        assert_eq!(result.match_type, Some(MatchType::ExternalId));
        assert_eq!(matcher.fallback_evaluations(), 0);
    }

    #[tokio::test]
    async fn fallback_ignores_case_and_whitespace() {
        let store = Arc::new(MemoryIssueStore::new());
        let project = Uuid::new_v4();
        let id = seed(
            &store,
            project,
            "  Login Fails ",
            json!({"externalSync": {"repositoryUrl": "HTTPS://github.com/Acme/Widgets"}}),
        )
        .await;

        let matcher = DuplicateMatcher::new(store);
        let result = matcher
            .find_duplicate(project, "github:x:1", "login fails", REPO)
            .await
            .unwrap();

        assert!(result.matched);
        assert_eq!(result.issue_id, Some(id));
        assert_eq!(result.match_type, Some(MatchType::TitleAndRepository));
        assert_eq!(matcher.fallback_evaluations(), 1);
    }

    #[tokio::test]
    async fn fallback_requires_repository_match() {
        let store = Arc::new(MemoryIssueStore::new());
        let project = Uuid::new_v4();
        seed(&store, project, "Login fails", json!({})).await;
        seed(
            &store,
            project,
            "Login fails",
            json!({"externalSync": {"repositoryUrl": "https://github.com/other/repo"}}),
        )
        .await;

        let matcher = DuplicateMatcher::new(store);
        let result = matcher
            .find_duplicate(project, "github:x:1", "Login fails", REPO)
            .await
            .unwrap();
        assert_eq!(result, MatchResult::none());
    }

    #[tokio::test]
    async fn fallback_skips_issues_tagged_for_the_same_repository() {
        let store = Arc::new(MemoryIssueStore::new());
        let project = Uuid::new_v4();
        seed(
            &store,
            project,
            "Typo",
            json!({
                "externalId": "github:https://github.com/acme/widgets:101",
                "externalSync": {"repositoryUrl": REPO}
            }),
        )
        .await;

        let matcher = DuplicateMatcher::new(store.clone());
        let result = matcher
            .find_duplicate(project, "github:https://github.com/acme/widgets:102", "Typo", REPO)
            .await
            .unwrap();
        assert_eq!(result, MatchResult::none());
        assert_eq!(matcher.fallback_evaluations(), 1);

        // A legacy id in another format is still adopted.
        let legacy = seed(
            &store,
            project,
            "Crash",
            json!({
                "externalId": "github:acme/widgets:7",
                "externalSync": {"repositoryUrl": REPO}
            }),
        )
        .await;
        let result = matcher
            .find_duplicate(project, "github:https://github.com/acme/widgets:7", "crash", REPO)
            .await
            .unwrap();
        assert_eq!(result.issue_id, Some(legacy));
    }

    #[tokio::test]
    async fn matching_is_scoped_to_the_project() {
        let store = Arc::new(MemoryIssueStore::new());
        seed(&store, Uuid::new_v4(), "t", json!({"externalId": "e"})).await;

        let matcher = DuplicateMatcher::new(store);
        let result = matcher
            .find_duplicate(Uuid::new_v4(), "e", "t", REPO)
            .await
            .unwrap();
        assert!(!result.matched);
    }

    #[tokio::test]
    async fn external_id_in_use_honors_exclusion() {
        let store = Arc::new(MemoryIssueStore::new());
        let project = Uuid::new_v4();
        let owner = seed(&store, project, "t", json!({"externalId": "e"})).await;

        let matcher = DuplicateMatcher::new(store);
        assert!(matcher.is_external_id_in_use(project, "e", None).await.unwrap());
        assert!(
            !matcher
                .is_external_id_in_use(project, "e", Some(owner))
                .await
                .unwrap()
        );
        assert!(!matcher.is_external_id_in_use(project, "other", None).await.unwrap());
    }
}
