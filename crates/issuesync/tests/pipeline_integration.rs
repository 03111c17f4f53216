//! Per-issue pipeline behaviour through the public API.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use issuesync::provider::{IssueState, Label, ProviderIssue, ProviderIssueId};
use issuesync::store::{IssueStore, MemoryConnectionStore, MemoryIssueStore, NewIssue};
use issuesync::sync::{IssueOutcome, SyncTarget, process_issue};
use issuesync::{IssueStatus, IssueType, MatchType, ProviderType, SyncedIssueCustomFields};
use serde_json::json;
use uuid::Uuid;

use common::*;

fn target(project_id: Uuid) -> SyncTarget {
    SyncTarget {
        project_id,
        user_id: Uuid::new_v4(),
        provider: ProviderType::GitHub,
        repository_url: GITHUB_REPO.to_string(),
    }
}

fn provider_issue(number: u64, title: &str) -> ProviderIssue {
    ProviderIssue {
        id: ProviderIssueId::Number(number),
        number,
        title: title.to_string(),
        body: Some("Steps to reproduce".to_string()),
        state: IssueState::Open,
        labels: BTreeSet::from([Label::named("bug")]),
        assignees: Vec::new(),
        created_at: None,
        updated_at: None,
        url: Some(format!("{GITHUB_REPO}/issues/{number}")),
        security_advisory: false,
        priority_hint: None,
    }
}

#[tokio::test]
async fn processing_the_same_issue_twice_creates_once() {
    let issues = Arc::new(MemoryIssueStore::new());
    let ctx = context(
        &ScriptedTransport::new(),
        issues.clone(),
        Arc::new(MemoryConnectionStore::new()),
    );
    let target = target(Uuid::new_v4());
    let t0 = Utc::now();

    let first = process_issue(&ctx, &target, &provider_issue(8, "Crash on save"), t0)
        .await
        .unwrap();
    assert_eq!(first.outcome, IssueOutcome::Created);
    assert_eq!(first.match_type, None);

    let mut edited = provider_issue(8, "Crash on save (regression)");
    edited.body = None;
    let second = process_issue(&ctx, &target, &edited, t0 + Duration::minutes(5))
        .await
        .unwrap();
    assert_eq!(second.outcome, IssueOutcome::Updated);
    assert_eq!(second.match_type, Some(MatchType::ExternalId));
    assert_eq!(second.issue_id, first.issue_id);

    let stored = issues.all().await;
    assert_eq!(stored.len(), 1);
    let issue = &stored[0];
    assert_eq!(issue.title, "Crash on save (regression)");
    assert_eq!(issue.description, None);
    assert_eq!(issue.issue_type, IssueType::Bug);

    let sync = issue.synced_fields().unwrap().external_sync.unwrap();
    assert_eq!(sync.synced_at, t0);
    assert_eq!(sync.last_synced_at, Some(t0 + Duration::minutes(5)));
    assert_eq!(sync.issue_number, Some(8));
}

#[tokio::test]
async fn update_keeps_local_status_and_foreign_custom_fields() {
    let issues = Arc::new(MemoryIssueStore::new());
    let ctx = context(
        &ScriptedTransport::new(),
        issues.clone(),
        Arc::new(MemoryConnectionStore::new()),
    );
    let target = target(Uuid::new_v4());

    let created = process_issue(&ctx, &target, &provider_issue(3, "Slow query"), Utc::now())
        .await
        .unwrap();

    let mut fields = issues
        .find_issue_by_id(created.issue_id)
        .await
        .unwrap()
        .unwrap()
        .custom_fields;
    fields["sprint"] = json!("2024-W19");
    issues
        .update_issue(
            created.issue_id,
            issuesync::IssuePatch {
                custom_fields: Some(fields),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let mut closed = provider_issue(3, "Slow query");
    closed.state = IssueState::Closed;
    process_issue(&ctx, &target, &closed, Utc::now()).await.unwrap();

    let issue = issues.find_issue_by_id(created.issue_id).await.unwrap().unwrap();
    assert_eq!(issue.status, IssueStatus::Open);
    assert_eq!(issue.custom_fields["sprint"], "2024-W19");
}

#[tokio::test]
async fn title_fallback_adopts_a_previously_synced_issue() {
    let project_id = Uuid::new_v4();
    let issues = Arc::new(MemoryIssueStore::new());
    // Imported earlier under an external id format that no longer matches.
    let legacy = issues
        .create_issue(NewIssue {
            project_id,
            title: "  Login Fails On Safari ".to_string(),
            description: None,
            issue_type: IssueType::Bug,
            priority: None,
            status: IssueStatus::Open,
            reporter_id: Uuid::new_v4(),
            custom_fields: json!({
                "externalId": "github:acme/widgets:41",
                "externalSync": {
                    "providerType": "github",
                    "repositoryUrl": GITHUB_REPO,
                    "syncedAt": "2024-01-01T00:00:00Z"
                }
            }),
        })
        .await
        .unwrap();

    let ctx = context(
        &ScriptedTransport::new(),
        issues.clone(),
        Arc::new(MemoryConnectionStore::new()),
    );
    assert_eq!(ctx.matcher().fallback_evaluations(), 0);

    let result = process_issue(
        &ctx,
        &target(project_id),
        &provider_issue(41, "login fails on safari"),
        Utc::now(),
    )
    .await
    .unwrap();

    assert_eq!(result.outcome, IssueOutcome::Updated);
    assert_eq!(result.match_type, Some(MatchType::TitleAndRepository));
    assert_eq!(result.issue_id, legacy.id);
    assert_eq!(ctx.matcher().fallback_evaluations(), 1);

    let fields =
        SyncedIssueCustomFields::from_json(&issues.all().await[0].custom_fields).unwrap();
    assert_eq!(
        fields.external_id.as_deref(),
        Some("github:https://github.com/acme/widgets:41")
    );

    // The rewritten id now matches directly; the fallback is not consulted again.
    process_issue(
        &ctx,
        &target(project_id),
        &provider_issue(41, "Login fails on Safari"),
        Utc::now(),
    )
    .await
    .unwrap();
    assert_eq!(ctx.matcher().fallback_evaluations(), 1);
    assert_eq!(issues.len().await, 1);
}

#[tokio::test]
async fn remote_issues_sharing_a_title_stay_separate() {
    let issues = Arc::new(MemoryIssueStore::new());
    let ctx = context(
        &ScriptedTransport::new(),
        issues.clone(),
        Arc::new(MemoryConnectionStore::new()),
    );
    let target = target(Uuid::new_v4());

    for _ in 0..2 {
        for number in [101, 102] {
            process_issue(&ctx, &target, &provider_issue(number, "Typo"), Utc::now())
                .await
                .unwrap();
        }
    }

    let stored = issues.all().await;
    assert_eq!(stored.len(), 2);
    let mut ids: Vec<_> = stored
        .iter()
        .map(|issue| issue.synced_fields().unwrap().external_id.unwrap())
        .collect();
    ids.sort();
    assert_eq!(
        ids,
        [
            "github:https://github.com/acme/widgets:101",
            "github:https://github.com/acme/widgets:102",
        ]
    );
}
