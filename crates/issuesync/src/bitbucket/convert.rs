//! Normalization of Bitbucket payloads into [`ProviderIssue`].

use std::collections::BTreeSet;

use crate::entity::provider_type::ProviderType;
use crate::provider::{
    Assignee, IssueState, Label, ProviderError, ProviderIssue, ProviderIssueId, Result,
};

use super::types::BitbucketIssue;

/// Map Bitbucket's workflow states onto open/closed.
pub fn map_state(state: &str) -> IssueState {
    match state.trim().to_ascii_lowercase().as_str() {
        "resolved" | "invalid" | "duplicate" | "wontfix" | "closed" => IssueState::Closed,
        _ => IssueState::Open,
    }
}

/// Normalize an issue.
///
/// Bitbucket has no labels; `kind` and `component` are surfaced as labels so
/// that type derivation (`bug`, `enhancement`) works the same as elsewhere.
pub fn issue_to_provider_issue(issue: &BitbucketIssue) -> Result<ProviderIssue> {
    let title = issue.title.trim();
    if title.is_empty() {
        return Err(ProviderError::decode(
            ProviderType::Bitbucket,
            format!("issue {} has an empty title", issue.id),
        ));
    }

    let mut labels = BTreeSet::new();
    if let Some(kind) = issue.kind.as_ref().filter(|k| !k.is_empty()) {
        labels.insert(Label::named(kind.clone()));
    }
    if let Some(component) = &issue.component {
        labels.insert(Label::named(component.name.clone()));
    }

    let assignees = issue
        .assignee
        .iter()
        .filter_map(|user| {
            let login = user
                .nickname
                .clone()
                .or_else(|| user.account_id.clone())?;
            Some(Assignee {
                login,
                name: user.display_name.clone(),
                email: None,
            })
        })
        .collect();

    Ok(ProviderIssue {
        id: ProviderIssueId::Number(issue.id),
        number: issue.id,
        title: title.to_string(),
        body: issue
            .content
            .as_ref()
            .and_then(|c| c.raw.clone())
            .filter(|raw| !raw.is_empty()),
        state: map_state(&issue.state),
        labels,
        assignees,
        created_at: issue.created_on,
        updated_at: issue.updated_on,
        url: issue
            .links
            .as_ref()
            .and_then(|l| l.html.as_ref())
            .map(|h| h.href.clone()),
        security_advisory: false,
        priority_hint: None,
    })
}
