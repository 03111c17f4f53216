//! Normalization of GitHub payloads into [`ProviderIssue`].

use std::collections::BTreeSet;

use crate::entity::provider_type::ProviderType;
use crate::provider::{
    Assignee, IssueState, Label, PriorityHint, ProviderError, ProviderIssue, ProviderIssueId,
    Result,
};

use super::types::{GitHubAlert, GitHubIssue};

/// Normalize a regular issue.
pub fn issue_to_provider_issue(issue: &GitHubIssue) -> Result<ProviderIssue> {
    let title = non_empty_title(&issue.title, issue.number)?;

    let state = match issue.state.as_str() {
        "closed" => IssueState::Closed,
        _ => IssueState::Open,
    };

    let labels = issue
        .labels
        .iter()
        .map(|l| Label {
            name: l.name.clone(),
            color: l.color.clone().filter(|c| !c.is_empty()),
        })
        .collect();

    let assignees = issue
        .assignees
        .iter()
        .map(|u| Assignee {
            login: u.login.clone(),
            name: u.name.clone(),
            email: u.email.clone(),
        })
        .collect();

    Ok(ProviderIssue {
        id: ProviderIssueId::Number(issue.number),
        number: issue.number,
        title,
        body: issue.body.clone(),
        state,
        labels,
        assignees,
        created_at: issue.created_at,
        updated_at: issue.updated_at,
        url: issue.html_url.clone(),
        security_advisory: false,
        priority_hint: None,
    })
}

/// Normalize a Dependabot alert.
///
/// Alerts are numbered in their own sequence, so the identifier is prefixed
/// to keep it distinct from the issue with the same number.
pub fn alert_to_provider_issue(alert: &GitHubAlert) -> Result<ProviderIssue> {
    let advisory = &alert.security_advisory;
    let title = non_empty_title(&advisory.summary, alert.number)?;

    let state = match alert.state.as_str() {
        "open" => IssueState::Open,
        _ => IssueState::Closed,
    };

    let mut labels = BTreeSet::new();
    labels.insert(Label::named("security"));
    labels.insert(Label::named(format!(
        "severity:{}",
        advisory.severity.to_ascii_lowercase()
    )));

    Ok(ProviderIssue {
        id: ProviderIssueId::Text(format!("dependabot-{}", alert.number)),
        number: alert.number,
        title,
        body: Some(alert_body(alert)),
        state,
        labels,
        assignees: Vec::new(),
        created_at: alert.created_at,
        updated_at: alert.updated_at,
        url: alert.html_url.clone(),
        security_advisory: true,
        priority_hint: PriorityHint::from_severity(&advisory.severity),
    })
}

fn alert_body(alert: &GitHubAlert) -> String {
    let advisory = &alert.security_advisory;
    let mut body = advisory.description.clone().unwrap_or_default();

    let mut facts = vec![format!("Advisory: {}", advisory.ghsa_id)];
    if let Some(cve) = &advisory.cve_id {
        facts.push(format!("CVE: {cve}"));
    }
    facts.push(format!("Severity: {}", advisory.severity));
    if let Some(vuln) = &alert.security_vulnerability {
        facts.push(format!(
            "Package: {} ({})",
            vuln.package.name, vuln.package.ecosystem
        ));
        if let Some(range) = &vuln.vulnerable_version_range {
            facts.push(format!("Vulnerable versions: {range}"));
        }
        if let Some(patched) = &vuln.first_patched_version {
            facts.push(format!("Patched in: {}", patched.identifier));
        }
    }
    if let Some(path) = alert.dependency.as_ref().and_then(|d| d.manifest_path.as_ref()) {
        facts.push(format!("Manifest: {path}"));
    }

    if !body.is_empty() {
        body.push_str("\n\n");
    }
    body.push_str(&facts.join("\n"));
    body
}

fn non_empty_title(title: &str, number: u64) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ProviderError::decode(
            ProviderType::GitHub,
            format!("record {number} has an empty title"),
        ));
    }
    Ok(trimmed.to_string())
}
