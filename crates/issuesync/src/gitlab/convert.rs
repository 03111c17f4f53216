//! Normalization of GitLab payloads into [`ProviderIssue`].

use std::collections::BTreeSet;

use crate::entity::provider_type::ProviderType;
use crate::provider::{
    Assignee, IssueState, Label, PriorityHint, ProviderError, ProviderIssue, ProviderIssueId,
    Result,
};

use super::types::{GitLabFinding, GitLabIssue};

/// Normalize a project issue. The project-scoped `iid` is the identifier.
pub fn issue_to_provider_issue(issue: &GitLabIssue) -> Result<ProviderIssue> {
    let title = issue.title.trim();
    if title.is_empty() {
        return Err(ProviderError::decode(
            ProviderType::GitLab,
            format!("issue {} has an empty title", issue.iid),
        ));
    }

    let state = match issue.state.as_str() {
        "closed" => IssueState::Closed,
        _ => IssueState::Open,
    };

    Ok(ProviderIssue {
        id: ProviderIssueId::Number(issue.iid),
        number: issue.iid,
        title: title.to_string(),
        body: issue.description.clone(),
        state,
        labels: issue.labels.iter().map(Label::named).collect(),
        assignees: issue
            .assignees
            .iter()
            .map(|u| Assignee {
                login: u.username.clone(),
                name: u.name.clone(),
                email: u.public_email.clone(),
            })
            .collect(),
        created_at: issue.created_at,
        updated_at: issue.updated_at,
        url: issue.web_url.clone(),
        security_advisory: false,
        priority_hint: None,
    })
}

/// Normalize a vulnerability finding.
pub fn finding_to_provider_issue(finding: &GitLabFinding) -> Result<ProviderIssue> {
    let title = finding.name.trim();
    if title.is_empty() {
        return Err(ProviderError::decode(
            ProviderType::GitLab,
            format!("finding {} has an empty name", finding.id),
        ));
    }

    let state = match finding.state.as_deref() {
        Some("dismissed") | Some("resolved") => IssueState::Closed,
        _ => IssueState::Open,
    };

    let mut labels = BTreeSet::new();
    labels.insert(Label::named("security"));
    labels.insert(Label::named(format!(
        "severity:{}",
        finding.severity.to_ascii_lowercase()
    )));
    if let Some(report_type) = &finding.report_type {
        labels.insert(Label::named(report_type.clone()));
    }

    Ok(ProviderIssue {
        id: ProviderIssueId::Text(format!("finding-{}", finding.id)),
        number: finding.id,
        title: title.to_string(),
        body: Some(finding_body(finding)),
        state,
        labels,
        assignees: Vec::new(),
        created_at: finding.created_at,
        updated_at: finding.updated_at,
        url: None,
        security_advisory: true,
        priority_hint: PriorityHint::from_severity(&finding.severity),
    })
}

fn finding_body(finding: &GitLabFinding) -> String {
    let mut body = finding.description.clone().unwrap_or_default();

    let mut facts = vec![format!("Severity: {}", finding.severity)];
    if let Some(scanner) = &finding.scanner {
        facts.push(format!("Scanner: {}", scanner.name));
    }
    for ident in &finding.identifiers {
        facts.push(format!("{}: {}", ident.external_type.to_uppercase(), ident.name));
    }
    if let Some(solution) = finding.solution.as_ref().filter(|s| !s.is_empty()) {
        facts.push(format!("Solution: {solution}"));
    }

    if !body.is_empty() {
        body.push_str("\n\n");
    }
    body.push_str(&facts.join("\n"));
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn issue_state_vocabulary() {
        for (raw, expected) in [("opened", IssueState::Open), ("closed", IssueState::Closed)] {
            let issue: GitLabIssue = serde_json::from_value(json!({
                "id": 900, "iid": 4, "title": "Fix it", "state": raw,
                "labels": ["bug", "backend"],
                "assignees": [{"username": "dev", "name": "Dev Eloper"}]
            }))
            .unwrap();
            let normalized = issue_to_provider_issue(&issue).unwrap();
            assert_eq!(normalized.state, expected);
            assert_eq!(normalized.id, ProviderIssueId::Number(4));
            assert!(normalized.has_label("bug"));
            assert_eq!(normalized.assignees[0].name.as_deref(), Some("Dev Eloper"));
        }
    }

    #[test]
    fn finding_maps_state_severity_and_identifiers() {
        let finding: GitLabFinding = serde_json::from_value(json!({
            "id": 77,
            "name": "Regular expression denial of service",
            "severity": "Critical",
            "state": "confirmed",
            "report_type": "dependency_scanning",
            "scanner": {"name": "Gemnasium"},
            "identifiers": [{"external_type": "cve", "name": "CVE-2023-1234"}],
            "solution": "Upgrade to 2.0"
        }))
        .unwrap();

        let issue = finding_to_provider_issue(&finding).unwrap();
        assert_eq!(issue.state, IssueState::Open);
        assert!(issue.security_advisory);
        assert_eq!(issue.priority_hint, Some(PriorityHint::Critical));
        assert!(issue.has_label("dependency_scanning"));
        let body = issue.body.unwrap();
        assert!(body.contains("CVE: CVE-2023-1234"));
        assert!(body.contains("Solution: Upgrade to 2.0"));
    }

    #[test]
    fn dismissed_and_resolved_findings_are_closed() {
        for state in ["dismissed", "resolved"] {
            let finding: GitLabFinding = serde_json::from_value(json!({
                "id": 1, "name": "x", "severity": "low", "state": state
            }))
            .unwrap();
            let issue = finding_to_provider_issue(&finding).unwrap();
            assert_eq!(issue.state, IssueState::Closed);
            assert_eq!(issue.priority_hint, None);
        }
    }
}
