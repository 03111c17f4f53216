//! GitLab REST API (v4) payloads.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// An entry from `GET /projects/:id/issues`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabIssue {
    /// Instance-wide ID.
    pub id: u64,
    /// Project-scoped issue number.
    pub iid: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// `opened` or `closed`.
    pub state: String,
    /// Label names (GitLab returns plain strings unless label details are requested).
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub assignees: Vec<GitLabUser>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub web_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitLabUser {
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub public_email: Option<String>,
}

/// An entry from `GET /projects/:id/vulnerability_findings`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabFinding {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// `critical`, `high`, `medium`, `low`, `info` or `unknown`.
    pub severity: String,
    /// `detected`, `confirmed`, `dismissed` or `resolved`. Absent on older instances.
    #[serde(default)]
    pub state: Option<String>,
    /// `sast`, `dependency_scanning`, `container_scanning`, ...
    #[serde(default)]
    pub report_type: Option<String>,
    #[serde(default)]
    pub scanner: Option<GitLabScanner>,
    #[serde(default)]
    pub identifiers: Vec<GitLabIdentifier>,
    #[serde(default)]
    pub solution: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitLabScanner {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitLabIdentifier {
    /// `cve`, `cwe`, `gemnasium`, ...
    pub external_type: String,
    pub name: String,
}

/// Subset of `GET /projects/:id` used to validate access.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabProject {
    pub id: u64,
    pub path_with_namespace: String,
    #[serde(default)]
    pub issues_enabled: Option<bool>,
}
