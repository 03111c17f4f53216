//! GitHub REST API payloads.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// An entry from `GET /repos/{owner}/{repo}/issues`.
///
/// The endpoint also returns pull requests; those carry `pull_request`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubIssue {
    /// Global numeric ID.
    pub id: u64,
    /// Per-repository issue number.
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    /// `open` or `closed`.
    pub state: String,
    #[serde(default)]
    pub labels: Vec<GitHubLabel>,
    #[serde(default)]
    pub assignees: Vec<GitHubUser>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub html_url: Option<String>,
    /// Present only on pull requests.
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubLabel {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// An entry from `GET /repos/{owner}/{repo}/dependabot/alerts`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubAlert {
    pub number: u64,
    /// `open`, `dismissed`, `fixed` or `auto_dismissed`.
    pub state: String,
    pub html_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub security_advisory: GitHubSecurityAdvisory,
    #[serde(default)]
    pub security_vulnerability: Option<GitHubVulnerability>,
    #[serde(default)]
    pub dependency: Option<GitHubDependency>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubSecurityAdvisory {
    pub ghsa_id: String,
    #[serde(default)]
    pub cve_id: Option<String>,
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    /// `low`, `medium`, `high` or `critical`.
    pub severity: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubVulnerability {
    pub package: GitHubPackage,
    #[serde(default)]
    pub vulnerable_version_range: Option<String>,
    #[serde(default)]
    pub first_patched_version: Option<GitHubPatchedVersion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubPatchedVersion {
    pub identifier: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubPackage {
    pub ecosystem: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubDependency {
    #[serde(default)]
    pub package: Option<GitHubPackage>,
    #[serde(default)]
    pub manifest_path: Option<String>,
}

/// Subset of `GET /repos/{owner}/{repo}` used to validate access.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRepository {
    pub id: u64,
    pub full_name: String,
    #[serde(default)]
    pub has_issues: Option<bool>,
}
