use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::provider_type::ProviderType;

use super::errors::Result;
use super::raw::RawIssue;
use super::repo_ref::RepoRef;

/// Provider-native issue identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderIssueId {
    Number(u64),
    Text(String),
}

impl std::fmt::Display for ProviderIssueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderIssueId::Number(n) => write!(f, "{n}"),
            ProviderIssueId::Text(s) => f.write_str(s),
        }
    }
}

/// Two-state issue lifecycle shared by every provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub color: Option<String>,
}

impl Label {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Priority suggested by an advisory's severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityHint {
    Critical,
    High,
}

impl PriorityHint {
    /// Map a provider severity string. Only critical and high carry a hint.
    pub fn from_severity(severity: &str) -> Option<Self> {
        match severity.trim().to_ascii_lowercase().as_str() {
            "critical" => Some(PriorityHint::Critical),
            "high" => Some(PriorityHint::High),
            _ => None,
        }
    }
}

/// Canonical issue shape every provider record is normalized into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderIssue {
    pub id: ProviderIssueId,
    /// Number shown to users (`#12`).
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub state: IssueState,
    pub labels: BTreeSet<Label>,
    pub assignees: Vec<Assignee>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Link to the issue on the provider's web UI.
    pub url: Option<String>,
    /// Set only for records sourced from an advisory endpoint.
    pub security_advisory: bool,
    pub priority_hint: Option<PriorityHint>,
}

impl ProviderIssue {
    /// Whether any label matches `name` case-insensitively.
    pub fn has_label(&self, name: &str) -> bool {
        self.labels
            .iter()
            .any(|label| label.name.trim().eq_ignore_ascii_case(name))
    }
}

/// Which issue states to request from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFilter {
    Open,
    All,
}

/// One page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub state: StateFilter,
    /// 1-based page number.
    pub page: u32,
    pub per_page: u32,
    pub include_closed: bool,
}

impl PageQuery {
    pub fn new(page: u32, per_page: u32, include_closed: bool) -> Self {
        Self {
            state: if include_closed {
                StateFilter::All
            } else {
                StateFilter::Open
            },
            page: page.max(1),
            per_page,
            include_closed,
        }
    }

    /// Page size clamped into `1..=max`.
    pub fn page_size(&self, max: u32) -> u32 {
        self.per_page.clamp(1, max)
    }
}

/// One page of raw provider records.
#[derive(Debug, Clone, Default)]
pub struct IssuePage {
    pub issues: Vec<RawIssue>,
    pub has_next: bool,
    pub next_page: Option<u32>,
    /// Total record count, when the provider reports it.
    pub total_count: Option<usize>,
}

impl IssuePage {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// A read-only view of one repository's issues on one provider.
#[async_trait]
pub trait IssueProvider: Send + Sync {
    fn provider_type(&self) -> ProviderType;

    fn repository(&self) -> &RepoRef;

    /// Largest page size the provider accepts.
    fn max_page_size(&self) -> u32;

    fn supports_advisories(&self) -> bool {
        false
    }

    /// Lightweight repository lookup proving the credential can read it.
    async fn validate_access(&self) -> Result<()>;

    async fn list_issues(&self, query: &PageQuery) -> Result<IssuePage>;

    /// Providers without advisory support return an empty page.
    async fn list_advisories(&self, _query: &PageQuery) -> Result<IssuePage> {
        Ok(IssuePage::empty())
    }
}
