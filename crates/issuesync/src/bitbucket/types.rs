//! Bitbucket Cloud REST API (2.0) payloads.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Paged envelope used by every Bitbucket collection endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketPage<T> {
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
    /// Absolute URL of the next page; absent on the last page.
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub pagelen: Option<u32>,
    /// Total entries across all pages, when computed.
    #[serde(default)]
    pub size: Option<usize>,
}

/// An entry from `GET /repositories/{workspace}/{slug}/issues`.
#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketIssue {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub content: Option<BitbucketContent>,
    /// `new`, `open`, `on hold`, `resolved`, `invalid`, `duplicate`, `wontfix` or `closed`.
    pub state: String,
    /// `bug`, `enhancement`, `proposal` or `task`.
    #[serde(default)]
    pub kind: Option<String>,
    /// `trivial`, `minor`, `major`, `critical` or `blocker`.
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub assignee: Option<BitbucketUser>,
    #[serde(default)]
    pub component: Option<BitbucketNamed>,
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub links: Option<BitbucketLinks>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketContent {
    #[serde(default)]
    pub raw: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketUser {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketNamed {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketLinks {
    #[serde(default)]
    pub html: Option<BitbucketHref>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketHref {
    pub href: String,
}

/// Subset of `GET /repositories/{workspace}/{slug}` used to validate access.
#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketRepository {
    pub full_name: String,
    #[serde(default)]
    pub has_issues: Option<bool>,
}
