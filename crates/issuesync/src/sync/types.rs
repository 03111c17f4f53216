//! Run-level types and constants for repository issue sync.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Emit a progress snapshot after this many issues within a page.
pub const PROGRESS_EVERY: u64 = 10;

/// Cap on `SyncResults::errors`. Later failures still count in `failed`.
pub const MAX_RECORDED_ERRORS: usize = 100;

/// Consecutive page failures tolerated (after a good page) before a phase stops.
pub const MAX_CONSECUTIVE_PAGE_FAILURES: u32 = 3;

/// Page size requested from providers; each adapter clamps it to its own maximum.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// What a run imports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncType {
    #[default]
    Full,
    IssuesOnly,
    SecurityOnly,
}

impl SyncType {
    #[must_use]
    pub fn includes_issues(self) -> bool {
        matches!(self, SyncType::Full | SyncType::IssuesOnly)
    }

    #[must_use]
    pub fn includes_advisories(self) -> bool {
        matches!(self, SyncType::Full | SyncType::SecurityOnly)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SyncType::Full => "full",
            SyncType::IssuesOnly => "issuesOnly",
            SyncType::SecurityOnly => "securityOnly",
        }
    }
}

impl std::fmt::Display for SyncType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "full" => Ok(SyncType::Full),
            "issuesonly" | "issues" => Ok(SyncType::IssuesOnly),
            "securityonly" | "security" => Ok(SyncType::SecurityOnly),
            _ => Err(format!("Unknown sync type: {s}")),
        }
    }
}

/// Which listing a page belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    Issues,
    Advisories,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SyncPhase::Issues => "issues",
            SyncPhase::Advisories => "advisories",
        })
    }
}

/// Per-issue result of the pipeline, as counted in [`SyncResults`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueOutcome {
    Created,
    Updated,
    Skipped,
}

/// Created/updated/skipped/failed tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCounts {
    pub created: u64,
    pub updated: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl SyncCounts {
    fn bump(&mut self, outcome: IssueOutcome) {
        match outcome {
            IssueOutcome::Created => self.created += 1,
            IssueOutcome::Updated => self.updated += 1,
            IssueOutcome::Skipped => self.skipped += 1,
        }
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.created + self.updated + self.skipped + self.failed
    }
}

/// One recorded failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncErrorRecord {
    /// Provider-side issue id, when the failure concerns one issue.
    pub issue_id: Option<String>,
    pub error: String,
}

/// Accumulated results of a run.
///
/// Top-level counts include advisories; `security_advisories` holds the
/// advisory-only share.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResults {
    pub created: u64,
    pub updated: u64,
    pub skipped: u64,
    pub failed: u64,
    pub security_advisories: SyncCounts,
    pub errors: Vec<SyncErrorRecord>,
}

impl SyncResults {
    /// Count a handled issue.
    pub fn record(&mut self, outcome: IssueOutcome, advisory: bool) {
        match outcome {
            IssueOutcome::Created => self.created += 1,
            IssueOutcome::Updated => self.updated += 1,
            IssueOutcome::Skipped => self.skipped += 1,
        }
        if advisory {
            self.security_advisories.bump(outcome);
        }
    }

    /// Count a failed issue and keep its error while under the cap.
    pub fn record_failure(&mut self, issue_id: Option<String>, error: String, advisory: bool) {
        self.failed += 1;
        if advisory {
            self.security_advisories.failed += 1;
        }
        self.push_error(issue_id, error);
    }

    /// Keep an error that is not tied to a counted issue (a failed page).
    pub fn push_error(&mut self, issue_id: Option<String>, error: String) {
        if self.errors.len() < MAX_RECORDED_ERRORS {
            self.errors.push(SyncErrorRecord { issue_id, error });
        }
    }

    /// Issues handled so far, failures included.
    #[must_use]
    pub fn processed(&self) -> u64 {
        self.created + self.updated + self.skipped + self.failed
    }
}

/// Coarse stage label carried in progress snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStage {
    #[default]
    Fetching,
    Matching,
    Creating,
    Updating,
}

impl std::fmt::Display for SyncStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SyncStage::Fetching => "fetching",
            SyncStage::Matching => "matching",
            SyncStage::Creating => "creating",
            SyncStage::Updating => "updating",
        })
    }
}

/// Latest progress snapshot. Each one replaces the previous.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncProgress {
    /// Page currently being handled (1-based, 0 before the first fetch).
    pub current: u32,
    /// Item total reported by the provider, when it reports one.
    pub total: Option<u64>,
    /// Issues handled so far in the run.
    pub processed: u64,
    pub stage: SyncStage,
}

/// Settings of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    pub sync_type: SyncType,
    /// Import closed issues too.
    pub include_closed: bool,
    pub page_size: u32,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            sync_type: SyncType::Full,
            include_closed: false,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl SyncOptions {
    #[must_use]
    pub fn new(sync_type: SyncType, include_closed: bool) -> Self {
        Self {
            sync_type,
            include_closed,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}
