//! Progress reporting for sync runs.
//!
//! Events from the engine become structured log lines; the end-of-run
//! summary goes to stdout, styled when it is a terminal.

use console::{Term, style};
use issuesync::sync::{OperationStatus, SyncEvent, SyncOperation, SyncResults};

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter {
    last_processed: u64,
}

impl LoggingReporter {
    pub fn new() -> Self {
        Self { last_processed: 0 }
    }

    pub fn handle(&mut self, event: &SyncEvent) {
        match event {
            SyncEvent::Started {
                connection_id,
                repository_url,
                sync_type,
            } => {
                tracing::info!(
                    connection = %connection_id,
                    repository = %repository_url,
                    sync_type = %sync_type,
                    "Sync started"
                );
            }

            SyncEvent::PhaseStarted { phase } => {
                tracing::info!(phase = %phase, "Listing");
            }

            SyncEvent::PageFetched {
                phase,
                page,
                count,
                has_next,
            } => {
                tracing::debug!(phase = %phase, page, count, has_next, "Fetched page");
            }

            SyncEvent::PageFailed { phase, page, error } => {
                tracing::warn!(phase = %phase, page, error = %error, "Page failed");
            }

            SyncEvent::Progress(progress) => {
                if progress.processed > self.last_processed {
                    self.last_processed = progress.processed;
                    tracing::info!(
                        page = progress.current,
                        processed = progress.processed,
                        total = ?progress.total,
                        stage = %progress.stage,
                        "Progress"
                    );
                }
            }

            SyncEvent::RateLimitBackoff {
                attempt,
                retry_after_ms,
            } => {
                tracing::warn!(attempt, retry_after_ms, "Rate limited, backing off");
            }

            SyncEvent::IssueFailed { issue_id, error } => {
                tracing::warn!(issue_id = ?issue_id, error = %error, "Issue failed");
            }

            SyncEvent::Cancelled => {
                tracing::warn!("Sync cancelled");
            }

            SyncEvent::Finished { results, error } => match error {
                Some(error) => tracing::error!(error = %error, "Sync failed"),
                None => tracing::info!(
                    created = results.created,
                    updated = results.updated,
                    skipped = results.skipped,
                    failed = results.failed,
                    "Sync finished"
                ),
            },

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Human-readable end-of-run summary.
pub fn summary_lines(operation: &SyncOperation) -> Vec<String> {
    let results = operation.results.clone().unwrap_or_default();
    let mut lines = vec![headline(operation)];
    lines.push(counts_line("Issues", &results));

    let advisories = results.security_advisories;
    if advisories.total() > 0 {
        lines.push(format!(
            "  Advisories   created {}  updated {}  skipped {}  failed {}",
            advisories.created, advisories.updated, advisories.skipped, advisories.failed
        ));
    }

    for record in &results.errors {
        match &record.issue_id {
            Some(id) => lines.push(format!("  ! #{id}: {}", record.error)),
            None => lines.push(format!("  ! {}", record.error)),
        }
    }
    lines
}

fn headline(operation: &SyncOperation) -> String {
    let status = match (operation.status, operation.cancelled) {
        (OperationStatus::Completed, true) => "aborted".to_string(),
        (status, _) => status.to_string(),
    };
    match &operation.error {
        Some(error) => format!("Sync {} ({status}): {error}", operation.id),
        None => format!("Sync {} ({status})", operation.id),
    }
}

fn counts_line(label: &str, results: &SyncResults) -> String {
    format!(
        "  {label:<12} created {}  updated {}  skipped {}  failed {}",
        results.created, results.updated, results.skipped, results.failed
    )
}

/// Print the summary, coloring the headline on a terminal.
pub fn print_summary(operation: &SyncOperation) {
    let lines = summary_lines(operation);
    let is_tty = Term::stdout().is_term();
    for (i, line) in lines.iter().enumerate() {
        if i == 0 && is_tty {
            let styled = match operation.status {
                OperationStatus::Failed => style(line).red().bold(),
                _ if operation.cancelled => style(line).yellow().bold(),
                _ => style(line).green().bold(),
            };
            println!("{styled}");
        } else {
            println!("{line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use issuesync::sync::{SyncErrorRecord, SyncOptions};
    use uuid::Uuid;

    fn operation(status: OperationStatus, results: SyncResults) -> SyncOperation {
        let mut op = SyncOperation::new(Uuid::new_v4(), Uuid::nil(), &SyncOptions::default());
        op.status = status;
        op.results = Some(results);
        op
    }

    #[test]
    fn summary_lists_counts_and_errors() {
        let mut results = SyncResults {
            created: 3,
            updated: 1,
            failed: 1,
            ..SyncResults::default()
        };
        results.errors.push(SyncErrorRecord {
            issue_id: Some("17".into()),
            error: "Storage error: disk full".into(),
        });
        let lines = summary_lines(&operation(OperationStatus::Completed, results));

        assert!(lines[0].ends_with("(completed)"));
        assert!(lines[1].contains("created 3"));
        assert!(lines[1].contains("failed 1"));
        assert_eq!(lines[2], "  ! #17: Storage error: disk full");
    }

    #[test]
    fn advisories_line_only_when_present() {
        let mut results = SyncResults::default();
        assert_eq!(
            summary_lines(&operation(OperationStatus::Completed, results.clone())).len(),
            2
        );
        results.security_advisories.created = 2;
        let lines = summary_lines(&operation(OperationStatus::Completed, results));
        assert!(lines[2].starts_with("  Advisories"));
    }

    #[test]
    fn aborted_and_failed_headlines() {
        let mut op = operation(OperationStatus::Completed, SyncResults::default());
        op.cancelled = true;
        assert!(summary_lines(&op)[0].ends_with("(aborted)"));

        let mut op = operation(OperationStatus::Failed, SyncResults::default());
        op.error = Some("Rate limit exceeded and retries exhausted: github rate limit exceeded".into());
        assert!(summary_lines(&op)[0].contains("(failed): Rate limit"));
    }

    #[test]
    fn progress_logged_only_when_processed_advances() {
        let mut reporter = LoggingReporter::new();
        let progress = issuesync::sync::SyncProgress {
            processed: 10,
            ..Default::default()
        };
        reporter.handle(&SyncEvent::Progress(progress));
        assert_eq!(reporter.last_processed, 10);
        reporter.handle(&SyncEvent::Progress(issuesync::sync::SyncProgress::default()));
        assert_eq!(reporter.last_processed, 10);
    }
}
