use issuesync::{DatabaseStore, IssueStore};
use issuesync::entity::custom_fields::external_id_of;
use uuid::Uuid;

use crate::commands::shared::CliResult;

pub(crate) async fn handle_issues(project_id: Uuid, store: &DatabaseStore) -> CliResult {
    let issues = store.find_issues_by_project(project_id).await?;
    if issues.is_empty() {
        println!("No issues in project {project_id}.");
        return Ok(());
    }

    for issue in issues {
        let external = external_id_of(&issue.custom_fields).unwrap_or("-");
        println!(
            "{}  {:<6}  {:<7}  {}  [{}]",
            issue.id,
            issue.status.to_string(),
            issue.issue_type.to_string(),
            issue.title,
            external
        );
    }
    Ok(())
}
