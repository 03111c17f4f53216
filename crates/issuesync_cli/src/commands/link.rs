use std::sync::Arc;

use issuesync::DatabaseStore;
use issuesync::sync::{LinkRequest, link_issue};

use crate::LinkArgs;
use crate::commands::shared::{CliResult, build_context};
use crate::config::Config;

pub(crate) async fn handle_link(
    args: LinkArgs,
    config: &Config,
    store: Arc<DatabaseStore>,
) -> CliResult {
    let ctx = build_context(config, store)?;
    let request = LinkRequest {
        provider: args.provider,
        repository_url: args.repository_url,
        external_id: args.external_id,
        issue_number: args.number,
    };

    let issue = link_issue(&ctx, args.issue, &request).await?;
    let external = issue
        .synced_fields()
        .ok()
        .and_then(|fields| fields.external_id)
        .unwrap_or_default();
    println!("Linked {} to {external}", issue.id);
    Ok(())
}
