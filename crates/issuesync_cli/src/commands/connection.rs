use issuesync::{DatabaseStore, NewConnection, PlaintextCipher, ProviderType, SecretCipher};
use issuesync::provider::RepoRef;
use uuid::Uuid;

use crate::ConnectionAction;
use crate::commands::shared::CliResult;
use crate::config::Config;

pub(crate) async fn handle_connection(
    action: ConnectionAction,
    config: &Config,
    store: &DatabaseStore,
) -> CliResult {
    match action {
        ConnectionAction::Add {
            provider,
            repository_url,
            project,
            token,
        } => add(store, config, provider, &repository_url, project, token).await,
        ConnectionAction::List => list(store).await,
    }
}

async fn add(
    store: &DatabaseStore,
    config: &Config,
    provider: ProviderType,
    repository_url: &str,
    project: Option<Uuid>,
    token: Option<String>,
) -> CliResult {
    // Reject URLs the adapters could not use before anything is stored.
    let repo = RepoRef::parse(provider, repository_url)?;

    let project_id = project.unwrap_or_else(Uuid::new_v4);
    let encrypted_access_token = PlaintextCipher.encrypt(token.as_deref().unwrap_or_default())?;

    let connection = store
        .insert_connection(NewConnection {
            project_id,
            provider_type: provider,
            repository_url: repository_url.to_string(),
            encrypted_access_token,
            created_by: config.user_id(),
        })
        .await?;

    tracing::info!(
        connection = %connection.id,
        repository = %repo.web_url,
        "Connection added"
    );
    println!("Connection: {}", connection.id);
    println!("Project:    {project_id}");
    if token.is_none() {
        println!("No token given; requests will be anonymous.");
    }
    Ok(())
}

async fn list(store: &DatabaseStore) -> CliResult {
    let connections = store.list_connections().await?;
    if connections.is_empty() {
        println!("No connections. Add one with `issuesync connection add`.");
        return Ok(());
    }

    for connection in connections {
        let last_synced = connection
            .last_synced_at
            .map_or_else(|| "never".to_string(), |at| at.to_rfc3339());
        println!(
            "{}  {:<9}  {}  project {}  last synced {}",
            connection.id,
            connection.provider_type.to_string(),
            connection.repository_url,
            connection.project_id,
            last_synced
        );
    }
    Ok(())
}
