//! issuesync CLI - import issues from Git hosts into local projects.

mod commands;
mod config;
mod progress;
mod shutdown;

use clap::{Args, Parser, Subcommand};
use issuesync::ProviderType;
use issuesync::sync::SyncType;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "issuesync")]
#[command(version)]
#[command(about = "Import issues and security advisories from Git hosts")]
#[command(
    long_about = "issuesync pulls issues from GitHub, GitLab and Bitbucket repositories \
(plus Dependabot alerts and GitLab vulnerability findings) into local projects. \
Re-running a sync updates previously imported issues instead of duplicating them."
)]
#[command(after_long_help = r#"EXAMPLES
    Connect a repository to a new project:
        $ issuesync connection add github https://github.com/acme/widgets --token ghp_...

    Import open issues and advisories:
        $ issuesync sync 5f0c...e21

    Import issues only, closed ones included:
        $ issuesync sync 5f0c...e21 --type issues-only --include-closed

    Bind an existing local issue to GitHub issue #42:
        $ issuesync link 9a7d...03c --provider github --repo https://github.com/acme/widgets --number 42

CONFIGURATION
    issuesync reads configuration from:
      1. ~/.config/issuesync/config.toml (or $XDG_CONFIG_HOME/issuesync/config.toml)
      2. ./issuesync.toml
      3. Environment variables (ISSUESYNC_ prefix, e.g., ISSUESYNC_DATABASE__URL)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    ISSUESYNC_DATABASE__URL   Database connection string (default: ~/.local/state/issuesync/issuesync.db)
    ISSUESYNC_TOKEN           Access token for `connection add`
    RUST_LOG                  Log filter (default: issuesync=info,issuesync_cli=info)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage repository connections
    Connection {
        #[command(subcommand)]
        action: ConnectionAction,
    },
    /// Run a sync for one connection and wait for it to finish
    ///
    /// Ctrl+C aborts the run; issues imported so far are kept.
    Sync(SyncArgs),
    /// Bind a local issue to a provider issue
    Link(LinkArgs),
    /// List the issues of a project
    Issues {
        /// Project id
        project: Uuid,
    },
}

#[derive(Subcommand)]
enum ConnectionAction {
    /// Connect a repository to a project
    Add {
        /// Provider: github, gitlab or bitbucket
        provider: ProviderType,

        /// Repository web URL
        repository_url: String,

        /// Project receiving the issues (a new id is generated if omitted)
        #[arg(short, long)]
        project: Option<Uuid>,

        /// Access token; omit for anonymous access to public repositories
        #[arg(short, long, env = "ISSUESYNC_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
    /// List connections
    List,
}

#[derive(Debug, Args)]
struct SyncArgs {
    /// Connection id
    connection: Uuid,

    /// What to import: full, issues-only or security-only
    #[arg(short = 't', long = "type", default_value = "full")]
    sync_type: SyncType,

    /// Import closed issues too
    #[arg(short = 'a', long)]
    include_closed: bool,

    /// Items per page (default from config or 100; clamped per provider)
    #[arg(short, long)]
    page_size: Option<u32>,
}

#[derive(Debug, Args)]
struct LinkArgs {
    /// Local issue id
    issue: Uuid,

    /// Provider: github, gitlab or bitbucket
    #[arg(long)]
    provider: ProviderType,

    /// Repository web URL
    #[arg(long = "repo")]
    repository_url: String,

    /// Full external id or provider issue id
    #[arg(long, required_unless_present = "number")]
    external_id: Option<String>,

    /// Provider issue number
    #[arg(long)]
    number: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("issuesync=info,issuesync_cli=info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration (config file -> env vars -> defaults)
    let config = config::Config::load();

    let cli = Cli::parse();

    let database_url = config
        .database_url()
        .ok_or("Could not determine a database URL; set ISSUESYNC_DATABASE__URL")?;

    // Ensure the database directory exists for SQLite
    if database_url.starts_with("sqlite://") {
        let db_path = database_url.trim_start_matches("sqlite://");
        // Strip query parameters (e.g., ?mode=rwc) before path operations
        let db_path = db_path.split('?').next().unwrap_or(db_path);
        let db_path = std::path::Path::new(db_path);

        if db_path.is_relative() && !db_path.as_os_str().is_empty() {
            tracing::warn!(
                "Database path '{}' is relative - behavior depends on current directory. \
                 Consider using an absolute path.",
                db_path.display()
            );
        }

        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
    }

    let store = commands::shared::open_store(&database_url).await?;

    match cli.command {
        Commands::Connection { action } => {
            commands::connection::handle_connection(action, &config, &store).await?;
        }
        Commands::Sync(args) => {
            commands::sync::handle_sync(args, &config, store).await?;
        }
        Commands::Link(args) => {
            commands::link::handle_link(args, &config, store).await?;
        }
        Commands::Issues { project } => {
            commands::issues::handle_issues(project, &store).await?;
        }
    }

    Ok(())
}
