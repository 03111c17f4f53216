//! Database connection and schema utilities.

use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Schema, Statement};

use crate::entity::issue::{Column as IssueColumn, Entity as IssueEntity};
use crate::entity::repository_connection::Entity as RepositoryConnectionEntity;

/// Configure SQLite-specific pragmas for better performance and concurrency.
///
/// This sets:
/// - `journal_mode=WAL` - Write-ahead logging for better concurrent access
/// - `busy_timeout=5000` - Wait up to 5 seconds for locks instead of failing immediately
/// - `synchronous=NORMAL` - Good balance of safety and performance with WAL
async fn configure_sqlite(db: &DatabaseConnection) -> Result<(), DbErr> {
    for pragma in [
        "PRAGMA journal_mode=WAL",
        "PRAGMA busy_timeout=5000",
        "PRAGMA synchronous=NORMAL",
    ] {
        db.execute(Statement::from_string(
            db.get_database_backend(),
            pragma.to_string(),
        ))
        .await?;
    }
    Ok(())
}

/// Establish a connection to the database.
///
/// File-backed SQLite databases get WAL mode, a 5 second busy timeout and
/// NORMAL synchronous mode.
///
/// # Arguments
/// * `database_url` - Database connection string (e.g., `sqlite://issuesync.db?mode=rwc` or `postgres:///issuesync`)
///
/// # Errors
/// Returns `DbErr` if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    if database_url.starts_with("sqlite://") {
        configure_sqlite(&db).await?;
    }

    Ok(db)
}

/// Create the `issues` and `repository_connections` tables if missing.
///
/// The host application normally owns the schema; this exists for the CLI and
/// for tests running against `sqlite::memory:`.
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut connections = schema.create_table_from_entity(RepositoryConnectionEntity);
    connections.if_not_exists();
    db.execute(backend.build(&connections)).await?;

    let mut issues = schema.create_table_from_entity(IssueEntity);
    issues.if_not_exists();
    db.execute(backend.build(&issues)).await?;

    let project_index = Index::create()
        .name("idx_issues_project_id")
        .table(IssueEntity)
        .col(IssueColumn::ProjectId)
        .if_not_exists()
        .to_owned();
    db.execute(backend.build(&project_index)).await?;

    Ok(())
}

/// Connect and make sure the schema exists.
pub async fn connect_and_prepare(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = connect(database_url).await?;
    ensure_schema(&db).await?;
    Ok(db)
}
