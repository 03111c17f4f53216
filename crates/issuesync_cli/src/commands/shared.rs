use std::sync::Arc;

use issuesync::sync::SyncContext;
use issuesync::{DatabaseStore, HttpProviderFactory, PlaintextCipher, db};

use crate::config::Config;

pub(crate) type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Open the configured database, creating tables on first use.
pub(crate) async fn open_store(database_url: &str) -> CliResult<Arc<DatabaseStore>> {
    let db = db::connect_and_prepare(database_url).await?;
    Ok(Arc::new(DatabaseStore::new(db)))
}

/// Wire the engine to the database store and real HTTP adapters.
pub(crate) fn build_context(config: &Config, store: Arc<DatabaseStore>) -> CliResult<SyncContext> {
    let mut providers = HttpProviderFactory::with_timeout(config.http_timeout())?;
    if config.http.rate_limit {
        providers = providers.with_default_rate_limits();
    }

    let ctx = SyncContext::builder()
        .issue_store(store.clone())
        .connection_store(store)
        .cipher(Arc::new(PlaintextCipher))
        .provider_factory(Arc::new(providers))
        .retry(config.retry.to_retry_config())
        .build()?;
    Ok(ctx)
}
