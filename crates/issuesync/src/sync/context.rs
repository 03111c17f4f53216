//! Collaborators of a sync run, assembled with a builder.
//!
//! ```ignore
//! use issuesync::sync::SyncContext;
//!
//! let ctx = SyncContext::builder()
//!     .issue_store(store.clone())
//!     .connection_store(store)
//!     .cipher(Arc::new(PlaintextCipher))
//!     .provider_factory(Arc::new(HttpProviderFactory::with_timeout(timeout)?))
//!     .build()?;
//! ```

use std::sync::Arc;

use crate::credentials::SecretCipher;
use crate::matcher::DuplicateMatcher;
use crate::provider::ProviderFactory;
use crate::retry::RetryConfig;
use crate::store::{ConnectionStore, IssueStore};

/// Error type for sync context construction.
#[derive(Debug, thiserror::Error)]
pub enum SyncContextError {
    /// Missing required field in builder.
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },
}

/// Builder for [`SyncContext`].
#[derive(Default)]
pub struct SyncContextBuilder {
    issues: Option<Arc<dyn IssueStore>>,
    connections: Option<Arc<dyn ConnectionStore>>,
    cipher: Option<Arc<dyn SecretCipher>>,
    providers: Option<Arc<dyn ProviderFactory>>,
    retry: Option<RetryConfig>,
}

impl SyncContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue_store(mut self, store: Arc<dyn IssueStore>) -> Self {
        self.issues = Some(store);
        self
    }

    pub fn connection_store(mut self, store: Arc<dyn ConnectionStore>) -> Self {
        self.connections = Some(store);
        self
    }

    pub fn cipher(mut self, cipher: Arc<dyn SecretCipher>) -> Self {
        self.cipher = Some(cipher);
        self
    }

    pub fn provider_factory(mut self, factory: Arc<dyn ProviderFactory>) -> Self {
        self.providers = Some(factory);
        self
    }

    /// Rate-limit retry settings. Defaults to [`RetryConfig::default`].
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    /// Build the sync context.
    ///
    /// # Errors
    ///
    /// Returns `SyncContextError::MissingField` if a collaborator is not set.
    pub fn build(self) -> Result<SyncContext, SyncContextError> {
        let issues = self
            .issues
            .ok_or(SyncContextError::MissingField { field: "issue_store" })?;
        let connections = self.connections.ok_or(SyncContextError::MissingField {
            field: "connection_store",
        })?;
        let cipher = self
            .cipher
            .ok_or(SyncContextError::MissingField { field: "cipher" })?;
        let providers = self.providers.ok_or(SyncContextError::MissingField {
            field: "provider_factory",
        })?;

        Ok(SyncContext {
            matcher: Arc::new(DuplicateMatcher::new(Arc::clone(&issues))),
            issues,
            connections,
            cipher,
            providers,
            retry: self.retry.unwrap_or_default(),
        })
    }
}

/// Everything a run talks to. Cheap to clone.
#[derive(Clone)]
pub struct SyncContext {
    issues: Arc<dyn IssueStore>,
    connections: Arc<dyn ConnectionStore>,
    cipher: Arc<dyn SecretCipher>,
    providers: Arc<dyn ProviderFactory>,
    matcher: Arc<DuplicateMatcher>,
    retry: RetryConfig,
}

impl SyncContext {
    pub fn builder() -> SyncContextBuilder {
        SyncContextBuilder::new()
    }

    pub fn issues(&self) -> &Arc<dyn IssueStore> {
        &self.issues
    }

    pub fn connections(&self) -> &Arc<dyn ConnectionStore> {
        &self.connections
    }

    pub fn cipher(&self) -> &dyn SecretCipher {
        self.cipher.as_ref()
    }

    pub fn providers(&self) -> &dyn ProviderFactory {
        self.providers.as_ref()
    }

    pub fn matcher(&self) -> &DuplicateMatcher {
        &self.matcher
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }
}
