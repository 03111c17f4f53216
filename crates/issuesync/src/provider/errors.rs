use std::time::Duration;

use thiserror::Error;

use crate::entity::provider_type::ProviderType;
use crate::http::HttpError;

use super::rate_limit::RateLimitInfo;

/// Longest API error body carried in an error message.
const MAX_MESSAGE_CHARS: usize = 200;

/// Errors surfaced by a provider adapter.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Non-2xx response that is not a rate limit.
    #[error("{provider} API error ({status}): {message}")]
    Api {
        provider: ProviderType,
        status: u16,
        message: String,
    },

    /// Throttled response. `retry_after` is the provider-supplied delay, if any.
    #[error("{provider} rate limit exceeded")]
    RateLimited {
        provider: ProviderType,
        retry_after: Option<Duration>,
        info: Option<RateLimitInfo>,
    },

    /// Token missing, expired, or rejected.
    #[error("{provider} authentication failed")]
    Unauthorized { provider: ProviderType },

    /// Repository or endpoint not found (or hidden from this token).
    #[error("{provider} resource not found: {resource}")]
    NotFound {
        provider: ProviderType,
        resource: String,
    },

    /// Network or connection error.
    #[error("{provider} network error: {message}")]
    Network {
        provider: ProviderType,
        message: String,
    },

    /// Response body did not match the expected shape.
    #[error("{provider} returned malformed data: {message}")]
    Decode {
        provider: ProviderType,
        message: String,
    },

    /// The repository URL cannot be resolved to a provider path.
    #[error("Invalid repository reference: {0}")]
    InvalidRepository(String),

    /// The run was cancelled while waiting.
    #[error("Operation cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Create an API error, truncating long response bodies.
    pub fn api(provider: ProviderType, status: u16, message: impl AsRef<str>) -> Self {
        Self::Api {
            provider,
            status,
            message: truncate(message.as_ref().trim()),
        }
    }

    #[inline]
    pub fn not_found(provider: ProviderType, resource: impl Into<String>) -> Self {
        Self::NotFound {
            provider,
            resource: resource.into(),
        }
    }

    #[inline]
    pub fn decode(provider: ProviderType, message: impl Into<String>) -> Self {
        Self::Decode {
            provider,
            message: message.into(),
        }
    }

    #[inline]
    pub fn network(provider: ProviderType, err: HttpError) -> Self {
        Self::Network {
            provider,
            message: err.to_string(),
        }
    }

    /// Check if this error is a rate limit error (retryable).
    #[inline]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Provider-supplied delay before the next attempt.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Provider that produced the error, when known.
    pub fn provider(&self) -> Option<ProviderType> {
        match self {
            Self::Api { provider, .. }
            | Self::RateLimited { provider, .. }
            | Self::Unauthorized { provider }
            | Self::NotFound { provider, .. }
            | Self::Network { provider, .. }
            | Self::Decode { provider, .. } => Some(*provider),
            Self::InvalidRepository(_) | Self::Cancelled => None,
        }
    }
}

fn truncate(message: &str) -> String {
    if message.chars().count() <= MAX_MESSAGE_CHARS {
        return message.to_string();
    }
    let mut out: String = message.chars().take(MAX_MESSAGE_CHARS).collect();
    out.push_str("...");
    out
}

/// Extract a short error message suitable for display.
///
/// Takes the first line of an error message, which keeps progress output and
/// recorded per-issue errors on a single line.
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;
