use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::entity::provider_type::ProviderType;
use crate::http::{HttpHeaders, header_get};

/// Type alias for the governor rate limiter.
type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Default proactive pacing per provider (requests per second).
pub mod rate_limits {
    /// GitHub: 5000 requests/hour for tokens; 10/sec allows short bursts.
    pub const GITHUB_DEFAULT_RPS: u32 = 10;
    /// GitLab.com: 2000 requests/minute per user; 5/sec stays well inside it.
    pub const GITLAB_DEFAULT_RPS: u32 = 5;
    /// Bitbucket Cloud: 1000 requests/hour for repository data.
    pub const BITBUCKET_DEFAULT_RPS: u32 = 2;
}

/// Get the default pacing for a provider.
pub fn default_rps_for_provider(provider: ProviderType) -> u32 {
    match provider {
        ProviderType::GitHub => rate_limits::GITHUB_DEFAULT_RPS,
        ProviderType::GitLab => rate_limits::GITLAB_DEFAULT_RPS,
        ProviderType::Bitbucket => rate_limits::BITBUCKET_DEFAULT_RPS,
    }
}

/// A proactive request pacer backed by `governor`.
///
/// Adapters call [`ApiRateLimiter::wait`] before every request so that a long
/// sync does not burn through the provider's quota in a burst.
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl std::fmt::Debug for ApiRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRateLimiter").finish_non_exhaustive()
    }
}

impl ApiRateLimiter {
    /// Create a new rate limiter with the specified requests per second.
    ///
    /// A rate of 0 is treated as 1.
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            inner: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
        }
    }

    /// Pacer with the provider's default rate.
    pub fn for_provider(provider: ProviderType) -> Self {
        Self::new(default_rps_for_provider(provider))
    }

    /// Wait until a request is allowed.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

/// Rate limit counters reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Maximum requests allowed per period.
    pub limit: Option<u64>,
    /// Remaining requests in current period.
    pub remaining: Option<u64>,
    /// When the rate limit resets.
    pub reset_at: Option<DateTime<Utc>>,
}

/// Result of inspecting a response for throttling.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RateLimitDetection {
    pub is_rate_limited: bool,
    pub rate_limit_info: Option<RateLimitInfo>,
    /// Authoritative delay supplied by the provider.
    pub retry_after: Option<Duration>,
}

/// Header names carrying rate limit counters, per provider.
fn counter_headers(provider: ProviderType) -> (&'static str, &'static str, &'static str) {
    match provider {
        ProviderType::GitHub => (
            "x-ratelimit-limit",
            "x-ratelimit-remaining",
            "x-ratelimit-reset",
        ),
        ProviderType::GitLab => ("ratelimit-limit", "ratelimit-remaining", "ratelimit-reset"),
        ProviderType::Bitbucket => (
            "x-ratelimit-limit",
            "x-ratelimit-remaining",
            "x-ratelimit-reset",
        ),
    }
}

/// Parse the rate limit counters from response headers.
pub fn parse_rate_limit_headers(
    headers: &HttpHeaders,
    provider: ProviderType,
) -> Option<RateLimitInfo> {
    let (limit_h, remaining_h, reset_h) = counter_headers(provider);
    let limit = header_get(headers, limit_h).and_then(|v| v.trim().parse().ok());
    let remaining = header_get(headers, remaining_h).and_then(|v| v.trim().parse().ok());
    let reset_at = header_get(headers, reset_h)
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|epoch| Utc.timestamp_opt(epoch, 0).single());

    if limit.is_none() && remaining.is_none() && reset_at.is_none() {
        return None;
    }

    Some(RateLimitInfo {
        limit,
        remaining,
        reset_at,
    })
}

/// Decide whether a response is a throttling signal.
///
/// 429 is a rate limit for every provider; 403 only for GitHub, which uses it
/// for both primary and secondary limits. The delay comes from `Retry-After`
/// (seconds), or from the reset epoch when the remaining count is zero.
/// `now` anchors the reset-epoch arithmetic.
pub fn detect_at(
    status: u16,
    headers: &HttpHeaders,
    provider: ProviderType,
    now: DateTime<Utc>,
) -> RateLimitDetection {
    let is_rate_limited = match status {
        429 => true,
        403 => provider == ProviderType::GitHub,
        _ => false,
    };
    if !is_rate_limited {
        return RateLimitDetection::default();
    }

    let info = parse_rate_limit_headers(headers, provider);

    let retry_after = header_get(headers, "retry-after")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .or_else(|| {
            let info = info.as_ref()?;
            if info.remaining != Some(0) {
                return None;
            }
            let reset_at = info.reset_at?;
            Some((reset_at - now).to_std().unwrap_or(Duration::ZERO))
        });

    RateLimitDetection {
        is_rate_limited,
        rate_limit_info: info,
        retry_after,
    }
}

/// [`detect_at`] anchored at the current time.
pub fn detect(status: u16, headers: &HttpHeaders, provider: ProviderType) -> RateLimitDetection {
    detect_at(status, headers, provider, Utc::now())
}
