//! Rate-limit retry for provider calls.
//!
//! Only [`ProviderError::RateLimited`] is retried. The delay before each
//! retry is the provider's own `Retry-After`/reset value when it sent one,
//! otherwise [`calculate_backoff_delay`]. Waiting is interruptible through the
//! run's [`CancellationToken`].

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use backon::{BackoffBuilder, Retryable};
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::provider::{ProviderError, Result, short_error_message};
use crate::sync::{EventSender, SyncEvent, emit};

/// Configuration for rate-limit retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Delay before the first retry; doubled per attempt.
    pub base_delay: Duration,
    /// Total invocations of the operation, the first one included.
    pub max_attempts: u32,
    /// Upper bound on a computed delay.
    pub max_delay: Duration,
    /// Upper bound of the uniform random term added to each computed delay.
    pub jitter: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(60),
            max_attempts: 5,
            max_delay: Duration::from_secs(600),
            jitter: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with custom values.
    #[must_use]
    pub fn new(base_delay: Duration, max_attempts: u32, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_attempts,
            max_delay,
            ..Self::default()
        }
    }

    /// Set the jitter range.
    #[must_use]
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }
}

/// `min(base * 2^attempt + uniform(0, jitter), max_delay)`.
///
/// `attempt` is zero-based: the delay before the first retry uses attempt 0.
pub fn calculate_backoff_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let exponential = config
        .base_delay
        .saturating_mul(2u32.saturating_pow(attempt));

    let jitter_ms = u64::try_from(config.jitter.as_millis()).unwrap_or(u64::MAX);
    let jitter = if jitter_ms == 0 {
        Duration::ZERO
    } else {
        Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
    };

    exponential.saturating_add(jitter).min(config.max_delay)
}

/// Delay slot shared between the retried call and the backoff schedule.
///
/// The call records the provider-supplied delay of its latest failure; the
/// schedule consumes it in place of the computed delay.
type ProvidedDelay = Arc<Mutex<Option<Duration>>>;

/// Builds [`RateLimitBackoff`] schedules for `backon`.
#[derive(Debug, Clone)]
pub struct RateLimitBackoffBuilder {
    config: RetryConfig,
    provided: ProvidedDelay,
}

impl RateLimitBackoffBuilder {
    fn new(config: RetryConfig, provided: ProvidedDelay) -> Self {
        Self { config, provided }
    }
}

impl BackoffBuilder for RateLimitBackoffBuilder {
    type Backoff = RateLimitBackoff;

    fn build(self) -> Self::Backoff {
        RateLimitBackoff {
            config: self.config,
            provided: self.provided,
            attempt: 0,
        }
    }
}

/// Delay schedule yielding `max_attempts - 1` delays.
#[derive(Debug)]
pub struct RateLimitBackoff {
    config: RetryConfig,
    provided: ProvidedDelay,
    attempt: u32,
}

impl Iterator for RateLimitBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.attempt.saturating_add(1) >= self.config.max_attempts {
            return None;
        }
        let computed = calculate_backoff_delay(self.attempt, &self.config);
        self.attempt += 1;

        let provided = self
            .provided
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        Some(provided.unwrap_or(computed))
    }
}

/// Execute a provider call, retrying rate-limit failures.
///
/// The call runs at most `config.max_attempts` times. Non-rate-limit errors
/// return immediately; exhaustion returns the last rate-limit error.
/// Cancellation is checked before each attempt and cuts a pending backoff
/// short, in which case [`ProviderError::Cancelled`] is returned.
pub async fn with_retry<T, F, Fut>(
    mut operation: F,
    config: &RetryConfig,
    cancel: &CancellationToken,
    events: Option<&EventSender>,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempt = AtomicU32::new(0);
    let provided: ProvidedDelay = Arc::default();

    let retry_op = || {
        attempt.fetch_add(1, Ordering::SeqCst);
        let call = (!cancel.is_cancelled()).then(&mut operation);
        let provided = Arc::clone(&provided);
        async move {
            let Some(call) = call else {
                return Err(ProviderError::Cancelled);
            };
            let result = call.await;
            if let Err(err) = &result {
                *provided.lock().unwrap_or_else(|e| e.into_inner()) = err.retry_after();
            }
            result
        }
    };

    let sleep_cancel = cancel.clone();
    let sleeper = move |delay: Duration| {
        let cancel = sleep_cancel.clone();
        async move {
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = cancel.cancelled() => {}
            }
        }
    };

    retry_op
        .retry(RateLimitBackoffBuilder::new(
            config.clone(),
            Arc::clone(&provided),
        ))
        .sleep(sleeper)
        .when(ProviderError::is_rate_limited)
        .notify(|err: &ProviderError, delay: Duration| {
            let current_attempt = attempt.load(Ordering::SeqCst);
            emit(
                events,
                SyncEvent::RateLimitBackoff {
                    attempt: current_attempt,
                    retry_after_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                },
            );
            warn!(
                attempt = current_attempt,
                max_attempts = config.max_attempts,
                delay_secs = delay.as_secs(),
                "Rate limited, backing off: {}",
                short_error_message(err)
            );
        })
        .await
}
