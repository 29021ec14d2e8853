//! Resilience utilities: retry with backoff and send pacing.
//!
//! - [`RetryConfig`]: exponential backoff policy for transient failures
//! - [`with_retry`]: drives an operation through the policy
//! - [`SendPacer`]: enforces the configured delay between consecutive sends
//!
//! The pacer exists because providers rate-limit outbound sends; an ad hoc
//! sleep scattered through the engine would be untestable, so the policy is
//! an explicit object driven by the configured interval.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> channel_mirror::error::Result<()> {
//! use channel_mirror::resilience::{with_retry, RetryConfig, SendPacer};
//! use std::time::Duration;
//!
//! let retry = RetryConfig::default();
//! let value = with_retry(&retry, "send_text", || async { Ok(42) }).await?;
//!
//! let pacer = SendPacer::new(Duration::from_millis(1500));
//! pacer.pause().await; // First call returns immediately
//! pacer.pause().await; // Subsequent calls wait out the interval
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use governor::{
    clock::DefaultClock,
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovLimiter,
};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for transient-failure retry behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: usize,

    /// Initial delay before the first retry.
    pub initial_delay: Duration,

    /// Maximum delay between retries (ceiling for exponential backoff).
    pub max_delay: Duration,

    /// Backoff multiplier (e.g., 2.0 = double delay each retry).
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
        }
    }
}

impl RetryConfig {
    /// Fast-fail retry for tests.
    pub fn testing() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            backoff_factor: 2.0,
        }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Calculate delay for a given attempt number (1-indexed).
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return self.initial_delay;
        }

        let multiplier = self.backoff_factor.powi((attempt - 1) as i32);
        let delay_secs = self.initial_delay.as_secs_f64() * multiplier;
        let delay = Duration::from_secs_f64(delay_secs);

        std::cmp::min(delay, self.max_delay)
    }
}

/// Execute an operation, retrying transient failures with backoff.
///
/// Retries only while
/// [`MirrorError::is_retryable()`](crate::error::MirrorError::is_retryable)
/// holds and attempts remain; non-retryable errors pass through
/// immediately so `SizeExceeded`
/// or `MediaUnavailable` never burn retry budget.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, operation: &str, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;
        match f().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation, attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                let delay = config.delay_for_attempt(attempt);
                warn!(
                    operation,
                    attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "transient failure, retrying"
                );
                crate::metrics::record_retry(operation);
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if e.is_retryable() {
                    warn!(operation, attempt, "transient failure, retries exhausted");
                }
                return Err(e);
            }
        }
    }
}

/// Enforces the configured pacing delay between consecutive sends.
///
/// Token bucket with a single-permit burst refilling once per interval:
/// the first send goes through immediately, every following send waits out
/// the remainder of the interval. A zero interval disables pacing.
pub struct SendPacer {
    limiter: Option<GovLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
    interval: Duration,
}

impl SendPacer {
    /// Create a pacer with the given inter-send interval.
    pub fn new(interval: Duration) -> Self {
        // Quota::with_period returns None for a zero period, which maps
        // exactly onto "pacing disabled".
        let limiter = Quota::with_period(interval)
            .map(|quota| quota.allow_burst(NonZeroU32::MIN))
            .map(GovLimiter::direct);

        Self { limiter, interval }
    }

    /// Wait until the next send is allowed.
    ///
    /// This method is cancel-safe.
    pub async fn pause(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    /// The configured interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether pacing is active.
    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }
}
