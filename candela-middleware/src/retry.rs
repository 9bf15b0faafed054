//! Bounded retry with capped exponential backoff.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use candela_core::connector::{Query, Transport};
use candela_core::{CandelaError, Middleware, RetryConfig};

use crate::backoff::jittered;

type Retryable = Arc<dyn Fn(&CandelaError) -> bool + Send + Sync>;

/// Which failures to retry and how long to wait between attempts.
///
/// The n-th retry waits `min(max_delay, base_delay * 2^(n-1))` plus optional jitter.
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter_percent: u32,
    retryable: Retryable,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("jitter_percent", &self.jitter_percent)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Build a policy that retries [`CandelaError::is_transient`] failures.
    #[must_use]
    pub fn from_config(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            base_delay: cfg.base_delay,
            max_delay: cfg.max_delay,
            jitter_percent: u32::from(cfg.jitter_percent.min(100)),
            retryable: Arc::new(CandelaError::is_transient),
        }
    }

    /// Replace the retryable-error predicate.
    #[must_use]
    pub fn retry_if<F>(mut self, pred: F) -> Self
    where
        F: Fn(&CandelaError) -> bool + Send + Sync + 'static,
    {
        self.retryable = Arc::new(pred);
        self
    }

    /// Total attempts including the first one.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether `err` should be retried.
    #[must_use]
    pub fn is_retryable(&self, err: &CandelaError) -> bool {
        (self.retryable)(err)
    }

    /// Backoff before retry number `retry` (1-based), before jitter.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    fn wait_before(&self, retry: u32) -> Duration {
        jittered(self.delay_for(retry), self.jitter_percent)
    }
}

/// Transport wrapper that retries failures the policy deems retryable.
///
/// Non-retryable errors are returned as-is on first sight. When the attempt
/// budget is spent the last error is wrapped in
/// [`CandelaError::RetriesExhausted`], which is fatal.
pub struct RetryingTransport {
    inner: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl RetryingTransport {
    /// Wrap `inner` with `policy`.
    pub fn new(inner: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// The active policy.
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl Transport for RetryingTransport {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn get(&self, path: &str, query: &Query) -> Result<serde_json::Value, CandelaError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let err = match self.inner.get(path, query).await {
                Ok(body) => return Ok(body),
                Err(e) => e,
            };
            if !self.policy.is_retryable(&err) {
                return Err(err);
            }
            if attempt >= self.policy.max_attempts {
                #[cfg(feature = "tracing")]
                tracing::warn!(path, attempts = attempt, error = %err, "retry budget exhausted");
                return Err(CandelaError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }
            let delay = self.policy.wait_before(attempt);
            #[cfg(feature = "tracing")]
            tracing::warn!(
                path,
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "transient failure, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Middleware config for constructing a [`RetryingTransport`].
pub struct RetryMiddleware {
    policy: RetryPolicy,
}

impl RetryMiddleware {
    /// Retry with `policy`.
    #[must_use]
    pub const fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }
}

impl Middleware for RetryMiddleware {
    fn apply(self: Box<Self>, inner: Arc<dyn Transport>) -> Arc<dyn Transport> {
        Arc::new(RetryingTransport::new(inner, self.policy))
    }

    fn name(&self) -> &'static str {
        "RetryingTransport"
    }

    fn config_json(&self) -> serde_json::Value {
        serde_json::json!({
            "max_attempts": self.policy.max_attempts,
            "base_delay_ms": self.policy.base_delay.as_millis(),
            "max_delay_ms": self.policy.max_delay.as_millis(),
            "jitter_percent": self.policy.jitter_percent,
        })
    }
}
