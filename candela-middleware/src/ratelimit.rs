//! Shared outbound call pacing.
//!
//! A single [`RateLimiter`] is created per process (or per test) and handed to
//! every transport stack that talks to the same exchange, so the aggregate call
//! rate stays under the exchange cap no matter how many tasks fan out.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use candela_core::connector::{Query, Transport};
use candela_core::{CandelaError, Middleware, RateLimitConfig};
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Grants permission to issue one outbound call.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Wait until a call may be issued. Never fails; callers queue instead.
    async fn acquire(&self);
}

/// Limiter that never waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unlimited;

#[async_trait]
impl RateLimiter for Unlimited {
    async fn acquire(&self) {}
}

/// Fixed-rate limiter with an optional burst allowance.
///
/// Implemented as a generic cell rate algorithm: the limiter tracks the
/// theoretical arrival time of the next call and hands out start instants
/// spaced `interval` apart. Slots are assigned under a FIFO mutex, so waiters
/// are served in arrival order and none can starve.
pub struct TokenBucket {
    interval: Duration,
    tolerance: Duration,
    tat: Mutex<Instant>,
}

impl TokenBucket {
    /// Create a limiter granting `config.per_second` calls per second.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        let interval = config.interval();
        Self {
            interval,
            tolerance: interval * config.burst.max(1).saturating_sub(1),
            tat: Mutex::new(Instant::now()),
        }
    }

    /// Convenience: build and wrap in an `Arc` for sharing.
    #[must_use]
    pub fn shared(config: RateLimitConfig) -> Arc<dyn RateLimiter> {
        Arc::new(Self::new(config))
    }

    /// Spacing between consecutive grants.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    async fn reserve(&self) -> Instant {
        let mut tat = self.tat.lock().await;
        let now = Instant::now();
        let earliest = tat.checked_sub(self.tolerance).unwrap_or(now);
        let start = now.max(earliest);
        *tat = (*tat).max(start) + self.interval;
        start
    }
}

#[async_trait]
impl RateLimiter for TokenBucket {
    async fn acquire(&self) {
        let start = self.reserve().await;
        tokio::time::sleep_until(start).await;
    }
}

/// Transport wrapper that acquires a limiter slot before every call.
pub struct RateLimitedTransport {
    inner: Arc<dyn Transport>,
    limiter: Arc<dyn RateLimiter>,
}

impl RateLimitedTransport {
    /// Wrap `inner`, pacing calls through `limiter`.
    pub fn new(inner: Arc<dyn Transport>, limiter: Arc<dyn RateLimiter>) -> Self {
        Self { inner, limiter }
    }

    /// Access the inner transport.
    pub fn inner(&self) -> &Arc<dyn Transport> {
        &self.inner
    }
}

#[async_trait]
impl Transport for RateLimitedTransport {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn get(&self, path: &str, query: &Query) -> Result<serde_json::Value, CandelaError> {
        self.limiter.acquire().await;
        self.inner.get(path, query).await
    }
}

/// Middleware config for constructing a [`RateLimitedTransport`].
pub struct RateLimitMiddleware {
    limiter: Arc<dyn RateLimiter>,
    config: Option<RateLimitConfig>,
}

impl RateLimitMiddleware {
    /// Pace through an existing, possibly shared, limiter.
    pub fn new(limiter: Arc<dyn RateLimiter>) -> Self {
        Self {
            limiter,
            config: None,
        }
    }

    /// Pace through a fresh [`TokenBucket`] built from `config`.
    #[must_use]
    pub fn from_config(config: RateLimitConfig) -> Self {
        Self {
            limiter: TokenBucket::shared(config),
            config: Some(config),
        }
    }
}

impl Middleware for RateLimitMiddleware {
    fn apply(self: Box<Self>, inner: Arc<dyn Transport>) -> Arc<dyn Transport> {
        Arc::new(RateLimitedTransport::new(inner, self.limiter))
    }

    fn name(&self) -> &'static str {
        "RateLimitedTransport"
    }

    fn config_json(&self) -> serde_json::Value {
        self.config.map_or_else(
            || serde_json::json!({ "shared": true }),
            |c| {
                serde_json::json!({
                    "per_second": c.per_second,
                    "burst": c.burst,
                })
            },
        )
    }
}
