use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use candela_core::connector::{Query, Transport};
use candela_core::{CandelaError, Middleware};

/// Transport wrapper that fails an attempt with `Timeout` once `deadline` elapses.
pub struct TimeoutTransport {
    inner: Arc<dyn Transport>,
    deadline: Duration,
}

impl TimeoutTransport {
    /// Wrap `inner`, bounding each call by `deadline`.
    pub fn new(inner: Arc<dyn Transport>, deadline: Duration) -> Self {
        Self { inner, deadline }
    }
}

#[async_trait]
impl Transport for TimeoutTransport {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "candela::middleware::timeout",
            skip(self, query),
            fields(
                transport = self.inner.name(),
                timeout_ms = u64::try_from(self.deadline.as_millis()).unwrap_or(u64::MAX),
            ),
        )
    )]
    async fn get(&self, path: &str, query: &Query) -> Result<serde_json::Value, CandelaError> {
        (tokio::time::timeout(self.deadline, self.inner.get(path, query)).await)
            .unwrap_or_else(|_| Err(CandelaError::timeout(path)))
    }
}

/// Middleware config for constructing a [`TimeoutTransport`].
pub struct TimeoutMiddleware {
    deadline: Duration,
}

impl TimeoutMiddleware {
    /// Bound every attempt by `deadline`.
    #[must_use]
    pub const fn new(deadline: Duration) -> Self {
        Self { deadline }
    }
}

impl Middleware for TimeoutMiddleware {
    fn apply(self: Box<Self>, inner: Arc<dyn Transport>) -> Arc<dyn Transport> {
        Arc::new(TimeoutTransport::new(inner, self.deadline))
    }

    fn name(&self) -> &'static str {
        "TimeoutTransport"
    }

    fn config_json(&self) -> serde_json::Value {
        serde_json::json!({ "timeout_ms": self.deadline.as_millis() })
    }
}
