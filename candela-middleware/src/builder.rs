//! Builder for composing a transport with middleware layers.
//!
//! # Middleware Ordering Convention
//!
//! Layers form an "onion" around the raw transport, always in this order:
//!
//! ```text
//! Caller
//!     ↓
//! RetryingTransport     (outermost: sees every attempt's outcome)
//!     ↓
//! RateLimitedTransport  (one limiter slot per attempt, retries included)
//!     ↓
//! TimeoutTransport      (deadline covers the wire call only, not the queue)
//!     ↓
//! Raw transport (e.g. HTTP)
//! ```
//!
//! The `layers` vector stores middleware **outermost-first**; `build()` applies
//! them in reverse to construct the nesting. Adding a layer that is already
//! present replaces it in place.

use std::sync::Arc;
use std::time::Duration;

use candela_core::connector::Transport;
use candela_core::{CandelaError, Middleware, RateLimitConfig, RetryConfig};

use crate::ratelimit::{RateLimitMiddleware, RateLimiter};
use crate::retry::{RetryMiddleware, RetryPolicy};
use crate::timeout::TimeoutMiddleware;

const ORDER: [&str; 3] = ["RetryingTransport", "RateLimitedTransport", "TimeoutTransport"];

fn rank(name: &str) -> usize {
    ORDER.iter().position(|n| *n == name).unwrap_or(ORDER.len())
}

/// Generic middleware builder for composing a transport with layered wrappers.
///
/// See [module-level documentation](self) for details on layer ordering.
pub struct TransportBuilder {
    raw: Arc<dyn Transport>,
    /// Middleware layers in outermost-first order.
    layers: Vec<Box<dyn Middleware>>,
}

impl TransportBuilder {
    /// Create a new builder from a raw, unwrapped transport.
    #[must_use]
    pub fn new(raw: Arc<dyn Transport>) -> Self {
        Self {
            raw,
            layers: Vec::new(),
        }
    }

    fn insert(mut self, layer: Box<dyn Middleware>) -> Self {
        let name = layer.name();
        self.layers.retain(|m| m.name() != name);
        let at = self
            .layers
            .iter()
            .position(|m| rank(m.name()) > rank(name))
            .unwrap_or(self.layers.len());
        self.layers.insert(at, layer);
        self
    }

    /// Add or replace a custom middleware layer.
    ///
    /// Unknown layers sit inside the built-in ones, closest to the raw transport.
    #[must_use]
    pub fn with_layer(self, layer: Box<dyn Middleware>) -> Self {
        self.insert(layer)
    }

    /// Add or replace pacing through a shared limiter.
    #[must_use]
    pub fn with_limiter(self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.insert(Box::new(RateLimitMiddleware::new(limiter)))
    }

    /// Add or replace pacing through a private limiter built from `cfg`.
    #[must_use]
    pub fn with_rate_limit(self, cfg: RateLimitConfig) -> Self {
        self.insert(Box::new(RateLimitMiddleware::from_config(cfg)))
    }

    /// Add or replace the retry policy.
    #[must_use]
    pub fn with_retry(self, policy: RetryPolicy) -> Self {
        self.insert(Box::new(RetryMiddleware::new(policy)))
    }

    /// Add or replace the per-attempt deadline.
    #[must_use]
    pub fn with_timeout(self, deadline: Duration) -> Self {
        self.insert(Box::new(TimeoutMiddleware::new(deadline)))
    }

    /// Shortcut: retry policy and per-attempt deadline from one config.
    #[must_use]
    pub fn with_retry_config(self, cfg: &RetryConfig) -> Self {
        self.with_retry(RetryPolicy::from_config(cfg))
            .with_timeout(cfg.attempt_timeout)
    }

    /// Remove a layer by name if present.
    #[must_use]
    pub fn without(mut self, name: &str) -> Self {
        self.layers.retain(|m| m.name() != name);
        self
    }

    /// Layer names and config snapshots, outermost first, followed by the raw transport.
    #[must_use]
    pub fn describe(&self) -> Vec<(&'static str, serde_json::Value)> {
        let mut out: Vec<_> = self
            .layers
            .iter()
            .map(|m| (m.name(), m.config_json()))
            .collect();
        out.push((
            "RawTransport",
            serde_json::json!({ "name": self.raw.name() }),
        ));
        out
    }

    /// Build the wrapped transport by applying layers innermost to outermost.
    ///
    /// # Errors
    /// Returns `CandelaError::InvalidArg` when a retry layer is configured
    /// without a per-attempt deadline, since a stalled attempt would then
    /// block the retry loop forever.
    pub fn build(self) -> Result<Arc<dyn Transport>, CandelaError> {
        let has = |name: &str| self.layers.iter().any(|m| m.name() == name);
        if has("RetryingTransport") && !has("TimeoutTransport") {
            return Err(CandelaError::InvalidArg(
                "retry layer requires a per-attempt timeout".into(),
            ));
        }
        let mut wrapped = self.raw;
        for layer in self.layers.into_iter().rev() {
            wrapped = layer.apply(wrapped);
        }
        Ok(wrapped)
    }
}
