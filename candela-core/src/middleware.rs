//! Middleware trait for wrapping `Transport` implementations.

use std::sync::Arc;

use crate::connector::Transport;

/// Trait implemented by transport middleware layers.
///
/// A middleware consumes an inner `Transport` and returns a wrapped transport
/// that augments its behavior (pacing, retries).
pub trait Middleware: Send + Sync {
    /// Apply this middleware to wrap an inner transport and return the wrapped transport.
    fn apply(self: Box<Self>, inner: Arc<dyn Transport>) -> Arc<dyn Transport>;

    /// Human-readable middleware name for introspection/logging.
    fn name(&self) -> &'static str;

    /// Opaque configuration snapshot for serialization/inspection.
    fn config_json(&self) -> serde_json::Value;
}
