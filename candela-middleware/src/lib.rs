//! candela-middleware
//!
//! Wrappers that sit between the engine and a raw exchange transport:
//!
//! - [`RateLimitedTransport`]: blocks each call until the shared limiter grants a slot.
//! - [`RetryingTransport`]: retries transient failures with capped exponential backoff.
//! - [`TimeoutTransport`]: bounds every individual attempt.
//! - [`TransportBuilder`]: composes the layers in a fixed onion order.

mod backoff;
mod builder;
mod ratelimit;
mod retry;
mod timeout;

pub use crate::backoff::jittered;
pub use crate::builder::TransportBuilder;
pub use crate::ratelimit::{
    RateLimitMiddleware, RateLimitedTransport, RateLimiter, TokenBucket, Unlimited,
};
pub use crate::retry::{RetryMiddleware, RetryPolicy, RetryingTransport};
pub use crate::timeout::{TimeoutMiddleware, TimeoutTransport};
