use std::sync::Arc;

use candela_core::connector::Transport;
use candela_core::{CandelaError, RetryConfig};
use candela_middleware::{RateLimiter, TransportBuilder};

use crate::HttpTransport;

/// Builder type alias specialized for the Coinbase transport.
pub type CoinbaseTransportBuilder = TransportBuilder;

impl HttpTransport {
    /// Returns an unconfigured builder around the default production transport.
    ///
    /// # Errors
    /// Fails if the HTTP client cannot be constructed.
    pub fn builder() -> Result<CoinbaseTransportBuilder, CandelaError> {
        let raw: Arc<dyn Transport> = Arc::new(Self::new_default()?);
        Ok(TransportBuilder::new(raw))
    }

    /// Returns a builder paced by `limiter` with the default retry policy and
    /// per-attempt deadline.
    ///
    /// Pass the same limiter to every stack that talks to Coinbase.
    ///
    /// # Errors
    /// Fails if the HTTP client cannot be constructed.
    pub fn rate_limited(
        limiter: Arc<dyn RateLimiter>,
    ) -> Result<CoinbaseTransportBuilder, CandelaError> {
        Ok(Self::builder()?
            .with_limiter(limiter)
            .with_retry_config(&RetryConfig::default()))
    }
}
