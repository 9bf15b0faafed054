use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for the candela workspace.
///
/// Variants fall into two classes. Transient failures (timeouts, rate-limit
/// signals, connection resets, 5xx) are retried by the transport layer and never
/// leave it as such; everything else is fatal and surfaces to the caller.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CandelaError {
    /// A single transport attempt exceeded its deadline.
    #[error("request timed out: {what}")]
    Timeout {
        /// Description of the request that timed out (usually the path).
        what: String,
    },

    /// The exchange signalled that the caller is over its rate limit (HTTP 429).
    #[error("rate limited by upstream")]
    RateLimited,

    /// The exchange answered with a non-success HTTP status.
    #[error("http {status}: {msg}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        msg: String,
    },

    /// The connection could not be established or was reset mid-flight.
    #[error("connection failed: {0}")]
    Connect(String),

    /// Issues with the returned data (malformed JSON, short rows, etc.).
    #[error("data issue: {0}")]
    Data(String),

    /// Invalid input argument.
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// The requested resource has no data at all, e.g. a product that never traded.
    #[error("not found: {what}")]
    NotFound {
        /// Description of the missing resource, e.g. "history for BTC-USD".
        what: String,
    },

    /// The retry budget was spent on transient failures.
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Number of attempts made (including the first one).
        attempts: u32,
        /// The transient error seen on the final attempt.
        last: Box<CandelaError>,
    },

    /// Reading or writing persisted cache state failed.
    #[error("storage: {0}")]
    Storage(String),

    /// Unknown/opaque error.
    #[error("unknown error: {0}")]
    Other(String),
}

impl CandelaError {
    /// Helper: build a `NotFound` error for a description of the missing resource.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Helper: build a `Timeout` error.
    pub fn timeout(what: impl Into<String>) -> Self {
        Self::Timeout { what: what.into() }
    }

    /// Helper: build an `Http` error from a status code and message.
    pub fn http(status: u16, msg: impl Into<String>) -> Self {
        Self::Http {
            status,
            msg: msg.into(),
        }
    }

    /// Helper: build a `Data` error.
    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    /// Helper: build a `Storage` error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Returns true if retrying the same request may succeed.
    ///
    /// `RetriesExhausted` is deliberately not transient: it is the fatal form a
    /// transient failure takes once the retry budget is spent.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::RateLimited | Self::Connect(_) => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns true for the fatal class (the complement of [`is_transient`](Self::is_transient)).
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_transient()
    }
}

impl From<std::io::Error> for CandelaError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for CandelaError {
    fn from(e: serde_json::Error) -> Self {
        Self::Data(e.to_string())
    }
}
