use std::time::Duration;

use async_trait::async_trait;
use candela_core::CandelaError;
use candela_core::connector::{Query, Transport};
use reqwest::StatusCode;
use url::Url;

const USER_AGENT: &str = concat!("candela/", env!("CARGO_PKG_VERSION"));

/// Map a transport-level reqwest failure onto the error taxonomy.
pub fn classify_reqwest(e: &reqwest::Error, path: &str) -> CandelaError {
    if e.is_timeout() {
        CandelaError::timeout(path)
    } else if e.is_decode() {
        CandelaError::data(e.to_string())
    } else {
        CandelaError::Connect(e.to_string())
    }
}

/// Map a non-success HTTP status onto the error taxonomy.
///
/// 429 becomes `RateLimited`; every other status keeps its code so
/// [`CandelaError::is_transient`] can tell 5xx from 4xx.
pub fn classify_status(status: StatusCode, body: &str) -> CandelaError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return CandelaError::RateLimited;
    }
    let msg = if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("").to_string()
    } else {
        body.chars().take(256).collect()
    };
    CandelaError::http(status.as_u16(), msg)
}

/// Raw HTTP transport. Performs exactly one request per call; pacing and
/// retries are layered on top with `candela-middleware`.
pub struct HttpTransport {
    client: reqwest::Client,
    base: Url,
}

impl HttpTransport {
    /// Transport against [`DEFAULT_BASE_URL`](crate::DEFAULT_BASE_URL).
    ///
    /// # Errors
    /// Returns `CandelaError::Other` if the HTTP client cannot be constructed.
    pub fn new_default() -> Result<Self, CandelaError> {
        Self::new(crate::DEFAULT_BASE_URL, Duration::from_secs(10))
    }

    /// Transport against `base_url` with a client-level request `timeout`.
    ///
    /// # Errors
    /// Returns `InvalidArg` for an unparsable URL and `Other` if the HTTP
    /// client cannot be constructed.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CandelaError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| CandelaError::Other(format!("http client: {e}")))?;
        Self::with_client(client, base_url)
    }

    /// Build from a caller-provided `reqwest::Client`.
    ///
    /// # Errors
    /// Returns `InvalidArg` if `base_url` does not parse.
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, CandelaError> {
        let mut base = Url::parse(base_url)
            .map_err(|e| CandelaError::InvalidArg(format!("base url {base_url}: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { client, base })
    }

    /// The base URL requests are resolved against.
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    fn url_for(&self, path: &str, query: &Query) -> Result<Url, CandelaError> {
        let mut url = self
            .base
            .join(path.trim_start_matches('/'))
            .map_err(|e| CandelaError::InvalidArg(format!("path {path}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "candela-coinbase"
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "candela::coinbase::get", skip(self, query), err)
    )]
    async fn get(&self, path: &str, query: &Query) -> Result<serde_json::Value, CandelaError> {
        let url = self.url_for(path, query)?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_reqwest(&e, path))?;
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(|e| classify_reqwest(&e, path))?;
        if !status.is_success() {
            return Err(classify_status(status, &String::from_utf8_lossy(&bytes)));
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| CandelaError::data(format!("{path}: malformed body: {e}")))
    }
}
