//! Fake exchange speaking the candle endpoint over the [`Transport`] seam.
//!
//! Every listed product has exactly one synthetic candle per bucket from its
//! listing date onwards (minus configured quiet periods), so tests can predict
//! results without fixtures. Failures and stalls are scripted with
//! [`Trigger`]/[`MockBehavior`] rules.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tokio::sync::Mutex;

use candela_core::connector::{Query, Transport};
use candela_core::{CandelaError, Candle, Granularity, MAX_CANDLES_PER_REQUEST};

/// What a matching rule does to the call.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Fail immediately with the provided error.
    Fail(CandelaError),
    /// Hang indefinitely (simulate a stalled connection).
    Hang,
}

/// Which calls a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Every call.
    Any,
    /// The n-th call overall (1-based).
    Call(usize),
    /// Calls for one product.
    Product(String),
    /// Calls whose window starts at exactly this instant.
    WindowStart(DateTime<Utc>),
}

/// One recorded candle request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    /// Requested product.
    pub product_id: String,
    /// Requested bucket width.
    pub granularity: Granularity,
    /// Window start.
    pub start: DateTime<Utc>,
    /// Window end.
    pub end: DateTime<Utc>,
}

struct Rule {
    trigger: Trigger,
    behavior: MockBehavior,
    remaining: Option<u32>,
}

#[derive(Default)]
struct InternalState {
    rules: Vec<Rule>,
    log: Vec<MockCall>,
}

/// In-process exchange double.
pub struct MockExchange {
    name: &'static str,
    listings: HashMap<String, DateTime<Utc>>,
    quiet: Vec<(String, DateTime<Utc>, DateTime<Utc>)>,
    max_candles: u32,
    calls: AtomicUsize,
    state: Mutex<InternalState>,
}

impl Default for MockExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExchange {
    /// An exchange with no listed products and a 300-candle request ceiling.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "candela-mock",
            listings: HashMap::new(),
            quiet: Vec::new(),
            max_candles: MAX_CANDLES_PER_REQUEST,
            calls: AtomicUsize::new(0),
            state: Mutex::new(InternalState::default()),
        }
    }

    /// List `product_id` with data from midnight of `first_day` onwards.
    #[must_use]
    pub fn with_listing(mut self, product_id: &str, first_day: NaiveDate) -> Self {
        self.listings
            .insert(product_id.to_string(), midnight(first_day));
        self
    }

    /// No trades for `product_id` in `[start, end)`.
    #[must_use]
    pub fn with_quiet_period(
        mut self,
        product_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        self.quiet.push((product_id.to_string(), start, end));
        self
    }

    /// Reject requests spanning more than `n` buckets.
    #[must_use]
    pub fn with_max_candles(mut self, n: u32) -> Self {
        self.max_candles = n;
        self
    }

    /// Add a rule that fires at most `times` times (`None` = forever).
    #[must_use]
    pub fn with_rule(mut self, trigger: Trigger, behavior: MockBehavior, times: Option<u32>) -> Self {
        self.state.get_mut().rules.push(Rule {
            trigger,
            behavior,
            remaining: times,
        });
        self
    }

    /// Add a rule at runtime.
    pub async fn push_rule(&self, trigger: Trigger, behavior: MockBehavior, times: Option<u32>) {
        self.state.lock().await.rules.push(Rule {
            trigger,
            behavior,
            remaining: times,
        });
    }

    /// Drop every rule.
    pub async fn clear_rules(&self) {
        self.state.lock().await.rules.clear();
    }

    /// Total `get` calls seen, including failed and malformed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Copy of the candle request log.
    pub async fn call_log(&self) -> Vec<MockCall> {
        self.state.lock().await.log.clone()
    }

    /// The synthetic candle this exchange reports for `ts`.
    #[must_use]
    pub fn candle_at(ts: DateTime<Utc>, granularity: Granularity) -> Candle {
        let k = ts.timestamp() / i64::from(granularity.seconds());
        let base = 100.0 + (k.rem_euclid(50)) as f64;
        let (open, close) = if k % 2 == 0 {
            (base, base + 1.0)
        } else {
            (base + 1.0, base)
        };
        Candle {
            ts,
            open,
            high: base + 2.0,
            low: base - 1.0,
            close,
            volume: 10.0,
        }
    }

    fn has_trade(&self, product_id: &str, ts: DateTime<Utc>) -> bool {
        let Some(listed) = self.listings.get(product_id) else {
            return false;
        };
        ts >= *listed
            && !self
                .quiet
                .iter()
                .any(|(p, s, e)| p == product_id && ts >= *s && ts < *e)
    }

    async fn matching_behavior(&self, n: usize, call: &MockCall) -> Option<MockBehavior> {
        let mut guard = self.state.lock().await;
        guard.log.push(call.clone());
        let rule = guard.rules.iter_mut().find(|r| {
            r.remaining != Some(0)
                && match &r.trigger {
                    Trigger::Any => true,
                    Trigger::Call(k) => *k == n,
                    Trigger::Product(p) => *p == call.product_id,
                    Trigger::WindowStart(s) => *s == call.start,
                }
        })?;
        if let Some(left) = rule.remaining.as_mut() {
            *left -= 1;
        }
        Some(rule.behavior.clone())
    }
}

fn param<'a>(query: &'a Query, key: &str) -> Result<&'a str, CandelaError> {
    query
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.as_str())
        .ok_or_else(|| CandelaError::http(400, format!("missing {key}")))
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, CandelaError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CandelaError::http(400, format!("bad timestamp {s}: {e}")))
}

fn parse_call(path: &str, query: &Query) -> Result<MockCall, CandelaError> {
    let product_id = path
        .strip_prefix("/products/")
        .and_then(|rest| rest.strip_suffix("/candles"))
        .ok_or_else(|| CandelaError::http(404, format!("no route {path}")))?;
    let granularity = param(query, "granularity")?
        .parse::<u32>()
        .map_err(|e| CandelaError::http(400, e.to_string()))
        .and_then(|g| {
            Granularity::try_from(g).map_err(|_| CandelaError::http(400, "Unsupported granularity"))
        })?;
    Ok(MockCall {
        product_id: product_id.to_string(),
        granularity,
        start: parse_ts(param(query, "start")?)?,
        end: parse_ts(param(query, "end")?)?,
    })
}

#[async_trait]
impl Transport for MockExchange {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn get(&self, path: &str, query: &Query) -> Result<serde_json::Value, CandelaError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let call = parse_call(path, query)?;

        match self.matching_behavior(n, &call).await {
            Some(MockBehavior::Fail(e)) => return Err(e),
            Some(MockBehavior::Hang) => std::future::pending::<()>().await,
            None => {}
        }

        if !self.listings.contains_key(&call.product_id) {
            return Err(CandelaError::http(404, "NotFound"));
        }
        let g = call.granularity.delta();
        let buckets = (call.end - call.start).num_seconds() / g.num_seconds();
        if buckets > i64::from(self.max_candles) {
            return Err(CandelaError::http(
                400,
                "granularity too small for the requested time range",
            ));
        }

        let step = g.num_seconds();
        let first = call.start.timestamp().div_euclid(step) * step;
        let mut ts = DateTime::from_timestamp(first, 0).unwrap_or(call.start);
        if ts < call.start {
            ts += g;
        }
        let mut rows = Vec::new();
        while ts < call.end {
            if self.has_trade(&call.product_id, ts) {
                let c = Self::candle_at(ts, call.granularity);
                rows.push(serde_json::json!([
                    ts.timestamp(),
                    c.low,
                    c.high,
                    c.open,
                    c.close,
                    c.volume
                ]));
            }
            ts += g;
        }
        // The real endpoint answers newest-first.
        rows.reverse();
        Ok(serde_json::Value::Array(rows))
    }
}

/// Midnight UTC of `day`.
#[must_use]
pub fn midnight(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}
