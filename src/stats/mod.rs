//! Request Statistics Module
//!
//! Per-request hit counts and a base-10 logarithmic latency histogram,
//! kept in the counter store.
//!
//! Counter keys:
//! - `hits:<request identity>` - number of requests seen for that identity
//! - `time:<order>` - number of requests whose elapsed nanoseconds have
//!   integer base-10 logarithm `<order>`

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use futures::TryStreamExt;
use serde::Serialize;
use tracing::warn;

use crate::counter::Counters;
use crate::error::Result;

const HITS_PREFIX: &str = "hits:";
const TIME_PREFIX: &str = "time:";

/// Request count for one request identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hits {
    pub endpoint: String,
    pub num_requests: u64,
}

/// Request count for one order-of-magnitude latency bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Times {
    pub num_requests: u64,
    pub more_than: String,
    pub less_than: String,
}

/// Integer base-10 logarithm of `nanos`; zero lands in bucket 0.
pub fn order_of_magnitude(nanos: u128) -> u32 {
    if nanos == 0 {
        0
    } else {
        nanos.ilog10()
    }
}

/// Lower and upper bounds reported for bucket `order`: `10^(order-1)` to `10^order` nanoseconds.
pub fn bucket_bounds(order: u32) -> (Duration, Duration) {
    let upper = 10u64.saturating_pow(order);
    let lower = if order == 0 { 0 } else { upper / 10 };
    (Duration::from_nanos(lower), Duration::from_nanos(upper))
}

/// Records and reports request statistics.
#[derive(Debug, Clone)]
pub struct StatsRecorder {
    counters: Counters,
}

impl StatsRecorder {
    pub fn new(counters: Counters) -> Self {
        Self { counters }
    }

    /// Counts one request for `identity` that took `elapsed`.
    ///
    /// Counter failures are logged and dropped; statistics never fail a request.
    pub async fn record(&self, identity: &str, elapsed: Duration) {
        let order = order_of_magnitude(elapsed.as_nanos());
        if let Err(e) = self.counters.incr(&format!("{}{}", HITS_PREFIX, identity)).await {
            warn!(identity = %identity, error = %e, "Failed to count hit");
        }
        if let Err(e) = self.counters.incr(&format!("{}{}", TIME_PREFIX, order)).await {
            warn!(order = order, error = %e, "Failed to count request time");
        }
    }

    /// Hit counts per request identity, sorted by identity.
    pub async fn hits(&self) -> Result<Vec<Hits>> {
        let counts = self.collect(HITS_PREFIX).await?;
        Ok(counts
            .into_iter()
            .map(|(endpoint, num_requests)| Hits {
                endpoint,
                num_requests,
            })
            .collect())
    }

    /// Request counts per populated latency bucket, sorted by bucket.
    pub async fn times(&self) -> Result<Vec<Times>> {
        let counts = self.collect(TIME_PREFIX).await?;
        let mut buckets: BTreeMap<u32, u64> = BTreeMap::new();
        for (order, count) in counts {
            match order.parse::<u32>() {
                Ok(order) => *buckets.entry(order).or_default() += count,
                Err(_) => warn!(key = %order, "Ignoring malformed time bucket"),
            }
        }
        Ok(buckets
            .into_iter()
            .map(|(order, num_requests)| {
                let (lower, upper) = bucket_bounds(order);
                Times {
                    num_requests,
                    more_than: format!("{:?}", lower),
                    less_than: format!("{:?}", upper),
                }
            })
            .collect())
    }

    /// Current values of every counter under `prefix`, keyed by the rest of the key.
    ///
    /// A key reported twice by the enumeration is counted once.
    async fn collect(&self, prefix: &str) -> Result<BTreeMap<String, u64>> {
        let mut keys = self.counters.keys().await?;
        let mut counts = BTreeMap::new();
        while let Some(key) = keys.try_next().await? {
            let Some(suffix) = key.strip_prefix(prefix) else {
                continue;
            };
            if counts.contains_key(suffix) {
                continue;
            }
            if let Some(value) = self.counters.get(&key).await? {
                counts.insert(suffix.to_string(), value);
            }
        }
        Ok(counts)
    }
}

/// Middleware that times every request and records it.
///
/// The request identity is the URI path plus query string.
pub async fn track_requests(
    State(stats): State<StatsRecorder>,
    request: Request,
    next: Next,
) -> Response {
    let identity = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let started = Instant::now();
    let response = next.run(request).await;
    stats.record(&identity, started.elapsed()).await;
    response
}
