//! Request statistics tracking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Latency above which a request counts as slow
pub const SLOW_REQUEST_MS: u64 = 1000;

const DEFAULT_MAX_HISTORY: usize = 1000;

/// Distinct endpoint keys tracked before new ones are folded together
pub const DEFAULT_MAX_ENDPOINTS: usize = 256;

/// Aggregate key for endpoints past the key limit
pub const OVERFLOW_ENDPOINT: &str = "(other)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub endpoint: String,
    pub method: String,
    pub status: u16,
    pub latency_ms: u64,
    pub cache_hit: bool,
    pub at: DateTime<Utc>,
}

impl RequestRecord {
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointStats {
    pub requests: u64,
    pub errors: u64,
    pub avg_latency_ms: f64,
    pub max_latency_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestStatsSummary {
    /// Requests since start or the last reset
    pub total_requests: u64,
    pub total_errors: u64,
    pub error_rate: f64,
    pub cache_hit_rate: f64,
    pub avg_latency_ms: f64,
    pub p95_latency_ms: u64,
    pub slow_requests: u64,
    pub endpoints: BTreeMap<String, EndpointStats>,
}

#[derive(Debug, Default)]
struct RequestLog {
    recent: VecDeque<RequestRecord>,
    total_requests: u64,
    total_errors: u64,
    total_cache_hits: u64,
    total_latency_ms: u64,
    slow_requests: u64,
    endpoints: BTreeMap<String, EndpointTotals>,
}

#[derive(Debug, Default)]
struct EndpointTotals {
    requests: u64,
    errors: u64,
    latency_ms: u64,
    max_latency_ms: u64,
}

/// Rolling request log with lifetime aggregates.
///
/// Percentiles come from the most recent window; counts and averages cover
/// every request recorded since the last reset.
///
/// Pass route templates (`/api/products/:id`) rather than raw paths. Once
/// `max_endpoints - 1` distinct keys exist, unseen endpoints are counted
/// under [`OVERFLOW_ENDPOINT`], so the map never exceeds `max_endpoints`.
#[derive(Debug)]
pub struct RequestMonitor {
    log: Mutex<RequestLog>,
    max_history: usize,
    max_endpoints: usize,
}

impl RequestMonitor {
    pub fn new() -> Self {
        Self::with_history(DEFAULT_MAX_HISTORY)
    }

    pub fn with_history(max_history: usize) -> Self {
        Self::with_limits(max_history, DEFAULT_MAX_ENDPOINTS)
    }

    pub fn with_limits(max_history: usize, max_endpoints: usize) -> Self {
        Self {
            log: Mutex::new(RequestLog::default()),
            max_history: max_history.max(1),
            max_endpoints: max_endpoints.max(2),
        }
    }

    pub fn record(&self, endpoint: &str, method: &str, status: u16, latency: Duration, cache_hit: bool) {
        let latency_ms = latency.as_millis().min(u64::MAX as u128) as u64;
        let record = RequestRecord {
            endpoint: endpoint.to_string(),
            method: method.to_uppercase(),
            status,
            latency_ms,
            cache_hit,
            at: Utc::now(),
        };

        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.total_requests += 1;
        log.total_latency_ms = log.total_latency_ms.saturating_add(latency_ms);
        if record.is_error() {
            log.total_errors += 1;
        }
        if cache_hit {
            log.total_cache_hits += 1;
        }
        if latency_ms > SLOW_REQUEST_MS {
            log.slow_requests += 1;
        }

        // One slot stays free for the overflow key
        let key = if log.endpoints.contains_key(&record.endpoint)
            || log.endpoints.len() + 1 < self.max_endpoints
        {
            record.endpoint.clone()
        } else {
            OVERFLOW_ENDPOINT.to_string()
        };
        let totals = log.endpoints.entry(key).or_default();
        totals.requests += 1;
        totals.latency_ms = totals.latency_ms.saturating_add(latency_ms);
        totals.max_latency_ms = totals.max_latency_ms.max(latency_ms);
        if record.is_error() {
            totals.errors += 1;
        }

        if log.recent.len() >= self.max_history {
            log.recent.pop_front();
        }
        log.recent.push_back(record);
    }

    /// Start timing a request; finish it with [`RequestTimer::finish`].
    pub fn start(&self, endpoint: &str, method: &str) -> RequestTimer<'_> {
        RequestTimer {
            monitor: self,
            endpoint: endpoint.to_string(),
            method: method.to_string(),
            started: Instant::now(),
        }
    }

    pub fn recent(&self, count: usize) -> Vec<RequestRecord> {
        let log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        let skip = log.recent.len().saturating_sub(count);
        log.recent.iter().skip(skip).cloned().collect()
    }

    pub fn summary(&self) -> RequestStatsSummary {
        let log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        if log.total_requests == 0 {
            return RequestStatsSummary::default();
        }

        let total = log.total_requests as f64;
        let mut latencies: Vec<u64> = log.recent.iter().map(|r| r.latency_ms).collect();
        latencies.sort_unstable();

        let endpoints = log
            .endpoints
            .iter()
            .map(|(name, t)| {
                let stats = EndpointStats {
                    requests: t.requests,
                    errors: t.errors,
                    avg_latency_ms: t.latency_ms as f64 / t.requests.max(1) as f64,
                    max_latency_ms: t.max_latency_ms,
                };
                (name.clone(), stats)
            })
            .collect();

        RequestStatsSummary {
            total_requests: log.total_requests,
            total_errors: log.total_errors,
            error_rate: log.total_errors as f64 / total,
            cache_hit_rate: log.total_cache_hits as f64 / total,
            avg_latency_ms: log.total_latency_ms as f64 / total,
            p95_latency_ms: percentile(&latencies, 0.95),
            slow_requests: log.slow_requests,
            endpoints,
        }
    }

    pub fn reset(&self) {
        *self.log.lock().unwrap_or_else(PoisonError::into_inner) = RequestLog::default();
    }
}

impl Default for RequestMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Nearest-rank percentile of an ascending slice
fn percentile(sorted: &[u64], p: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let rank = (p * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// In-flight request measurement
pub struct RequestTimer<'a> {
    monitor: &'a RequestMonitor,
    endpoint: String,
    method: String,
    started: Instant,
}

impl RequestTimer<'_> {
    pub fn finish(self, status: u16, cache_hit: bool) -> Duration {
        let elapsed = self.started.elapsed();
        self.monitor
            .record(&self.endpoint, &self.method, status, elapsed, cache_hit);
        elapsed
    }
}
