//! Admin performance API
//!
//! Serves one JSON payload bundling the memory report with request and
//! cache-layer statistics. A failing source degrades to a zeroed section and
//! an entry in `errors`; the payload itself is always produced.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use super::data::MemoryReport;
use crate::core::error::MonitorResult;
use crate::core::optimizer::MemoryOptimizer;
use crate::stats::{CacheLayerStats, CacheStatsSnapshot, RequestMonitor, RequestStatsSummary};

/// Anything that can summarize request traffic
pub trait RequestStatsSource: Send + Sync {
    fn request_stats(&self) -> MonitorResult<RequestStatsSummary>;
}

/// Anything that can report cache-layer counters
pub trait CacheStatsSource: Send + Sync {
    fn cache_stats(&self) -> MonitorResult<CacheStatsSnapshot>;
}

impl RequestStatsSource for RequestMonitor {
    fn request_stats(&self) -> MonitorResult<RequestStatsSummary> {
        Ok(self.summary())
    }
}

impl CacheStatsSource for CacheLayerStats {
    fn cache_stats(&self) -> MonitorResult<CacheStatsSnapshot> {
        Ok(self.snapshot())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformancePayload {
    pub generated_at: DateTime<Utc>,
    pub memory: MemoryReport,
    pub requests: RequestStatsSummary,
    pub cache: CacheStatsSnapshot,
    /// One message per section that fell back to zeros
    pub errors: Vec<String>,
}

/// Admin API state
pub struct PerformanceApi {
    optimizer: MemoryOptimizer,
    requests: Arc<dyn RequestStatsSource>,
    cache: Arc<dyn CacheStatsSource>,
}

impl PerformanceApi {
    pub fn new(
        optimizer: MemoryOptimizer,
        requests: Arc<dyn RequestStatsSource>,
        cache: Arc<dyn CacheStatsSource>,
    ) -> Self {
        Self {
            optimizer,
            requests,
            cache,
        }
    }

    pub fn snapshot(&self) -> PerformancePayload {
        let mut errors = Vec::new();

        let requests = self.requests.request_stats().unwrap_or_else(|e| {
            warn!("Request statistics unavailable: {}", e);
            errors.push(format!("requests: {}", e));
            RequestStatsSummary::default()
        });

        let cache = self.cache.cache_stats().unwrap_or_else(|e| {
            warn!("Cache statistics unavailable: {}", e);
            errors.push(format!("cache: {}", e));
            CacheStatsSnapshot::default()
        });

        let memory = self.optimizer.report();
        PerformancePayload {
            generated_at: memory.generated_at,
            memory,
            requests,
            cache,
            errors,
        }
    }

    /// Payload as a JSON string for the admin endpoint
    pub fn get_json(&self) -> MonitorResult<String> {
        Ok(serde_json::to_string(&self.snapshot())?)
    }
}
