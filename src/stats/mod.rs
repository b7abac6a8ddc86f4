//! Request and cache-layer statistics collected alongside the memory monitor

pub mod cache;
pub mod requests;

pub use cache::{CacheLayerStats, CacheStatsSnapshot};
pub use requests::{EndpointStats, RequestMonitor, RequestRecord, RequestStatsSummary, RequestTimer};
