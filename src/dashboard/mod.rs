//! Reporting for dashboards and the admin endpoint
//!
//! Provides the report data model, the JSON performance API and a polling
//! task that keeps dashboards supplied with fresh reports.

pub mod data;
pub mod poller;
pub mod server;

pub use data::{Efficiency, HealthStatus, MemoryReport, ReportSummary};
pub use poller::ReportPoller;
pub use server::{CacheStatsSource, PerformanceApi, PerformancePayload, RequestStatsSource};
