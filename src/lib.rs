//! Perfwatch Memory Monitor
//!
//! An in-process memory monitor for long-running storefront services. It
//! samples heap usage, tracks the resources the application registers with
//! it, flags likely leaks and reacts to memory pressure.
//!
//! ## Features
//!
//! - **Heap Sampling**: bounded history with trend classification
//! - **Resource Registries**: listeners, timers, observers, cache and components
//! - **Leak Heuristics**: per-class thresholds graded by severity
//! - **Pressure Policy**: critical, warning and gc-suggest bands with cleanup actions
//! - **Reporting**: health status, risk score and recommendations as JSON
//!
//! ## Safety
//!
//! - Monitoring never fails the host; unavailable probes yield no samples
//! - Essential cache entries survive emergency cleanup
//! - Cleanup is idempotent and tracking resumes afterwards

pub mod core;
pub mod dashboard;
pub mod monitor;
pub mod platform;
pub mod registry;
pub mod stats;

// Re-exports
pub use core::clock::{Clock, ManualClock, SystemClock};
pub use core::config::{LeakThresholds, MonitorConfig};
pub use core::error::{MonitorError, MonitorResult};
pub use core::events::MemoryEvent;
pub use core::optimizer::{
    CollectionOutcome, ComponentGuard, MemoryOptimizer, OptimizerBuilder, PolicyAction, TickSummary,
};
pub use core::patterns::{PressureBand, Trend};
pub use dashboard::{HealthStatus, MemoryReport, PerformanceApi, ReportPoller};
pub use monitor::{LeakType, MemoryLeakFinding, MemoryMetricSample, Severity};
pub use platform::{
    create_probe, HeapProbe, HeapSnapshot, ManualProbe, PlatformError, PlatformResult, ProbeKind,
    ProcessProbe, UnavailableProbe,
};
pub use registry::{ListenerHandle, ListenerOptions, ObserverHandle, ResourceCounts, TimerHandle};
pub use stats::{CacheLayerStats, RequestMonitor};
