//! Heap sampling, leak heuristics and the text dashboard

pub mod dashboard;
pub mod leaks;
pub mod sampler;

pub use leaks::{FindingLog, LeakDetector, LeakType, MemoryLeakFinding, Severity};
pub use sampler::{MemoryMetricSample, MetricsSampler, SamplerStats};
