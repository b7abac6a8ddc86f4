//! Heap metrics sampling
//!
//! One [`MemoryMetricSample`] per tick, kept in a bounded ring. The trend of
//! each sample compares its usage against the oldest sample of the trend
//! window.

use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::collections::VecDeque;
use tracing::debug;

use crate::core::patterns::Trend;
use crate::platform::{HeapProbe, HeapSnapshot};

/// Point-in-time heap reading. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryMetricSample {
    used: u64,
    total: u64,
    limit: u64,
    trend: Trend,
    timestamp: DateTime<Utc>,
}

impl MemoryMetricSample {
    pub fn new(snapshot: HeapSnapshot, trend: Trend, timestamp: DateTime<Utc>) -> Self {
        Self {
            used: snapshot.used,
            total: snapshot.total,
            limit: snapshot.limit,
            trend,
            timestamp,
        }
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// `used / limit * 100`, always derived.
    pub fn percentage(&self) -> f64 {
        self.snapshot().percentage()
    }

    pub fn trend(&self) -> Trend {
        self.trend
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn snapshot(&self) -> HeapSnapshot {
        HeapSnapshot::new(self.used, self.total, self.limit)
    }
}

impl Serialize for MemoryMetricSample {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("MemoryMetricSample", 6)?;
        state.serialize_field("used", &self.used)?;
        state.serialize_field("total", &self.total)?;
        state.serialize_field("limit", &self.limit)?;
        state.serialize_field("percentage", &self.percentage())?;
        state.serialize_field("trend", &self.trend)?;
        state.serialize_field("timestamp", &self.timestamp)?;
        state.end()
    }
}

/// Trend of `used` against the history preceding it.
///
/// With fewer than `window` samples (counting the new one) the trend is
/// stable. Otherwise the new value is compared with the oldest sample of the
/// window; a change beyond `ratio` of the new value is a trend.
pub fn compute_trend(
    history: &VecDeque<MemoryMetricSample>,
    used: u64,
    window: usize,
    ratio: f64,
) -> Trend {
    let window = window.max(2);
    if history.len() + 1 < window {
        return Trend::Stable;
    }

    let first = history[history.len() + 1 - window].used as f64;
    let current = used as f64;
    let delta = current - first;
    let threshold = current * ratio;

    if delta > threshold {
        Trend::Increasing
    } else if delta < -threshold {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

#[derive(Debug)]
pub struct MetricsSampler {
    history: VecDeque<MemoryMetricSample>,
    max_history: usize,
    trend_window: usize,
    trend_ratio: f64,
}

impl MetricsSampler {
    pub fn new(max_history: usize, trend_window: usize, trend_ratio: f64) -> Self {
        Self {
            history: VecDeque::with_capacity(max_history),
            max_history: max_history.max(1),
            trend_window,
            trend_ratio,
        }
    }

    /// Read the probe and append a sample.
    ///
    /// Returns `None` without touching the history when the probe has no
    /// heap figures to offer.
    pub fn collect(&mut self, probe: &dyn HeapProbe, now: DateTime<Utc>) -> Option<MemoryMetricSample> {
        match probe.sample() {
            Some(snapshot) => Some(self.record(snapshot, now)),
            None => {
                debug!("Probe '{}' reported no heap figures", probe.name());
                None
            }
        }
    }

    /// Append a sample built from `snapshot`.
    pub fn record(&mut self, snapshot: HeapSnapshot, now: DateTime<Utc>) -> MemoryMetricSample {
        let trend = compute_trend(&self.history, snapshot.used, self.trend_window, self.trend_ratio);
        let sample = MemoryMetricSample::new(snapshot, trend, now);

        if self.history.len() >= self.max_history {
            self.history.pop_front();
        }
        self.history.push_back(sample.clone());
        sample
    }

    pub fn current(&self) -> Option<&MemoryMetricSample> {
        self.history.back()
    }

    pub fn history(&self) -> &VecDeque<MemoryMetricSample> {
        &self.history
    }

    /// Most recent `count` samples, newest first.
    pub fn recent(&self, count: usize) -> Vec<MemoryMetricSample> {
        self.history.iter().rev().take(count).cloned().collect()
    }

    pub fn stats(&self) -> SamplerStats {
        if self.history.is_empty() {
            return SamplerStats::default();
        }

        let loads: Vec<f64> = self.history.iter().map(|s| s.percentage()).collect();
        let avg = loads.iter().sum::<f64>() / loads.len() as f64;
        let max = loads.iter().cloned().fold(f64::MIN, f64::max);
        let min = loads.iter().cloned().fold(f64::MAX, f64::min);

        SamplerStats {
            sample_count: self.history.len(),
            avg_percentage: avg,
            max_percentage: max,
            min_percentage: min,
        }
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct SamplerStats {
    pub sample_count: usize,
    pub avg_percentage: f64,
    pub max_percentage: f64,
    pub min_percentage: f64,
}
