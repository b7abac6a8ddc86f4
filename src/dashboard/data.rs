//! Dashboard data structures
//!
//! Everything here is serializable for the JSON admin endpoint and the
//! polling dashboard. Reports are computed from already materialized state
//! and never mutate it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::config::MonitorConfig;
use crate::core::patterns::Trend;
use crate::monitor::leaks::{MemoryLeakFinding, Severity};
use crate::monitor::sampler::MemoryMetricSample;
use crate::registry::{ComponentUsageRecord, ResourceCounts};

/// Cache entry count above which a size limit is recommended
const RECOMMEND_CACHE_ENTRIES: usize = 100;

/// Bonus added to the risk score while usage trends upward
const INCREASING_TREND_RISK: f64 = 15.0;

/// Weight of heap percentage in the risk score
const PERCENTAGE_RISK_WEIGHT: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Warning => write!(f, "warning"),
            HealthStatus::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Efficiency {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl Efficiency {
    pub fn from_risk(risk_score: f64) -> Self {
        if risk_score < 30.0 {
            Efficiency::Excellent
        } else if risk_score < 60.0 {
            Efficiency::Good
        } else if risk_score < 80.0 {
            Efficiency::Fair
        } else {
            Efficiency::Poor
        }
    }
}

impl std::fmt::Display for Efficiency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Efficiency::Excellent => write!(f, "excellent"),
            Efficiency::Good => write!(f, "good"),
            Efficiency::Fair => write!(f, "fair"),
            Efficiency::Poor => write!(f, "poor"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub status: HealthStatus,
    pub total_leaks: usize,
    pub risk_score: f64,
    pub efficiency: Efficiency,
}

/// Complete memory report packet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryReport {
    pub generated_at: DateTime<Utc>,
    pub current: Option<MemoryMetricSample>,
    pub history: Vec<MemoryMetricSample>,
    pub leaks: Vec<MemoryLeakFinding>,
    pub components: Vec<ComponentUsageRecord>,
    pub resources: ResourceCounts,
    pub recommendations: Vec<String>,
    pub summary: ReportSummary,
}

/// Heap pressure, trend and outstanding findings folded into 0-100.
pub fn risk_score(current: Option<&MemoryMetricSample>, leaks: &[MemoryLeakFinding]) -> f64 {
    let mut score = 0.0;

    if let Some(sample) = current {
        score += sample.percentage() * PERCENTAGE_RISK_WEIGHT;
        if sample.trend() == Trend::Increasing {
            score += INCREASING_TREND_RISK;
        }
    }

    score += leaks.iter().map(|l| l.severity.risk_weight()).sum::<f64>();
    score.clamp(0.0, 100.0)
}

pub fn health_status(
    current: Option<&MemoryMetricSample>,
    leaks: &[MemoryLeakFinding],
    config: &MonitorConfig,
) -> HealthStatus {
    let percentage = current.map(|s| s.percentage()).unwrap_or(0.0);

    if percentage > config.critical_threshold
        || leaks.iter().any(|l| l.severity == Severity::Critical)
    {
        HealthStatus::Critical
    } else if percentage > config.warning_threshold || leaks.len() > config.warning_finding_count {
        HealthStatus::Warning
    } else {
        HealthStatus::Healthy
    }
}

pub fn recommendations(
    current: Option<&MemoryMetricSample>,
    leaks: &[MemoryLeakFinding],
    resources: &ResourceCounts,
    config: &MonitorConfig,
) -> Vec<String> {
    let mut out = Vec::new();

    if let Some(sample) = current {
        if sample.percentage() > config.warning_threshold {
            out.push(
                "Memory usage is high. Consider closing unused views or reducing cached data."
                    .to_string(),
            );
        }
    }

    if !leaks.is_empty() {
        out.push(format!(
            "{} potential memory leaks detected. Review event listeners, timers and observers.",
            leaks.len()
        ));
    }

    if resources.cache_entries > RECOMMEND_CACHE_ENTRIES {
        out.push("Large cache detected. Consider implementing cache size limits.".to_string());
    }

    if resources.observers > config.leaks.observer_medium {
        out.push("Many observers active. Ensure observers are disconnected on unmount.".to_string());
    }

    if current.map(|s| s.trend()) == Some(Trend::Increasing) {
        out.push("Memory usage is trending upward. Monitor for potential leaks.".to_string());
    }

    out
}

/// Assemble a report from state snapshots.
pub fn build_report(
    generated_at: DateTime<Utc>,
    history: Vec<MemoryMetricSample>,
    leaks: Vec<MemoryLeakFinding>,
    components: Vec<ComponentUsageRecord>,
    resources: ResourceCounts,
    config: &MonitorConfig,
) -> MemoryReport {
    let current = history.last().cloned();
    let risk = risk_score(current.as_ref(), &leaks);

    let summary = ReportSummary {
        status: health_status(current.as_ref(), &leaks, config),
        total_leaks: leaks.len(),
        risk_score: risk,
        efficiency: Efficiency::from_risk(risk),
    };
    let recommendations = recommendations(current.as_ref(), &leaks, &resources, config);

    MemoryReport {
        generated_at,
        current,
        history,
        leaks,
        components,
        resources,
        recommendations,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::leaks::LeakType;
    use crate::platform::HeapSnapshot;

    fn sample(percentage: u64, trend: Trend) -> MemoryMetricSample {
        MemoryMetricSample::new(HeapSnapshot::new(percentage, percentage, 100), trend, Utc::now())
    }

    fn finding(severity: Severity) -> MemoryLeakFinding {
        MemoryLeakFinding {
            id: "timer-0-1".into(),
            component: "Timer".into(),
            leak_type: LeakType::Timer,
            severity,
            description: String::new(),
            detected_at: Utc::now(),
            estimated_size: 0,
        }
    }

    #[test]
    fn test_risk_without_sample() {
        assert_eq!(risk_score(None, &[]), 0.0);
        assert_eq!(risk_score(None, &[finding(Severity::High)]), 15.0);
    }

    #[test]
    fn test_risk_combines_inputs() {
        let current = sample(50, Trend::Increasing);
        let leaks = vec![finding(Severity::Low), finding(Severity::Medium)];
        assert!((risk_score(Some(&current), &leaks) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_risk_is_capped() {
        let leaks: Vec<_> = (0..20).map(|_| finding(Severity::Critical)).collect();
        let current = sample(99, Trend::Increasing);
        assert_eq!(risk_score(Some(&current), &leaks), 100.0);
    }

    #[test]
    fn test_status_disjuncts() {
        let config = MonitorConfig::default();

        let hot = sample(97, Trend::Stable);
        assert_eq!(health_status(Some(&hot), &[], &config), HealthStatus::Critical);

        let cool = sample(10, Trend::Stable);
        assert_eq!(
            health_status(Some(&cool), &[finding(Severity::Critical)], &config),
            HealthStatus::Critical
        );

        let warm = sample(85, Trend::Stable);
        assert_eq!(health_status(Some(&warm), &[], &config), HealthStatus::Warning);

        let many: Vec<_> = (0..6).map(|_| finding(Severity::Low)).collect();
        assert_eq!(health_status(None, &many, &config), HealthStatus::Warning);

        assert_eq!(health_status(None, &[], &config), HealthStatus::Healthy);
    }

    #[test]
    fn test_efficiency_bands() {
        assert_eq!(Efficiency::from_risk(0.0), Efficiency::Excellent);
        assert_eq!(Efficiency::from_risk(30.0), Efficiency::Good);
        assert_eq!(Efficiency::from_risk(60.0), Efficiency::Fair);
        assert_eq!(Efficiency::from_risk(80.0), Efficiency::Poor);
    }

    #[test]
    fn test_recommendations() {
        let config = MonitorConfig::default();
        let current = sample(90, Trend::Increasing);
        let resources = ResourceCounts {
            cache_entries: 150,
            observers: 12,
            ..Default::default()
        };
        let recs = recommendations(Some(&current), &[finding(Severity::Low)], &resources, &config);
        assert_eq!(recs.len(), 5);

        let quiet = recommendations(None, &[], &ResourceCounts::default(), &config);
        assert!(quiet.is_empty());
    }

    #[test]
    fn test_report_serialization() {
        let config = MonitorConfig::default();
        let report = build_report(
            Utc::now(),
            vec![sample(40, Trend::Stable)],
            vec![],
            vec![],
            ResourceCounts::default(),
            &config,
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["summary"]["status"], "healthy");
        assert_eq!(json["summary"]["efficiency"], "excellent");
        assert_eq!(json["current"]["percentage"], 40.0);
    }
}
