//! Memory leak detection
//!
//! Turns registry sizes into findings using fixed per-class thresholds:
//! - Event listeners, timers and observers by count
//! - Tracked cache by aggregate bytes and entry count
//! - Component references by idle time and retained size
//!
//! Findings form an append-only log: every tick that a threshold is exceeded
//! adds a new finding, and the log is pruned by age.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

use crate::core::clock::elapsed_since;
use crate::core::config::LeakThresholds;
use crate::registry::Registries;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeakType {
    Listener,
    Timer,
    Reference,
    Observer,
    Cache,
}

impl std::fmt::Display for LeakType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeakType::Listener => write!(f, "listener"),
            LeakType::Timer => write!(f, "timer"),
            LeakType::Reference => write!(f, "reference"),
            LeakType::Observer => write!(f, "observer"),
            LeakType::Cache => write!(f, "cache"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Contribution of one finding to the risk score
    pub fn risk_weight(&self) -> f64 {
        match self {
            Severity::Critical => 20.0,
            Severity::High => 15.0,
            Severity::Medium => 10.0,
            Severity::Low => 5.0,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryLeakFinding {
    pub id: String,
    pub component: String,
    #[serde(rename = "type")]
    pub leak_type: LeakType,
    pub severity: Severity,
    pub description: String,
    pub detected_at: DateTime<Utc>,
    pub estimated_size: u64,
}

/// `escalated` above `high`, medium above `medium`, nothing otherwise.
fn grade(value: usize, medium: usize, high: usize, escalated: Severity) -> Option<Severity> {
    if value > high {
        Some(escalated)
    } else if value > medium {
        Some(Severity::Medium)
    } else {
        None
    }
}

/// Memory leak detector
#[derive(Debug)]
pub struct LeakDetector {
    thresholds: LeakThresholds,
    sequence: u64,
}

impl LeakDetector {
    pub fn new(thresholds: LeakThresholds) -> Self {
        Self {
            thresholds,
            sequence: 0,
        }
    }

    pub fn thresholds(&self) -> &LeakThresholds {
        &self.thresholds
    }

    /// Run every rule against the current registry state.
    pub fn detect(&mut self, registries: &Registries, now: DateTime<Utc>) -> Vec<MemoryLeakFinding> {
        let mut findings = Vec::new();
        self.detect_listeners(registries, now, &mut findings);
        self.detect_timers(registries, now, &mut findings);
        self.detect_observers(registries, now, &mut findings);
        self.detect_cache(registries, now, &mut findings);
        self.detect_references(registries, now, &mut findings);
        findings
    }

    fn detect_listeners(&mut self, registries: &Registries, now: DateTime<Utc>, out: &mut Vec<MemoryLeakFinding>) {
        let t = &self.thresholds;
        let count = registries.listeners.len();
        if let Some(severity) = grade(count, t.listener_medium, t.listener_critical, Severity::Critical) {
            let finding = self.finding(
                "EventListener",
                LeakType::Listener,
                severity,
                format!(
                    "{} active event listeners (threshold {}); check for missing removals on unmount",
                    count, self.thresholds.listener_medium
                ),
                count as u64 * self.thresholds.listener_entry_bytes,
                now,
            );
            out.push(finding);
        }
    }

    fn detect_timers(&mut self, registries: &Registries, now: DateTime<Utc>, out: &mut Vec<MemoryLeakFinding>) {
        let t = &self.thresholds;
        let count = registries.timers.len();
        if let Some(severity) = grade(count, t.timer_medium, t.timer_high, Severity::High) {
            let finding = self.finding(
                "Timer",
                LeakType::Timer,
                severity,
                format!(
                    "{} active timers (threshold {}); intervals may not be cleared",
                    count, self.thresholds.timer_medium
                ),
                count as u64 * self.thresholds.timer_entry_bytes,
                now,
            );
            out.push(finding);
        }
    }

    fn detect_observers(&mut self, registries: &Registries, now: DateTime<Utc>, out: &mut Vec<MemoryLeakFinding>) {
        let t = &self.thresholds;
        let count = registries.observers.len();
        if let Some(severity) = grade(count, t.observer_medium, t.observer_high, Severity::High) {
            let finding = self.finding(
                "Observer",
                LeakType::Observer,
                severity,
                format!(
                    "{} active observers (threshold {}); observers may not be disconnected",
                    count, self.thresholds.observer_medium
                ),
                count as u64 * self.thresholds.observer_entry_bytes,
                now,
            );
            out.push(finding);
        }
    }

    fn detect_cache(&mut self, registries: &Registries, now: DateTime<Utc>, out: &mut Vec<MemoryLeakFinding>) {
        let t = &self.thresholds;
        let entries = registries.cache.len();
        let bytes = registries.cache.total_bytes();

        let severity = if bytes > t.cache_critical_bytes {
            Severity::Critical
        } else if bytes > t.cache_medium_bytes || entries > t.cache_medium_entries {
            Severity::Medium
        } else {
            return;
        };

        let finding = self.finding(
            "Cache",
            LeakType::Cache,
            severity,
            format!(
                "Tracked cache holds {} entries totalling {:.1} MB",
                entries,
                bytes as f64 / (1024.0 * 1024.0)
            ),
            bytes,
            now,
        );
        out.push(finding);
    }

    fn detect_references(&mut self, registries: &Registries, now: DateTime<Utc>, out: &mut Vec<MemoryLeakFinding>) {
        let idle_limit = self.thresholds.reference_idle();
        let medium = self.thresholds.reference_medium_bytes;
        let high = self.thresholds.reference_high_bytes;

        let mut stale: Vec<(String, u64, Duration)> = registries
            .components
            .iter()
            .filter(|r| r.total_size > medium && r.idle_for(now) > idle_limit)
            .map(|r| (r.name.clone(), r.total_size, r.idle_for(now)))
            .collect();
        stale.sort_by(|a, b| a.0.cmp(&b.0));

        for (name, size, idle) in stale {
            let severity = if size > high { Severity::High } else { Severity::Medium };
            let finding = self.finding(
                &name,
                LeakType::Reference,
                severity,
                format!(
                    "Component '{}' retains {:.1} MB and has been idle for {} minutes",
                    name,
                    size as f64 / (1024.0 * 1024.0),
                    idle.as_secs() / 60
                ),
                size,
                now,
            );
            out.push(finding);
        }
    }

    fn finding(
        &mut self,
        component: &str,
        leak_type: LeakType,
        severity: Severity,
        description: String,
        estimated_size: u64,
        now: DateTime<Utc>,
    ) -> MemoryLeakFinding {
        self.sequence += 1;
        MemoryLeakFinding {
            id: format!("{}-{}-{}", leak_type, now.timestamp_millis(), self.sequence),
            component: component.to_string(),
            leak_type,
            severity,
            description,
            detected_at: now,
            estimated_size,
        }
    }
}

/// Time-ordered findings, pruned by age
#[derive(Debug, Default)]
pub struct FindingLog {
    findings: VecDeque<MemoryLeakFinding>,
}

impl FindingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, findings: Vec<MemoryLeakFinding>) {
        self.findings.extend(findings);
    }

    /// Drop findings older than `retention`.
    pub fn prune(&mut self, now: DateTime<Utc>, retention: Duration) -> usize {
        let before = self.findings.len();
        while let Some(front) = self.findings.front() {
            if elapsed_since(now, front.detected_at) > retention {
                self.findings.pop_front();
            } else {
                break;
            }
        }
        before - self.findings.len()
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemoryLeakFinding> {
        self.findings.iter()
    }

    pub fn to_vec(&self) -> Vec<MemoryLeakFinding> {
        self.findings.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.findings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CacheTrackingEntry, ListenerOptions, ObserverHandle, TimerHandle};
    use std::sync::Arc;

    const MB: u64 = 1024 * 1024;

    fn detector() -> LeakDetector {
        LeakDetector::new(LeakThresholds::default())
    }

    fn of_type(findings: &[MemoryLeakFinding], leak_type: LeakType) -> Vec<&MemoryLeakFinding> {
        findings.iter().filter(|f| f.leak_type == leak_type).collect()
    }

    #[test]
    fn test_quiet_registries_produce_nothing() {
        let registries = Registries::new();
        assert!(detector().detect(&registries, Utc::now()).is_empty());
    }

    #[test]
    fn test_listener_escalation() {
        let mut registries = Registries::new();
        let element = Arc::new(());
        let now = Utc::now();
        for _ in 0..60 {
            registries.listeners.add(&element, "click", ListenerOptions::default(), Arc::new(|_: &str| {}), now);
        }

        let mut d = detector();
        let findings = d.detect(&registries, now);
        let listeners = of_type(&findings, LeakType::Listener);
        assert_eq!(listeners.len(), 1);
        assert_eq!(listeners[0].severity, Severity::Medium);
        assert_eq!(listeners[0].estimated_size, 6000);

        for _ in 0..50 {
            registries.listeners.add(&element, "click", ListenerOptions::default(), Arc::new(|_: &str| {}), now);
        }
        let findings = d.detect(&registries, now);
        assert_eq!(of_type(&findings, LeakType::Listener)[0].severity, Severity::Critical);
    }

    #[test]
    fn test_timer_and_observer_thresholds() {
        let mut registries = Registries::new();
        for i in 0..21 {
            registries.timers.insert(TimerHandle(i));
        }
        for i in 0..26 {
            registries.observers.insert(ObserverHandle(i));
        }

        let findings = detector().detect(&registries, Utc::now());
        let timers = of_type(&findings, LeakType::Timer);
        assert_eq!(timers[0].severity, Severity::Medium);
        assert_eq!(timers[0].estimated_size, 21 * 50);

        let observers = of_type(&findings, LeakType::Observer);
        assert_eq!(observers[0].severity, Severity::High);
        assert_eq!(observers[0].estimated_size, 26 * 200);
    }

    #[test]
    fn test_cache_escalates_to_critical() {
        let mut registries = Registries::new();
        let now = Utc::now();
        let sized = |key: &str, size: u64| CacheTrackingEntry {
            key: key.to_string(),
            data: serde_json::Value::Null,
            size,
            created: now,
        };

        registries.cache.insert(sized("a", 11 * MB));
        let findings = detector().detect(&registries, now);
        assert_eq!(of_type(&findings, LeakType::Cache)[0].severity, Severity::Medium);

        registries.cache.insert(sized("b", 40 * MB));
        let findings = detector().detect(&registries, now);
        let cache = of_type(&findings, LeakType::Cache);
        assert_eq!(cache[0].severity, Severity::Critical);
        assert_eq!(cache[0].estimated_size, 51 * MB);
    }

    #[test]
    fn test_stale_component_reference() {
        let mut registries = Registries::new();
        let now = Utc::now();
        let long_ago = now - chrono::Duration::minutes(6);
        registries.components.register("ImageGallery", 2 * MB, long_ago);
        registries.components.register("HugeTable", 11 * MB, long_ago);
        registries.components.register("ActiveCart", 5 * MB, now);

        let findings = detector().detect(&registries, now);
        let refs = of_type(&findings, LeakType::Reference);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].component, "HugeTable");
        assert_eq!(refs[0].severity, Severity::High);
        assert_eq!(refs[1].component, "ImageGallery");
        assert_eq!(refs[1].severity, Severity::Medium);
    }

    #[test]
    fn test_ids_are_unique() {
        let mut registries = Registries::new();
        for i in 0..30 {
            registries.timers.insert(TimerHandle(i));
        }
        let mut d = detector();
        let now = Utc::now();
        let first = d.detect(&registries, now);
        let second = d.detect(&registries, now);
        assert_ne!(first[0].id, second[0].id);
    }

    #[test]
    fn test_finding_log_prunes_by_age() {
        let mut registries = Registries::new();
        for i in 0..30 {
            registries.timers.insert(TimerHandle(i));
        }
        let mut d = detector();
        let now = Utc::now();
        let mut log = FindingLog::new();
        log.extend(d.detect(&registries, now - chrono::Duration::minutes(61)));
        log.extend(d.detect(&registries, now));

        assert_eq!(log.prune(now, Duration::from_secs(3600)), 1);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_finding_serializes_type_field() {
        let mut registries = Registries::new();
        for i in 0..30 {
            registries.timers.insert(TimerHandle(i));
        }
        let findings = detector().detect(&registries, Utc::now());
        let json = serde_json::to_value(&findings[0]).unwrap();
        assert_eq!(json["type"], "timer");
        assert_eq!(json["severity"], "medium");
    }
}
