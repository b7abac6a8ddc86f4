//! Configuration for the memory monitor

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::{MonitorError, MonitorResult};
use crate::platform::ProbeKind;

const MB: u64 = 1024 * 1024;

/// Main monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Heap probe adapter to sample with
    pub probe: ProbeKind,

    /// Seconds between monitoring ticks
    pub sample_interval_secs: u64,

    /// Samples kept in the history ring
    pub history_size: usize,

    /// Heap usage (percent of limit) above which warning actions run
    pub warning_threshold: f64,

    /// Heap usage above which emergency actions run
    pub critical_threshold: f64,

    /// Heap usage above which a collection is suggested.
    /// Checked after the warning threshold, so it only fires when it is
    /// configured below `warning_threshold`.
    pub gc_suggest_threshold: f64,

    /// Samples compared when computing the trend
    pub trend_window: usize,

    /// Relative change of current usage that counts as a trend
    pub trend_change_ratio: f64,

    /// Cache entries older than this are swept every tick
    pub cache_ttl_secs: u64,

    /// Component records idle longer than this are swept every tick
    pub component_idle_ttl_secs: u64,

    /// Findings older than this are dropped
    pub finding_retention_secs: u64,

    /// Image-like cache entries kept by warning actions
    pub image_cache_keep: usize,

    /// Idle components listed as cleanup candidates
    pub cleanup_candidate_count: usize,

    /// Findings count above which the report status becomes warning
    pub warning_finding_count: usize,

    /// Cache keys containing any of these survive emergency cleanup
    pub essential_key_markers: Vec<String>,

    /// Cache keys containing any of these are image-like
    pub image_key_markers: Vec<String>,

    /// Capacity of the memory-warning broadcast channel
    pub event_channel_capacity: usize,

    /// Per-resource-class leak thresholds
    pub leaks: LeakThresholds,
}

/// Per-resource-class leak thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeakThresholds {
    pub listener_medium: usize,
    pub listener_critical: usize,
    pub listener_entry_bytes: u64,

    pub timer_medium: usize,
    pub timer_high: usize,
    pub timer_entry_bytes: u64,

    pub observer_medium: usize,
    pub observer_high: usize,
    pub observer_entry_bytes: u64,

    pub cache_medium_bytes: u64,
    pub cache_medium_entries: usize,
    pub cache_critical_bytes: u64,

    /// Idle time before a component counts as a stale reference
    pub reference_idle_secs: u64,
    pub reference_medium_bytes: u64,
    pub reference_high_bytes: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            probe: ProbeKind::Unavailable,
            sample_interval_secs: 5,
            history_size: 100,
            warning_threshold: 80.0,
            critical_threshold: 95.0,
            gc_suggest_threshold: 85.0,
            trend_window: 5,
            trend_change_ratio: 0.05,
            cache_ttl_secs: 3600,
            component_idle_ttl_secs: 600,
            finding_retention_secs: 3600,
            image_cache_keep: 20,
            cleanup_candidate_count: 5,
            warning_finding_count: 5,
            essential_key_markers: vec!["essential".into(), "critical".into()],
            image_key_markers: vec!["image".into(), "img".into()],
            event_channel_capacity: 16,
            leaks: LeakThresholds::default(),
        }
    }
}

impl Default for LeakThresholds {
    fn default() -> Self {
        Self {
            listener_medium: 50,
            listener_critical: 100,
            listener_entry_bytes: 100,
            timer_medium: 20,
            timer_high: 50,
            timer_entry_bytes: 50,
            observer_medium: 10,
            observer_high: 25,
            observer_entry_bytes: 200,
            cache_medium_bytes: 10 * MB,
            cache_medium_entries: 1000,
            cache_critical_bytes: 50 * MB,
            reference_idle_secs: 300,
            reference_medium_bytes: MB,
            reference_high_bytes: 10 * MB,
        }
    }
}

impl LeakThresholds {
    pub fn reference_idle(&self) -> Duration {
        Duration::from_secs(self.reference_idle_secs)
    }
}

impl MonitorConfig {
    /// Load config from TOML file
    pub fn load(path: &Path) -> MonitorResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> MonitorResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to TOML file
    pub fn save(&self, path: &Path) -> MonitorResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Default location of the config file.
    ///
    /// - **Linux**: `~/.config/perfwatch/config.toml`
    /// - **macOS**: `~/Library/Application Support/perfwatch/config.toml`
    /// - **Windows**: `%APPDATA%\perfwatch\config.toml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("perfwatch")
            .join("config.toml")
    }

    /// Check value ranges
    pub fn validate(&self) -> MonitorResult<()> {
        for (key, value) in [
            ("warning_threshold", self.warning_threshold),
            ("critical_threshold", self.critical_threshold),
            ("gc_suggest_threshold", self.gc_suggest_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(MonitorError::InvalidConfig(format!(
                    "{} must be within 0-100, got {}",
                    key, value
                )));
            }
        }

        if self.warning_threshold >= self.critical_threshold {
            return Err(MonitorError::InvalidConfig(format!(
                "warning_threshold ({}) must be below critical_threshold ({})",
                self.warning_threshold, self.critical_threshold
            )));
        }

        if self.sample_interval_secs == 0 {
            return Err(MonitorError::InvalidConfig(
                "sample_interval_secs must be non-zero".into(),
            ));
        }

        if self.trend_window < 2 {
            return Err(MonitorError::InvalidConfig(
                "trend_window must be at least 2".into(),
            ));
        }

        if self.history_size < self.trend_window {
            return Err(MonitorError::InvalidConfig(format!(
                "history_size ({}) must hold at least trend_window ({}) samples",
                self.history_size, self.trend_window
            )));
        }

        if !(0.0..=1.0).contains(&self.trend_change_ratio) {
            return Err(MonitorError::InvalidConfig(format!(
                "trend_change_ratio must be within 0-1, got {}",
                self.trend_change_ratio
            )));
        }

        if self.event_channel_capacity == 0 {
            return Err(MonitorError::InvalidConfig(
                "event_channel_capacity must be non-zero".into(),
            ));
        }

        let leaks = &self.leaks;
        if leaks.listener_medium >= leaks.listener_critical
            || leaks.timer_medium >= leaks.timer_high
            || leaks.observer_medium >= leaks.observer_high
            || leaks.cache_medium_bytes >= leaks.cache_critical_bytes
            || leaks.reference_medium_bytes >= leaks.reference_high_bytes
        {
            return Err(MonitorError::InvalidConfig(
                "leak thresholds must escalate (medium below high/critical)".into(),
            ));
        }

        Ok(())
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn component_idle_ttl(&self) -> Duration {
        Duration::from_secs(self.component_idle_ttl_secs)
    }

    pub fn finding_retention(&self) -> Duration {
        Duration::from_secs(self.finding_retention_secs)
    }
}
