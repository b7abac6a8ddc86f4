//! Memory pressure classification

use serde::{Deserialize, Serialize};

use super::config::MonitorConfig;

/// Short-term direction of heap usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    #[default]
    Stable,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Increasing => write!(f, "increasing"),
            Trend::Decreasing => write!(f, "decreasing"),
            Trend::Stable => write!(f, "stable"),
        }
    }
}

/// Band of the latest heap percentage, deciding which actions a tick runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureBand {
    Normal,
    GcSuggest,
    Warning,
    Critical,
}

impl PressureBand {
    /// Classify `percentage` against the configured thresholds.
    ///
    /// Evaluation order is critical, then warning, then gc-suggest. With the
    /// default thresholds (95 / 80 / 85) the gc-suggest band can never be
    /// reached because anything above 85 is already above 80.
    pub fn classify(percentage: f64, config: &MonitorConfig) -> Self {
        if percentage > config.critical_threshold {
            PressureBand::Critical
        } else if percentage > config.warning_threshold {
            PressureBand::Warning
        } else if percentage > config.gc_suggest_threshold {
            PressureBand::GcSuggest
        } else {
            PressureBand::Normal
        }
    }
}

impl std::fmt::Display for PressureBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PressureBand::Normal => write!(f, "normal"),
            PressureBand::GcSuggest => write!(f, "gc-suggest"),
            PressureBand::Warning => write!(f, "warning"),
            PressureBand::Critical => write!(f, "critical"),
        }
    }
}
