//! Simple text-based dashboard

use std::collections::BTreeMap;

use crate::core::clock::elapsed_since;
use crate::dashboard::data::{HealthStatus, MemoryReport};
use crate::monitor::leaks::{LeakType, Severity};

const BAR_WIDTH: usize = 40;

/// Leak groups shown before the list is elided
pub const MAX_LEAK_ROWS: usize = 8;

/// Components shown, largest first
pub const MAX_COMPONENT_ROWS: usize = 5;

fn usage_bar(percentage: f64) -> String {
    let filled = ((percentage.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

/// Findings folded per (component, type), keeping the worst severity.
fn group_leaks(report: &MemoryReport) -> Vec<(String, LeakType, Severity, usize)> {
    let mut groups: BTreeMap<(String, String), (LeakType, Severity, usize)> = BTreeMap::new();
    for leak in &report.leaks {
        let key = (leak.component.clone(), leak.leak_type.to_string());
        let entry = groups
            .entry(key)
            .or_insert((leak.leak_type, leak.severity, 0));
        entry.1 = entry.1.max(leak.severity);
        entry.2 += 1;
    }

    let mut rows: Vec<_> = groups
        .into_iter()
        .map(|((component, _), (leak_type, severity, count))| (component, leak_type, severity, count))
        .collect();
    rows.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(&b.0)));
    rows
}

pub fn render_dashboard(report: &MemoryReport) -> String {
    let mut out = String::new();
    out.push_str("\n================ Perfwatch Memory Dashboard ================\n\n");

    match &report.current {
        Some(sample) => {
            out.push_str(&format!(
                "Heap Usage: {} {:.1}%\n",
                usage_bar(sample.percentage()),
                sample.percentage()
            ));
            out.push_str(&format!("Used:      {:>8.1} MB\n", sample.snapshot().used_mb()));
            out.push_str(&format!("Limit:     {:>8.1} MB\n", sample.snapshot().limit_mb()));
            out.push_str(&format!("Trend:     {:>8}\n", sample.trend().to_string()));
        }
        None => out.push_str("Heap Usage: unavailable on this platform\n"),
    }

    let r = &report.resources;
    out.push_str("\n-------------------- Tracked Resources ---------------------\n");
    out.push_str(&format!(
        "Listeners: {:>6} ({} orphaned)\n",
        r.listeners, r.orphaned_listeners
    ));
    if let Some(oldest) = r.oldest_listener {
        let age = elapsed_since(report.generated_at, oldest);
        out.push_str(&format!("  oldest listener {}s old\n", age.as_secs()));
    }
    out.push_str(&format!("Timers:    {:>6}\n", r.timers));
    out.push_str(&format!("Observers: {:>6}\n", r.observers));
    out.push_str(&format!(
        "Cache:     {:>6} entries, {:.1} KB\n",
        r.cache_entries,
        r.cache_bytes as f64 / 1024.0
    ));
    out.push_str(&format!("Components:{:>6}\n", r.components));

    if !report.components.is_empty() {
        let mut components = report.components.clone();
        components.sort_by(|a, b| b.total_size.cmp(&a.total_size).then_with(|| a.name.cmp(&b.name)));
        out.push_str("\n----------------------- Components -------------------------\n");
        for c in components.iter().take(MAX_COMPONENT_ROWS) {
            out.push_str(&format!(
                "  {:<28} x{:<4} {:>10.1} KB\n",
                c.name,
                c.instances,
                c.total_size as f64 / 1024.0
            ));
        }
    }

    let groups = group_leaks(report);
    out.push_str(&format!(
        "\n------------------- Leak Suspects ({:>3}) --------------------\n",
        report.leaks.len()
    ));
    if groups.is_empty() {
        out.push_str("  none\n");
    }
    for (component, leak_type, severity, count) in groups.iter().take(MAX_LEAK_ROWS) {
        out.push_str(&format!(
            "  [{:<8}] {:<10} {:<24} x{}\n",
            severity.to_string().to_uppercase(),
            leak_type.to_string(),
            component,
            count
        ));
    }
    if groups.len() > MAX_LEAK_ROWS {
        out.push_str(&format!("  ... and {} more\n", groups.len() - MAX_LEAK_ROWS));
    }

    if !report.recommendations.is_empty() {
        out.push_str("\n--------------------- Recommendations ----------------------\n");
        for rec in &report.recommendations {
            out.push_str(&format!("  * {}\n", rec));
        }
    }

    let status = match report.summary.status {
        HealthStatus::Critical => "CRITICAL",
        HealthStatus::Warning => "WARNING",
        HealthStatus::Healthy => "OK",
    };
    out.push_str(&format!(
        "\nStatus: {}   Risk: {:.0}/100   Efficiency: {}\n",
        status, report.summary.risk_score, report.summary.efficiency
    ));
    out.push_str("============================================================\n");
    out
}
