//! Cleanup candidate ranking for idle components

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::registry::ComponentRegistry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupCandidate {
    pub name: String,
    pub total_size: u64,
    pub instances: u32,
    pub idle_secs: u64,
}

/// Largest components idle for at least `min_idle`, biggest first.
///
/// Advisory only: nothing is evicted on the strength of this list.
pub fn get_cleanup_candidates(
    components: &ComponentRegistry,
    now: DateTime<Utc>,
    min_idle: Duration,
    limit: usize,
) -> Vec<CleanupCandidate> {
    let mut candidates: Vec<CleanupCandidate> = components
        .iter()
        .filter_map(|record| {
            let idle = record.idle_for(now);
            if idle < min_idle {
                return None;
            }
            Some(CleanupCandidate {
                name: record.name.clone(),
                total_size: record.total_size,
                instances: record.instances,
                idle_secs: idle.as_secs(),
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.total_size
            .cmp(&a.total_size)
            .then_with(|| b.idle_secs.cmp(&a.idle_secs))
            .then_with(|| a.name.cmp(&b.name))
    });
    candidates.truncate(limit);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranks_idle_by_size() {
        let mut components = ComponentRegistry::new();
        let now = Utc::now();
        let idle = now - chrono::Duration::minutes(6);
        components.register("Small", 100, idle);
        components.register("Large", 10_000, idle);
        components.register("Busy", 50_000, now);

        let candidates = get_cleanup_candidates(&components, now, Duration::from_secs(300), 5);
        let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Large", "Small"]);
    }

    #[test]
    fn test_limit() {
        let mut components = ComponentRegistry::new();
        let now = Utc::now();
        for i in 0..10 {
            components.register(&format!("C{}", i), i * 10, now);
        }
        assert_eq!(get_cleanup_candidates(&components, now, Duration::ZERO, 3).len(), 3);
    }
}
