//! Per-component usage accounting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::core::clock::elapsed_since;

/// Size assumed when a component registers without an estimate.
pub const DEFAULT_COMPONENT_SIZE: u64 = 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentUsageRecord {
    pub name: String,
    /// Live registrations
    pub instances: u32,
    pub average_size: u64,
    pub total_size: u64,
    pub last_accessed: DateTime<Utc>,
    /// Reserved; no rule scores it yet
    pub leak_risk: u8,
}

impl ComponentUsageRecord {
    fn new(name: &str, now: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            instances: 0,
            average_size: 0,
            total_size: 0,
            last_accessed: now,
            leak_risk: 0,
        }
    }

    fn recompute_average(&mut self) {
        self.average_size = if self.instances == 0 {
            0
        } else {
            self.total_size / self.instances as u64
        };
    }

    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        elapsed_since(now, self.last_accessed)
    }
}

#[derive(Debug, Default)]
pub struct ComponentRegistry {
    records: HashMap<String, ComponentUsageRecord>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more live instance of `name`.
    pub fn register(&mut self, name: &str, size: u64, now: DateTime<Utc>) -> ComponentUsageRecord {
        let record = self
            .records
            .entry(name.to_string())
            .or_insert_with(|| ComponentUsageRecord::new(name, now));

        record.instances = record.instances.saturating_add(1);
        record.total_size = record.total_size.saturating_add(size);
        record.last_accessed = now;
        record.recompute_average();
        record.clone()
    }

    /// Count one fewer live instance of `name`.
    ///
    /// Returns the remaining record, or `None` when the name is unknown or
    /// its last instance just went away.
    pub fn unregister(&mut self, name: &str, size: u64) -> Option<ComponentUsageRecord> {
        let record = self.records.get_mut(name)?;

        record.instances = record.instances.saturating_sub(1);
        record.total_size = record.total_size.saturating_sub(size);
        record.recompute_average();

        if record.instances == 0 {
            self.records.remove(name);
            return None;
        }
        Some(record.clone())
    }

    pub fn get(&self, name: &str) -> Option<&ComponentUsageRecord> {
        self.records.get(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentUsageRecord> {
        self.records.values()
    }

    /// Records sorted by name.
    pub fn snapshot(&self) -> Vec<ComponentUsageRecord> {
        let mut records: Vec<_> = self.records.values().cloned().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    /// Forget records idle longer than `ttl`, live instances or not.
    pub fn remove_idle(&mut self, now: DateTime<Utc>, ttl: Duration) -> Vec<String> {
        let stale: Vec<String> = self
            .records
            .values()
            .filter(|r| r.idle_for(now) > ttl)
            .map(|r| r.name.clone())
            .collect();

        for name in &stale {
            self.records.remove(name);
        }
        stale
    }

    pub fn total_bytes(&self) -> u64 {
        self.records.values().map(|r| r.total_size).sum()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
