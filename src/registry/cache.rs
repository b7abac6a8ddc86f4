//! Tracked application cache entries
//!
//! The monitor does not own the cache; it mirrors what callers report so it
//! can size the cache, expire stale entries and evict under pressure.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::core::clock::elapsed_since;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheTrackingEntry {
    pub key: String,
    pub data: serde_json::Value,
    /// Serialized length of `data` in bytes
    pub size: u64,
    pub created: DateTime<Utc>,
}

impl CacheTrackingEntry {
    /// Entry sized by the JSON encoding of `data`.
    pub fn from_value(
        key: &str,
        data: serde_json::Value,
        created: DateTime<Utc>,
    ) -> serde_json::Result<Self> {
        let size = serde_json::to_vec(&data)?.len() as u64;
        Ok(Self {
            key: key.to_string(),
            data,
            size,
            created,
        })
    }
}

/// Case-insensitive check for any of `markers` inside `key`.
pub fn key_matches(key: &str, markers: &[String]) -> bool {
    let key = key.to_lowercase();
    markers.iter().any(|m| key.contains(&m.to_lowercase()))
}

#[derive(Debug, Default)]
pub struct CacheRegistry {
    entries: HashMap<String, CacheTrackingEntry>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for its key.
    pub fn insert(&mut self, entry: CacheTrackingEntry) -> Option<CacheTrackingEntry> {
        self.entries.insert(entry.key.clone(), entry)
    }

    pub fn remove(&mut self, key: &str) -> Option<CacheTrackingEntry> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&CacheTrackingEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.entries.values().map(|e| e.size).sum()
    }

    /// Drop entries created more than `ttl` before `now`.
    pub fn remove_expired(&mut self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| elapsed_since(now, entry.created) <= ttl);
        before - self.entries.len()
    }

    /// Drop every entry whose key carries none of the essential markers.
    pub fn retain_essential(&mut self, markers: &[String]) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key_matches(key, markers));
        before - self.entries.len()
    }

    /// Keep only the `keep` newest entries among keys matching `markers`.
    pub fn trim_matching(&mut self, markers: &[String], keep: usize) -> usize {
        let mut matching: Vec<(DateTime<Utc>, String)> = self
            .entries
            .values()
            .filter(|e| key_matches(&e.key, markers))
            .map(|e| (e.created, e.key.clone()))
            .collect();

        if matching.len() <= keep {
            return 0;
        }

        // Newest first; key breaks ties so the result is deterministic
        matching.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        let mut removed = 0;
        for (_, key) in matching.into_iter().skip(keep) {
            if self.entries.remove(&key).is_some() {
                removed += 1;
            }
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
