//! In-process resource registries
//!
//! Pure bookkeeping: timers, observers, listeners, cache entries and
//! component usage. Policy lives in the leak detector and optimizer.

pub mod cache;
pub mod components;
pub mod handles;
pub mod listeners;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use cache::{CacheRegistry, CacheTrackingEntry};
pub use components::{ComponentRegistry, ComponentUsageRecord, DEFAULT_COMPONENT_SIZE};
pub use handles::{HandleSet, ObserverHandle, TimerHandle};
pub use listeners::{ListenerCallback, ListenerHandle, ListenerOptions, ListenerRegistry};

/// All registries owned by one monitor.
#[derive(Debug, Default)]
pub struct Registries {
    pub timers: HandleSet<TimerHandle>,
    pub observers: HandleSet<ObserverHandle>,
    pub listeners: ListenerRegistry,
    pub cache: CacheRegistry,
    pub components: ComponentRegistry,
}

/// Registry sizes at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCounts {
    pub timers: usize,
    pub observers: usize,
    pub listeners: usize,
    pub orphaned_listeners: usize,
    pub cache_entries: usize,
    pub cache_bytes: u64,
    pub components: usize,
    /// Registration time of the longest-lived listener
    pub oldest_listener: Option<DateTime<Utc>>,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> ResourceCounts {
        ResourceCounts {
            timers: self.timers.len(),
            observers: self.observers.len(),
            listeners: self.listeners.len(),
            orphaned_listeners: self.listeners.orphan_count(),
            cache_entries: self.cache.len(),
            cache_bytes: self.cache.total_bytes(),
            components: self.components.len(),
            oldest_listener: self.listeners.oldest_registration(),
        }
    }

    pub fn clear(&mut self) {
        self.timers.clear();
        self.observers.clear();
        self.listeners.clear();
        self.cache.clear();
        self.components.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
            && self.observers.is_empty()
            && self.listeners.is_empty()
            && self.cache.is_empty()
            && self.components.is_empty()
    }
}
