//! Timer and observer registries
//!
//! Handles are opaque to the monitor; callers mint them from whatever id
//! their timer or observer already carries.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObserverHandle(pub u64);

/// Set of live handles; only its size and membership matter.
#[derive(Debug, Clone)]
pub struct HandleSet<H> {
    handles: HashSet<H>,
}

impl<H: Eq + Hash + Copy> HandleSet<H> {
    pub fn new() -> Self {
        Self {
            handles: HashSet::new(),
        }
    }

    /// Returns `false` if the handle was already tracked.
    pub fn insert(&mut self, handle: H) -> bool {
        self.handles.insert(handle)
    }

    /// Returns `false` if the handle was not tracked.
    pub fn remove(&mut self, handle: H) -> bool {
        self.handles.remove(&handle)
    }

    pub fn contains(&self, handle: H) -> bool {
        self.handles.contains(&handle)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn clear(&mut self) {
        self.handles.clear();
    }
}

impl<H: Eq + Hash + Copy> Default for HandleSet<H> {
    fn default() -> Self {
        Self::new()
    }
}
