//! Event-listener registry
//!
//! Listeners are registered explicitly through the monitor's wrapper rather
//! than by patching a global subscription primitive. Each entry keeps a weak
//! reference to its element; once the element is dropped the entry is an
//! orphan and warning-level optimization removes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

/// Weak reference to whatever element a listener is attached to.
pub type ElementRef = Weak<dyn Any + Send + Sync>;

/// Callback invoked with the event name on dispatch.
pub type ListenerCallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerOptions {
    pub capture: bool,
    /// Remove the listener after its first dispatch
    pub once: bool,
    pub passive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListenerHandle(u64);

impl ListenerHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

struct ListenerEntry {
    element: ElementRef,
    event: String,
    options: ListenerOptions,
    callback: ListenerCallback,
    registered_at: DateTime<Utc>,
}

impl ListenerEntry {
    fn is_attached(&self) -> bool {
        self.element.strong_count() > 0
    }
}

#[derive(Default)]
pub struct ListenerRegistry {
    entries: BTreeMap<ListenerHandle, ListenerEntry>,
    next_id: u64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<E>(
        &mut self,
        element: &Arc<E>,
        event: &str,
        options: ListenerOptions,
        callback: ListenerCallback,
        now: DateTime<Utc>,
    ) -> ListenerHandle
    where
        E: Any + Send + Sync,
    {
        self.next_id += 1;
        let handle = ListenerHandle(self.next_id);
        let weak = Arc::downgrade(element);
        let element: ElementRef = weak;

        self.entries.insert(
            handle,
            ListenerEntry {
                element,
                event: event.to_string(),
                options,
                callback,
                registered_at: now,
            },
        );
        handle
    }

    pub fn remove(&mut self, handle: ListenerHandle) -> bool {
        self.entries.remove(&handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose element has been dropped.
    pub fn orphan_count(&self) -> usize {
        self.entries.values().filter(|e| !e.is_attached()).count()
    }

    /// Remove orphaned entries, returning how many were dropped.
    pub fn prune_orphans(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_attached());
        before - self.entries.len()
    }

    /// Callbacks of attached listeners for `event`, in registration order.
    ///
    /// `once` listeners are removed as they are handed out. The callbacks are
    /// returned rather than invoked so the caller can run them without
    /// holding any lock on the registry.
    pub fn take_callbacks(&mut self, event: &str) -> Vec<ListenerCallback> {
        let mut callbacks = Vec::new();
        let mut spent = Vec::new();

        for (handle, entry) in &self.entries {
            if entry.event != event || !entry.is_attached() {
                continue;
            }
            callbacks.push(Arc::clone(&entry.callback));
            if entry.options.once {
                spent.push(*handle);
            }
        }

        for handle in spent {
            self.entries.remove(&handle);
        }
        callbacks
    }

    pub fn oldest_registration(&self) -> Option<DateTime<Utc>> {
        self.entries.values().map(|e| e.registered_at).min()
    }

    pub fn options(&self, handle: ListenerHandle) -> Option<ListenerOptions> {
        self.entries.get(&handle).map(|e| e.options)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("entries", &self.entries.len())
            .field("orphans", &self.orphan_count())
            .finish()
    }
}
