//! Process-wide memory notifications

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::monitor::sampler::MemoryMetricSample;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MemoryEvent {
    /// Heap usage crossed the critical threshold
    MemoryWarning { sample: MemoryMetricSample },
}

/// Broadcast channel any number of listeners (toasts, banners, logs) can
/// subscribe to.
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<MemoryEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MemoryEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of subscribers reached.
    pub fn publish(&self, event: MemoryEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("Memory event dropped: no subscribers");
                0
            }
        }
    }
}
