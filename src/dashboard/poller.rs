//! Periodic report refresh for dashboards

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use super::data::MemoryReport;
use crate::core::error::{MonitorError, MonitorResult};
use crate::core::optimizer::MemoryOptimizer;

/// Re-reads the optimizer's report on its own period and publishes it.
///
/// Polling only reads state; ticks still come from the monitoring loop.
pub struct ReportPoller {
    receiver: watch::Receiver<MemoryReport>,
    task: Option<JoinHandle<()>>,
}

impl ReportPoller {
    pub fn spawn(optimizer: MemoryOptimizer, every: Duration) -> MonitorResult<Self> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| MonitorError::NoRuntime)?;
        if every.is_zero() {
            return Err(MonitorError::InvalidConfig("poll period must be non-zero".into()));
        }

        let (sender, receiver) = watch::channel(optimizer.report());
        let task = runtime.spawn(async move {
            let mut interval = tokio::time::interval(every);
            // First tick completes immediately and the initial report is already sent
            interval.tick().await;
            loop {
                interval.tick().await;
                if sender.send(optimizer.report()).is_err() {
                    debug!("Report poller stopping: no receivers");
                    break;
                }
            }
        });

        Ok(Self {
            receiver,
            task: Some(task),
        })
    }

    pub fn latest(&self) -> MemoryReport {
        self.receiver.borrow().clone()
    }

    /// Wait for the next published report.
    pub async fn changed(&mut self) -> MonitorResult<MemoryReport> {
        self.receiver
            .changed()
            .await
            .map_err(|_| MonitorError::SourceUnavailable("report poller stopped".into()))?;
        Ok(self.receiver.borrow_and_update().clone())
    }

    pub fn subscribe(&self) -> watch::Receiver<MemoryReport> {
        self.receiver.clone()
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for ReportPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
