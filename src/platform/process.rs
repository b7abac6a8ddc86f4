//! Current-process heap probe backed by sysinfo
//!
//! Reports the resident set size of this process as `used`, its virtual size
//! as `total`, and physical memory of the machine as `limit`. On glibc Linux
//! a collection request returns freed heap pages to the OS via
//! `malloc_trim(0)`; other targets have no such hook.

use std::sync::Mutex;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::{debug, warn};

use super::traits::{HeapProbe, HeapSnapshot, PlatformError, PlatformResult};

pub struct ProcessProbe {
    system: Mutex<System>,
    pid: Option<Pid>,
}

impl ProcessProbe {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                warn!("Cannot resolve current pid, heap sampling disabled: {}", e);
                None
            }
        };

        Self {
            system: Mutex::new(System::new()),
            pid,
        }
    }

    /// Refresh this process and the host memory totals.
    fn read(&self) -> PlatformResult<HeapSnapshot> {
        let pid = self
            .pid
            .ok_or_else(|| PlatformError::NotSupported("current pid is unknown".into()))?;
        let mut system = self
            .system
            .lock()
            .map_err(|e| PlatformError::ResourceBusy(format!("system handle poisoned: {}", e)))?;

        system.refresh_memory();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

        let limit = system.total_memory();
        if limit == 0 {
            return Err(PlatformError::NotSupported(
                "host reports no physical memory total".into(),
            ));
        }

        let process = system
            .process(pid)
            .ok_or_else(|| PlatformError::Internal(format!("process {} missing after refresh", pid)))?;
        Ok(HeapSnapshot {
            used: process.memory(),
            total: process.virtual_memory(),
            limit,
        })
    }
}

impl Default for ProcessProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HeapProbe for ProcessProbe {
    fn name(&self) -> &'static str {
        "process"
    }

    fn sample(&self) -> Option<HeapSnapshot> {
        match self.read() {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                debug!("Process probe has no figures: {}", e);
                None
            }
        }
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    fn request_collection(&self) -> PlatformResult<()> {
        // SAFETY: malloc_trim only walks allocator arenas owned by this process.
        let released = unsafe { libc::malloc_trim(0) };
        debug!("malloc_trim released memory: {}", released != 0);
        Ok(())
    }

    #[cfg(not(all(target_os = "linux", target_env = "gnu")))]
    fn request_collection(&self) -> PlatformResult<()> {
        Err(PlatformError::NotSupported(format!(
            "no heap trim hook on {}",
            std::env::consts::OS
        )))
    }
}
