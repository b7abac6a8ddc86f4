//! Platform Abstraction Layer for heap introspection
//!
//! ```text
//! src/platform/
//! +-- mod.rs           <- This file (module definitions, probe selection)
//! +-- traits.rs        <- HeapProbe trait and error types
//! +-- probes.rs        <- Unavailable and manual adapters
//! +-- process.rs       <- Current-process adapter (sysinfo)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use perfwatch::platform::{create_probe, ProbeKind};
//!
//! let probe = create_probe(ProbeKind::Process);
//! if let Some(snapshot) = probe.sample() {
//!     println!("{:.1}% of limit in use", snapshot.percentage());
//! }
//! ```

pub mod probes;
pub mod process;
pub mod traits;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use probes::{ManualProbe, UnavailableProbe};
pub use process::ProcessProbe;
pub use traits::{HeapProbe, HeapSnapshot, PlatformError, PlatformResult};

/// Probe adapters selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// No heap introspection; samples are always absent
    #[default]
    Unavailable,
    /// Resident memory of the current process
    Process,
}

impl std::fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeKind::Unavailable => write!(f, "unavailable"),
            ProbeKind::Process => write!(f, "process"),
        }
    }
}

/// Build the probe adapter for `kind`.
pub fn create_probe(kind: ProbeKind) -> Arc<dyn HeapProbe> {
    match kind {
        ProbeKind::Unavailable => Arc::new(UnavailableProbe),
        ProbeKind::Process => Arc::new(ProcessProbe::new()),
    }
}
