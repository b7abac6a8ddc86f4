//! Platform Abstraction Traits for Heap Introspection
//!
//! The monitor never talks to a runtime directly. Everything it knows about
//! heap usage, and every request it makes to reclaim memory, goes through the
//! [`HeapProbe`] trait defined here.
//!
//! ```text
//! +-------------------+
//! |     HeapProbe     |  <- This module (defines the interface)
//! +-------------------+
//!          |
//!    +-----+------+-----------+
//!    |            |           |
//! +--v--+    +----v----+  +---v----+
//! | N/A |    | Process |  | Manual |  <- Adapters chosen at startup
//! +-----+    +---------+  +--------+
//! ```
//!
//! A probe that cannot read heap figures is a supported degraded mode, not a
//! failure: [`HeapProbe::sample`] simply returns `None`.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Error Types
// ============================================================================

/// Platform-agnostic error type for probe operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// Operation not supported on this platform
    NotSupported(String),
    /// Resource is busy or locked
    ResourceBusy(String),
    /// Internal error
    Internal(String),
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::NotSupported(msg) => write!(f, "Not supported: {}", msg),
            PlatformError::ResourceBusy(msg) => write!(f, "Resource busy: {}", msg),
            PlatformError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for PlatformError {}

/// Result type alias for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;

// ============================================================================
// Heap Types
// ============================================================================

/// Raw heap figures reported by a probe, all in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapSnapshot {
    /// Bytes currently in use
    pub used: u64,
    /// Bytes allocated by the runtime (may exceed `used`)
    pub total: u64,
    /// Ceiling imposed by the runtime or host
    pub limit: u64,
}

impl HeapSnapshot {
    pub fn new(used: u64, total: u64, limit: u64) -> Self {
        Self { used, total, limit }
    }

    /// Used bytes as a percentage of the limit; 0 when no limit is known.
    pub fn percentage(&self) -> f64 {
        if self.limit == 0 {
            return 0.0;
        }
        self.used as f64 / self.limit as f64 * 100.0
    }

    pub fn used_mb(&self) -> f64 {
        self.used as f64 / (1024.0 * 1024.0)
    }

    pub fn limit_mb(&self) -> f64 {
        self.limit as f64 / (1024.0 * 1024.0)
    }
}

// ============================================================================
// Probe Trait
// ============================================================================

/// Heap introspection and reclamation hooks for one runtime/host.
pub trait HeapProbe: Send + Sync {
    /// Short adapter name used in log lines.
    fn name(&self) -> &'static str;

    /// Read current heap figures, or `None` when the capability is missing.
    fn sample(&self) -> Option<HeapSnapshot>;

    /// Ask the runtime to reclaim memory.
    ///
    /// Adapters without a collection hook return
    /// [`PlatformError::NotSupported`]; callers fall back to their own
    /// best-effort strategy.
    fn request_collection(&self) -> PlatformResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        let snap = HeapSnapshot::new(50, 80, 200);
        assert!((snap.percentage() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_percentage_without_limit() {
        let snap = HeapSnapshot::new(50, 80, 0);
        assert_eq!(snap.percentage(), 0.0);
    }

    #[test]
    fn test_error_display() {
        let err = PlatformError::NotSupported("gc hook".into());
        assert_eq!(err.to_string(), "Not supported: gc hook");
    }
}
