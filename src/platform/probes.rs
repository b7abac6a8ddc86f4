//! Host-independent probe adapters

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::warn;

use super::traits::{HeapProbe, HeapSnapshot, PlatformError, PlatformResult};

/// Probe for hosts that expose no heap introspection at all.
///
/// This is the default: the monitor keeps running, registries and leak
/// detection still work, only memory samples are absent.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableProbe;

impl HeapProbe for UnavailableProbe {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn sample(&self) -> Option<HeapSnapshot> {
        None
    }

    fn request_collection(&self) -> PlatformResult<()> {
        Err(PlatformError::NotSupported(
            "no collection hook on this host".into(),
        ))
    }
}

/// Probe whose figures are set by hand.
///
/// Used by the `simulate` command and by tests to drive the policy engine
/// through specific pressure bands.
#[derive(Debug)]
pub struct ManualProbe {
    snapshot: Mutex<Option<HeapSnapshot>>,
    collection_supported: AtomicBool,
    collection_requests: AtomicUsize,
}

impl ManualProbe {
    /// Probe that starts without any figures.
    pub fn new() -> Self {
        Self {
            snapshot: Mutex::new(None),
            collection_supported: AtomicBool::new(true),
            collection_requests: AtomicUsize::new(0),
        }
    }

    pub fn with_snapshot(snapshot: HeapSnapshot) -> Self {
        let probe = Self::new();
        probe.set(snapshot);
        probe
    }

    /// Probe reporting `percentage` of a 100 MB limit.
    pub fn at_percentage(percentage: f64) -> Self {
        let probe = Self::new();
        probe.set_percentage(percentage);
        probe
    }

    pub fn set(&self, snapshot: HeapSnapshot) {
        match self.snapshot.lock() {
            Ok(mut slot) => *slot = Some(snapshot),
            Err(poisoned) => *poisoned.into_inner() = Some(snapshot),
        }
    }

    pub fn set_used(&self, used: u64, limit: u64) {
        self.set(HeapSnapshot::new(used, used, limit));
    }

    pub fn set_percentage(&self, percentage: f64) {
        const LIMIT: u64 = 100 * 1024 * 1024;
        let used = (LIMIT as f64 * percentage.max(0.0) / 100.0).round() as u64;
        self.set_used(used, LIMIT);
    }

    /// Drop the figures so the probe reports the capability as missing.
    pub fn clear(&self) {
        match self.snapshot.lock() {
            Ok(mut slot) => *slot = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }

    pub fn set_collection_supported(&self, supported: bool) {
        self.collection_supported.store(supported, Ordering::Relaxed);
    }

    /// Number of collection requests received, supported or not.
    pub fn collection_requests(&self) -> usize {
        self.collection_requests.load(Ordering::Relaxed)
    }
}

impl Default for ManualProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HeapProbe for ManualProbe {
    fn name(&self) -> &'static str {
        "manual"
    }

    fn sample(&self) -> Option<HeapSnapshot> {
        match self.snapshot.lock() {
            Ok(slot) => *slot,
            Err(e) => {
                warn!("Manual probe lock poisoned: {}", e);
                *e.into_inner()
            }
        }
    }

    fn request_collection(&self) -> PlatformResult<()> {
        self.collection_requests.fetch_add(1, Ordering::Relaxed);
        if self.collection_supported.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(PlatformError::NotSupported("manual probe has collection disabled".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_probe() {
        let probe = UnavailableProbe;
        assert!(probe.sample().is_none());
        assert!(matches!(
            probe.request_collection(),
            Err(PlatformError::NotSupported(_))
        ));
    }

    #[test]
    fn test_manual_probe_percentage() {
        let probe = ManualProbe::at_percentage(97.0);
        let snap = probe.sample().unwrap();
        assert!((snap.percentage() - 97.0).abs() < 0.01);

        probe.clear();
        assert!(probe.sample().is_none());
    }

    #[test]
    fn test_manual_probe_counts_requests() {
        let probe = ManualProbe::new();
        assert!(probe.request_collection().is_ok());

        probe.set_collection_supported(false);
        assert!(probe.request_collection().is_err());
        assert_eq!(probe.collection_requests(), 2);
    }
}
