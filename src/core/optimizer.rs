//! Memory Optimizer Service
//!
//! Owns the registries, sampler, leak detector and finding log, and runs the
//! monitoring loop. Each tick executes sequentially:
//!
//! 1. sample heap figures through the probe
//! 2. run every leak rule
//! 3. run the actions of the current pressure band
//! 4. sweep expired cache entries, idle components and old findings
//!
//! All state sits behind one `RwLock`. Registration calls take the write lock
//! briefly, report readers share the read lock, and ticks never overlap.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::clock::{Clock, SystemClock};
use super::component_scorer::{get_cleanup_candidates, CleanupCandidate};
use super::config::MonitorConfig;
use super::error::{MonitorError, MonitorResult};
use super::events::{EventBus, MemoryEvent};
use super::patterns::PressureBand;
use crate::dashboard::data::{build_report, MemoryReport};
use crate::monitor::leaks::{FindingLog, LeakDetector, MemoryLeakFinding, Severity};
use crate::monitor::sampler::{MemoryMetricSample, MetricsSampler};
use crate::platform::{create_probe, HeapProbe, PlatformError};
use crate::registry::{
    CacheTrackingEntry, ComponentUsageRecord, ListenerCallback, ListenerHandle, ListenerOptions,
    ObserverHandle, Registries, ResourceCounts, TimerHandle, DEFAULT_COMPONENT_SIZE,
};

/// Chunks allocated by the fallback collection burst
const BURST_CHUNKS: usize = 16;
const BURST_CHUNK_BYTES: usize = 64 * 1024;

/// How a collection request was satisfied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionOutcome {
    /// The probe's collection hook ran
    Hook,
    /// No hook; an allocate/release burst ran instead
    Fallback,
    /// The hook failed; the burst ran anyway
    Failed(String),
}

/// One corrective action taken during a tick
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PolicyAction {
    NonEssentialCacheDropped { removed: usize },
    CollectionRequested { outcome: CollectionOutcome },
    WarningBroadcast { receivers: usize },
    OrphanedListenersPruned { removed: usize },
    ImageCacheTrimmed { removed: usize },
    CleanupCandidates { candidates: Vec<CleanupCandidate> },
}

/// What a single tick did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickSummary {
    pub tick: u64,
    pub sample: Option<MemoryMetricSample>,
    pub band: Option<PressureBand>,
    pub findings_added: usize,
    pub cache_expired: usize,
    pub components_swept: usize,
    pub findings_pruned: usize,
    pub actions: Vec<PolicyAction>,
}

struct MonitorState {
    registries: Registries,
    sampler: MetricsSampler,
    detector: LeakDetector,
    findings: FindingLog,
    ticks: u64,
}

impl MonitorState {
    fn new(config: &MonitorConfig) -> Self {
        Self {
            registries: Registries::new(),
            sampler: MetricsSampler::new(
                config.history_size,
                config.trend_window,
                config.trend_change_ratio,
            ),
            detector: LeakDetector::new(config.leaks.clone()),
            findings: FindingLog::new(),
            ticks: 0,
        }
    }
}

struct Shared {
    config: MonitorConfig,
    probe: Arc<dyn HeapProbe>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    state: RwLock<MonitorState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Ok(slot) = self.task.get_mut() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

/// Builder for [`MemoryOptimizer`]
pub struct OptimizerBuilder {
    config: MonitorConfig,
    probe: Option<Arc<dyn HeapProbe>>,
    clock: Arc<dyn Clock>,
}

impl OptimizerBuilder {
    /// Heap probe to sample with; defaults to the adapter named in config
    pub fn probe(mut self, probe: Arc<dyn HeapProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> MonitorResult<MemoryOptimizer> {
        self.config.validate()?;
        let probe = self
            .probe
            .unwrap_or_else(|| create_probe(self.config.probe));

        info!(
            "Memory optimizer configured (probe: {}, interval: {}s, warning: {}%, critical: {}%)",
            probe.name(),
            self.config.sample_interval_secs,
            self.config.warning_threshold,
            self.config.critical_threshold
        );

        let shared = Shared {
            events: EventBus::new(self.config.event_channel_capacity),
            state: RwLock::new(MonitorState::new(&self.config)),
            task: Mutex::new(None),
            config: self.config,
            probe,
            clock: self.clock,
        };
        Ok(MemoryOptimizer {
            shared: Arc::new(shared),
        })
    }
}

/// Unregisters its component when dropped
#[must_use = "dropping the guard unregisters the component immediately"]
pub struct ComponentGuard {
    optimizer: MemoryOptimizer,
    name: String,
    size: u64,
}

impl ComponentGuard {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for ComponentGuard {
    fn drop(&mut self) {
        self.optimizer.unregister_component(&self.name, Some(self.size));
    }
}

/// In-process memory monitor and optimizer.
///
/// Cheap to clone; clones share the same state and loop.
#[derive(Clone)]
pub struct MemoryOptimizer {
    shared: Arc<Shared>,
}

impl MemoryOptimizer {
    pub fn builder(config: MonitorConfig) -> OptimizerBuilder {
        OptimizerBuilder {
            config,
            probe: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Validate `config` and build with its probe and the wall clock
    pub fn new(config: MonitorConfig) -> MonitorResult<Self> {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.shared.config
    }

    pub fn probe_name(&self) -> &'static str {
        self.shared.probe.name()
    }

    fn read_state(&self) -> RwLockReadGuard<'_, MonitorState> {
        self.shared
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, MonitorState> {
        self.shared
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn now(&self) -> DateTime<Utc> {
        self.shared.clock.now()
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Spawn the monitoring loop on the current tokio runtime.
    ///
    /// Calling `start` while the loop runs is a no-op.
    pub fn start(&self) -> MonitorResult<()> {
        let mut slot = self.shared.task.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!("Monitoring loop already running");
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| MonitorError::NoRuntime)?;
        let period = self.shared.config.sample_interval();
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);

        *slot = Some(runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                MemoryOptimizer { shared }.tick();
            }
        }));

        info!("Starting monitoring loop (interval: {:?})", period);
        Ok(())
    }

    /// Stop the monitoring loop; registries are kept.
    pub fn stop(&self) {
        let handle = self
            .shared
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = handle {
            handle.abort();
            info!("Monitoring loop stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Stop the loop and empty every registry, the history and the findings.
    ///
    /// Safe to call repeatedly. Tracking calls made afterwards start from a
    /// clean slate.
    pub fn cleanup(&self) {
        self.stop();
        let mut state = self.write_state();
        state.registries.clear();
        state.sampler.clear();
        state.findings.clear();
        debug!("Monitor state cleared");
    }

    // ── Tick ───────────────────────────────────────────────────────

    /// Run one sampling, detection, policy and sweep cycle.
    pub fn tick(&self) -> TickSummary {
        let config = &self.shared.config;
        let now = self.now();
        let mut warning = None;
        let mut collect = false;

        let mut summary = {
            let mut guard = self.write_state();
            let state = &mut *guard;
            state.ticks += 1;

            let sample = state.sampler.collect(self.shared.probe.as_ref(), now);
            let mut summary = TickSummary {
                tick: state.ticks,
                band: sample
                    .as_ref()
                    .map(|s| PressureBand::classify(s.percentage(), config)),
                sample,
                findings_added: 0,
                cache_expired: 0,
                components_swept: 0,
                findings_pruned: 0,
                actions: Vec::new(),
            };

            // Detection sees the registries before any band action shrinks them
            let findings = {
                let MonitorState { registries, detector, .. } = &mut *state;
                detector.detect(registries, now)
            };
            summary.findings_added = findings.len();
            log_findings(&findings);
            state.findings.extend(findings);

            let current = summary.sample.clone();
            match (summary.band, current.as_ref()) {
                (Some(PressureBand::Critical), Some(sample)) => {
                    error!(
                        "Critical memory pressure: {:.1}% of {:.0} MB limit (threshold {}%)",
                        sample.percentage(),
                        sample.snapshot().limit_mb(),
                        config.critical_threshold
                    );
                    let removed = state.registries.cache.retain_essential(&config.essential_key_markers);
                    warn!("Emergency cleanup dropped {} non-essential cache entries", removed);
                    summary.actions.push(PolicyAction::NonEssentialCacheDropped { removed });
                    collect = true;
                    warning = Some(sample.clone());
                }
                (Some(PressureBand::Warning), Some(sample)) => {
                    warn!(
                        "High memory pressure: {:.1}% (threshold {}%)",
                        sample.percentage(),
                        config.warning_threshold
                    );
                    self.optimize_memory(state, now, &mut summary);
                }
                (Some(PressureBand::GcSuggest), Some(sample)) => {
                    info!(
                        "Memory at {:.1}% exceeds gc-suggest threshold {}%",
                        sample.percentage(),
                        config.gc_suggest_threshold
                    );
                    collect = true;
                }
                _ => {}
            }

            summary.cache_expired = state.registries.cache.remove_expired(now, config.cache_ttl());
            summary.components_swept = state
                .registries
                .components
                .remove_idle(now, config.component_idle_ttl())
                .len();
            summary.findings_pruned = state.findings.prune(now, config.finding_retention());

            if summary.cache_expired > 0 || summary.components_swept > 0 {
                debug!(
                    "Routine cleanup: {} expired cache entries, {} idle components",
                    summary.cache_expired, summary.components_swept
                );
            }
            summary
        };

        // Probe calls and subscribers run without the state lock held
        if collect {
            let outcome = self.force_collection();
            summary.actions.push(PolicyAction::CollectionRequested { outcome });
        }
        if let Some(sample) = warning {
            let receivers = self.shared.events.publish(MemoryEvent::MemoryWarning { sample });
            summary.actions.push(PolicyAction::WarningBroadcast { receivers });
        }

        summary
    }

    /// Warning-band actions: orphaned listeners, image cache, idle components.
    fn optimize_memory(&self, state: &mut MonitorState, now: DateTime<Utc>, summary: &mut TickSummary) {
        let config = &self.shared.config;

        let removed = state.registries.listeners.prune_orphans();
        if removed > 0 {
            info!("Pruned {} orphaned event listeners", removed);
        }
        summary.actions.push(PolicyAction::OrphanedListenersPruned { removed });

        let removed = state
            .registries
            .cache
            .trim_matching(&config.image_key_markers, config.image_cache_keep);
        if removed > 0 {
            info!(
                "Trimmed {} image cache entries (keeping newest {})",
                removed, config.image_cache_keep
            );
        }
        summary.actions.push(PolicyAction::ImageCacheTrimmed { removed });

        let candidates = get_cleanup_candidates(
            &state.registries.components,
            now,
            config.leaks.reference_idle(),
            config.cleanup_candidate_count,
        );
        for candidate in &candidates {
            info!(
                "Cleanup candidate: {} ({} instances, {} bytes, idle {}s)",
                candidate.name, candidate.instances, candidate.total_size, candidate.idle_secs
            );
        }
        summary.actions.push(PolicyAction::CleanupCandidates { candidates });
    }

    /// Best-effort collection: the probe hook, else an allocate/release burst.
    pub fn force_collection(&self) -> CollectionOutcome {
        match self.shared.probe.request_collection() {
            Ok(()) => {
                debug!("Collection hook '{}' ran", self.shared.probe.name());
                CollectionOutcome::Hook
            }
            Err(PlatformError::NotSupported(reason)) => {
                debug!("No collection hook ({}); running allocation burst", reason);
                allocation_burst();
                CollectionOutcome::Fallback
            }
            Err(e) => {
                warn!("Collection hook '{}' failed: {}", self.shared.probe.name(), e);
                allocation_burst();
                CollectionOutcome::Failed(e.to_string())
            }
        }
    }

    // ── Registration API ───────────────────────────────────────────

    /// Count one live instance of `name`; size defaults to 1 KB.
    pub fn register_component(&self, name: &str, estimated_size: Option<u64>) -> ComponentUsageRecord {
        let size = estimated_size.unwrap_or(DEFAULT_COMPONENT_SIZE);
        let now = self.now();
        self.write_state().registries.components.register(name, size, now)
    }

    /// Remove one live instance of `name`.
    ///
    /// Returns the remaining record, or `None` once the last instance is gone
    /// or the name was never registered.
    pub fn unregister_component(&self, name: &str, estimated_size: Option<u64>) -> Option<ComponentUsageRecord> {
        let size = estimated_size.unwrap_or(DEFAULT_COMPONENT_SIZE);
        self.write_state().registries.components.unregister(name, size)
    }

    /// Register `name` until the returned guard is dropped.
    pub fn mount_component(&self, name: &str, estimated_size: Option<u64>) -> ComponentGuard {
        let size = estimated_size.unwrap_or(DEFAULT_COMPONENT_SIZE);
        self.register_component(name, Some(size));
        ComponentGuard {
            optimizer: self.clone(),
            name: name.to_string(),
            size,
        }
    }

    /// Track `data` under `key`, replacing any previous entry.
    ///
    /// Returns the serialized size in bytes.
    pub fn track_cache<T>(&self, key: &str, data: &T) -> MonitorResult<u64>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(data)?;
        let entry = CacheTrackingEntry::from_value(key, value, self.now())?;
        let size = entry.size;
        self.write_state().registries.cache.insert(entry);
        Ok(size)
    }

    pub fn untrack_cache(&self, key: &str) -> bool {
        self.write_state().registries.cache.remove(key).is_some()
    }

    pub fn track_timer(&self, handle: TimerHandle) -> bool {
        self.write_state().registries.timers.insert(handle)
    }

    pub fn untrack_timer(&self, handle: TimerHandle) -> bool {
        self.write_state().registries.timers.remove(handle)
    }

    pub fn track_observer(&self, handle: ObserverHandle) -> bool {
        self.write_state().registries.observers.insert(handle)
    }

    pub fn untrack_observer(&self, handle: ObserverHandle) -> bool {
        self.write_state().registries.observers.remove(handle)
    }

    /// Subscribe `callback` to `event` on `element` through the monitor.
    pub fn add_event_listener<E, F>(
        &self,
        element: &Arc<E>,
        event: &str,
        options: ListenerOptions,
        callback: F,
    ) -> ListenerHandle
    where
        E: Any + Send + Sync,
        F: Fn(&str) + Send + Sync + 'static,
    {
        let callback: ListenerCallback = Arc::new(callback);
        let now = self.now();
        self.write_state()
            .registries
            .listeners
            .add(element, event, options, callback, now)
    }

    pub fn remove_event_listener(&self, handle: ListenerHandle) -> bool {
        self.write_state().registries.listeners.remove(handle)
    }

    /// Invoke the callbacks of attached listeners for `event`.
    ///
    /// Returns how many ran.
    pub fn dispatch_event(&self, event: &str) -> usize {
        let callbacks = self.write_state().registries.listeners.take_callbacks(event);
        for callback in &callbacks {
            callback(event);
        }
        callbacks.len()
    }

    // ── Queries ────────────────────────────────────────────────────

    pub fn subscribe(&self) -> broadcast::Receiver<MemoryEvent> {
        self.shared.events.subscribe()
    }

    pub fn current_metrics(&self) -> Option<MemoryMetricSample> {
        self.read_state().sampler.current().cloned()
    }

    pub fn memory_leaks(&self) -> Vec<MemoryLeakFinding> {
        self.read_state().findings.to_vec()
    }

    pub fn component_stats(&self) -> Vec<ComponentUsageRecord> {
        self.read_state().registries.components.snapshot()
    }

    pub fn resource_counts(&self) -> ResourceCounts {
        self.read_state().registries.counts()
    }

    pub fn tick_count(&self) -> u64 {
        self.read_state().ticks
    }

    /// Aggregate current state into a report. Never mutates state.
    pub fn report(&self) -> MemoryReport {
        let generated_at = self.now();
        let state = self.read_state();
        build_report(
            generated_at,
            state.sampler.history().iter().cloned().collect(),
            state.findings.to_vec(),
            state.registries.components.snapshot(),
            state.registries.counts(),
            &self.shared.config,
        )
    }
}

impl std::fmt::Debug for MemoryOptimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryOptimizer")
            .field("probe", &self.shared.probe.name())
            .field("running", &self.is_running())
            .finish()
    }
}

fn log_findings(findings: &[MemoryLeakFinding]) {
    for finding in findings {
        match finding.severity {
            Severity::Critical | Severity::High => warn!(
                "Leak suspect [{}/{}] {}: {}",
                finding.leak_type, finding.severity, finding.component, finding.description
            ),
            Severity::Medium | Severity::Low => debug!(
                "Leak suspect [{}/{}] {}: {}",
                finding.leak_type, finding.severity, finding.component, finding.description
            ),
        }
    }
}

/// Allocate and release a burst of buffers to nudge the allocator.
fn allocation_burst() {
    let chunks: Vec<Vec<u8>> = (0..BURST_CHUNKS)
        .map(|_| vec![0u8; BURST_CHUNK_BYTES])
        .collect();
    std::hint::black_box(&chunks);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::platform::ManualProbe;
    use std::time::Duration;

    fn optimizer_with(probe: Arc<ManualProbe>, clock: Arc<ManualClock>) -> MemoryOptimizer {
        MemoryOptimizer::builder(MonitorConfig::default())
            .probe(probe)
            .clock(clock)
            .build()
            .unwrap()
    }

    fn fixture() -> (MemoryOptimizer, Arc<ManualProbe>, Arc<ManualClock>) {
        let probe = Arc::new(ManualProbe::new());
        let clock = Arc::new(ManualClock::starting_now());
        (optimizer_with(Arc::clone(&probe), Arc::clone(&clock)), probe, clock)
    }

    #[test]
    fn test_tick_without_probe_figures() {
        let (optimizer, _probe, _clock) = fixture();
        let summary = optimizer.tick();
        assert!(summary.sample.is_none());
        assert!(summary.band.is_none());
        assert!(summary.actions.is_empty());
        assert!(optimizer.current_metrics().is_none());
        assert_eq!(optimizer.tick_count(), 1);
    }

    #[test]
    fn test_critical_tick_drops_non_essential_cache() {
        let (optimizer, probe, _clock) = fixture();
        optimizer.track_cache("essential:session", &"token").unwrap();
        optimizer.track_cache("product:1", &vec![1, 2, 3]).unwrap();
        probe.set_percentage(97.0);

        let mut rx = optimizer.subscribe();
        let summary = optimizer.tick();

        assert_eq!(summary.band, Some(PressureBand::Critical));
        assert!(summary
            .actions
            .contains(&PolicyAction::NonEssentialCacheDropped { removed: 1 }));
        assert!(summary.actions.contains(&PolicyAction::CollectionRequested {
            outcome: CollectionOutcome::Hook
        }));
        assert_eq!(probe.collection_requests(), 1);
        assert_eq!(optimizer.resource_counts().cache_entries, 1);

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_critical_tick_detects_before_eviction() {
        let (optimizer, probe, _clock) = fixture();
        for i in 0..1500 {
            optimizer.track_cache(&format!("product:{}", i), &i).unwrap();
        }
        probe.set_percentage(97.0);

        let summary = optimizer.tick();
        assert_eq!(summary.band, Some(PressureBand::Critical));
        assert_eq!(summary.findings_added, 1);
        assert!(summary
            .actions
            .contains(&PolicyAction::NonEssentialCacheDropped { removed: 1500 }));

        let leaks = optimizer.memory_leaks();
        assert_eq!(leaks[0].leak_type, crate::monitor::leaks::LeakType::Cache);
        assert_eq!(optimizer.resource_counts().cache_entries, 0);
    }

    #[test]
    fn test_warning_tick_counts_orphans_before_pruning() {
        let (optimizer, probe, _clock) = fixture();
        for _ in 0..60 {
            let gone = Arc::new(());
            optimizer.add_event_listener(&gone, "scroll", ListenerOptions::default(), |_| {});
        }
        probe.set_percentage(85.0);

        let summary = optimizer.tick();
        assert_eq!(summary.band, Some(PressureBand::Warning));
        assert_eq!(summary.findings_added, 1);
        assert!(summary
            .actions
            .contains(&PolicyAction::OrphanedListenersPruned { removed: 60 }));
        assert_eq!(optimizer.resource_counts().listeners, 0);
    }

    #[test]
    fn test_collection_falls_back_without_hook() {
        let (optimizer, probe, _clock) = fixture();
        probe.set_collection_supported(false);
        assert_eq!(optimizer.force_collection(), CollectionOutcome::Fallback);
    }

    #[test]
    fn test_warning_tick_prunes_and_trims() {
        let (optimizer, probe, _clock) = fixture();
        let element = Arc::new(());
        {
            let gone = Arc::new(());
            optimizer.add_event_listener(&gone, "click", ListenerOptions::default(), |_| {});
        }
        optimizer.add_event_listener(&element, "click", ListenerOptions::default(), |_| {});
        for i in 0..25 {
            optimizer.track_cache(&format!("img:{}", i), &i).unwrap();
        }
        probe.set_percentage(85.0);

        let summary = optimizer.tick();
        assert_eq!(summary.band, Some(PressureBand::Warning));
        assert!(summary
            .actions
            .contains(&PolicyAction::OrphanedListenersPruned { removed: 1 }));
        assert!(summary
            .actions
            .contains(&PolicyAction::ImageCacheTrimmed { removed: 5 }));

        let counts = optimizer.resource_counts();
        assert_eq!(counts.listeners, 1);
        assert_eq!(counts.cache_entries, 20);
    }

    #[test]
    fn test_gc_suggest_band_requests_collection() {
        let probe = Arc::new(ManualProbe::at_percentage(87.0));
        let config = MonitorConfig {
            warning_threshold: 90.0,
            ..Default::default()
        };
        let optimizer = MemoryOptimizer::builder(config)
            .probe(Arc::clone(&probe) as Arc<dyn HeapProbe>)
            .build()
            .unwrap();

        let summary = optimizer.tick();
        assert_eq!(summary.band, Some(PressureBand::GcSuggest));
        assert_eq!(probe.collection_requests(), 1);
    }

    #[test]
    fn test_routine_sweeps() {
        let (optimizer, _probe, clock) = fixture();
        optimizer.track_cache("product:1", &"old").unwrap();
        optimizer.register_component("Sidebar", None);
        for i in 0..30 {
            optimizer.track_timer(TimerHandle(i));
        }
        optimizer.tick();
        assert_eq!(optimizer.memory_leaks().len(), 1);

        clock.advance(Duration::from_secs(3601));
        for i in 0..30 {
            optimizer.untrack_timer(TimerHandle(i));
        }
        let summary = optimizer.tick();
        assert_eq!(summary.cache_expired, 1);
        assert_eq!(summary.components_swept, 1);
        assert_eq!(summary.findings_pruned, 1);
        assert!(optimizer.memory_leaks().is_empty());
    }

    #[test]
    fn test_component_guard_unregisters() {
        let (optimizer, _probe, _clock) = fixture();
        {
            let _a = optimizer.mount_component("Checkout", Some(4096));
            let _b = optimizer.mount_component("Checkout", Some(4096));
            assert_eq!(optimizer.component_stats()[0].instances, 2);
        }
        assert!(optimizer.component_stats().is_empty());
    }

    #[test]
    fn test_dispatch_event() {
        let (optimizer, _probe, _clock) = fixture();
        let element = Arc::new(());
        let hits = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        optimizer.add_event_listener(&element, "resize", ListenerOptions::default(), move |_| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });

        assert_eq!(optimizer.dispatch_event("resize"), 1);
        assert_eq!(optimizer.dispatch_event("scroll"), 0);
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let (optimizer, probe, _clock) = fixture();
        probe.set_percentage(40.0);
        optimizer.register_component("Header", None);
        optimizer.track_timer(TimerHandle(1));
        optimizer.tick();

        optimizer.cleanup();
        optimizer.cleanup();
        assert_eq!(optimizer.resource_counts(), ResourceCounts::default());
        assert!(optimizer.current_metrics().is_none());

        assert!(optimizer.track_timer(TimerHandle(1)));
        assert_eq!(optimizer.resource_counts().timers, 1);
    }

    #[test]
    fn test_start_requires_runtime() {
        let (optimizer, _probe, _clock) = fixture();
        assert!(matches!(optimizer.start(), Err(MonitorError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let (optimizer, probe, _clock) = fixture();
        probe.set_percentage(30.0);

        optimizer.start().unwrap();
        optimizer.start().unwrap();
        assert!(optimizer.is_running());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(optimizer.tick_count() >= 1);

        optimizer.stop();
        assert!(!optimizer.is_running());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = MonitorConfig {
            history_size: 2,
            ..Default::default()
        };
        assert!(MemoryOptimizer::new(config).is_err());
    }
}
