//! End-to-end monitor scenarios driven through the public API

use perfwatch::{
    HealthStatus, HeapProbe, LeakType, ListenerOptions, ManualClock, ManualProbe, MemoryEvent,
    MemoryOptimizer, MonitorConfig, ObserverHandle, PressureBand, Severity, TimerHandle,
};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    optimizer: MemoryOptimizer,
    probe: Arc<ManualProbe>,
    clock: Arc<ManualClock>,
}

fn harness() -> Harness {
    let probe = Arc::new(ManualProbe::new());
    let clock = Arc::new(ManualClock::starting_now());
    let optimizer = MemoryOptimizer::builder(MonitorConfig::default())
        .probe(Arc::clone(&probe) as Arc<dyn HeapProbe>)
        .clock(Arc::clone(&clock) as Arc<dyn perfwatch::Clock>)
        .build()
        .unwrap();
    Harness {
        optimizer,
        probe,
        clock,
    }
}

#[test]
fn component_accounting_across_mounts() {
    let h = harness();
    for _ in 0..3 {
        h.optimizer.register_component("ProductList", Some(2048));
    }

    let stats = h.optimizer.component_stats();
    let record = stats.iter().find(|r| r.name == "ProductList").unwrap();
    assert_eq!(record.total_size, 6144);
    assert_eq!(record.instances, 3);
    assert_eq!(record.average_size, 2048);

    let record = h
        .optimizer
        .unregister_component("ProductList", Some(2048))
        .unwrap();
    assert_eq!(record.instances, 2);
    assert_eq!(record.total_size, 4096);
}

#[test]
fn listener_findings_escalate() {
    let h = harness();
    let element = Arc::new("button#add-to-cart");
    let mut handles = Vec::new();
    for _ in 0..60 {
        handles.push(h.optimizer.add_event_listener(
            &element,
            "click",
            ListenerOptions::default(),
            |_| {},
        ));
    }

    let summary = h.optimizer.tick();
    assert_eq!(summary.findings_added, 1);
    let leaks = h.optimizer.memory_leaks();
    assert_eq!(leaks[0].leak_type, LeakType::Listener);
    assert_eq!(leaks[0].severity, Severity::Medium);

    for _ in 60..110 {
        handles.push(h.optimizer.add_event_listener(
            &element,
            "click",
            ListenerOptions::default(),
            |_| {},
        ));
    }
    h.optimizer.tick();
    let leaks = h.optimizer.memory_leaks();
    assert_eq!(leaks.len(), 2);
    assert_eq!(leaks[1].severity, Severity::Critical);
    assert_eq!(h.optimizer.report().summary.status, HealthStatus::Critical);
}

#[test]
fn critical_pressure_reports_and_notifies_once() {
    let h = harness();
    let mut events = h.optimizer.subscribe();
    h.probe.set_percentage(97.0);

    let summary = h.optimizer.tick();
    assert_eq!(summary.band, Some(PressureBand::Critical));
    assert_eq!(h.optimizer.report().summary.status, HealthStatus::Critical);

    let MemoryEvent::MemoryWarning { sample } = events.try_recv().unwrap();
    assert!((sample.percentage() - 97.0).abs() < 0.01);
    assert!(events.try_recv().is_err());
}

#[test]
fn cache_entries_expire_after_tick() {
    let h = harness();
    h.optimizer
        .track_cache("product:42", &serde_json::json!({"name": "Mug", "price": 12.5}))
        .unwrap();

    h.clock.advance(Duration::from_secs(30 * 60));
    h.optimizer.tick();
    assert_eq!(h.optimizer.resource_counts().cache_entries, 1);

    h.clock.advance(Duration::from_secs(31 * 60));
    h.optimizer.tick();
    assert_eq!(h.optimizer.resource_counts().cache_entries, 0);
}

#[test]
fn large_cache_raises_cache_finding() {
    let h = harness();
    for i in 0..1001 {
        h.optimizer.track_cache(&format!("search:{}", i), &i).unwrap();
    }
    h.optimizer.tick();

    let leaks = h.optimizer.memory_leaks();
    let cache = leaks.iter().find(|l| l.leak_type == LeakType::Cache).unwrap();
    assert_eq!(cache.severity, Severity::Medium);
    assert!(h
        .optimizer
        .report()
        .recommendations
        .iter()
        .any(|r| r.contains("cache size limits")));
}

#[test]
fn critical_pressure_keeps_cache_finding() {
    let h = harness();
    for i in 0..1500 {
        h.optimizer.track_cache(&format!("listing:{}", i), &i).unwrap();
    }
    h.probe.set_percentage(97.0);

    let summary = h.optimizer.tick();
    assert_eq!(summary.band, Some(PressureBand::Critical));
    assert!(h
        .optimizer
        .memory_leaks()
        .iter()
        .any(|l| l.leak_type == LeakType::Cache));
    assert_eq!(h.optimizer.resource_counts().cache_entries, 0);
}

#[test]
fn observers_and_timers_graded() {
    let h = harness();
    for i in 0..26 {
        h.optimizer.track_observer(ObserverHandle(i));
    }
    for i in 0..21 {
        h.optimizer.track_timer(TimerHandle(i));
    }
    h.optimizer.tick();

    let leaks = h.optimizer.memory_leaks();
    let observer = leaks.iter().find(|l| l.leak_type == LeakType::Observer).unwrap();
    let timer = leaks.iter().find(|l| l.leak_type == LeakType::Timer).unwrap();
    assert_eq!(observer.severity, Severity::High);
    assert_eq!(timer.severity, Severity::Medium);
}

#[test]
fn cleanup_twice_then_resume() {
    let h = harness();
    h.probe.set_percentage(50.0);
    h.optimizer.register_component("Cart", None);
    h.optimizer.track_cache("cart", &[1, 2, 3]).unwrap();
    h.optimizer.tick();

    h.optimizer.cleanup();
    h.optimizer.cleanup();
    let report = h.optimizer.report();
    assert!(report.current.is_none());
    assert!(report.leaks.is_empty());
    assert!(report.components.is_empty());

    h.optimizer.register_component("Cart", None);
    assert_eq!(h.optimizer.component_stats().len(), 1);
}

#[test]
fn unavailable_probe_is_healthy() {
    let optimizer = MemoryOptimizer::new(MonitorConfig::default()).unwrap();
    let summary = optimizer.tick();
    assert!(summary.sample.is_none());

    let report = optimizer.report();
    assert_eq!(report.summary.status, HealthStatus::Healthy);
    assert_eq!(report.summary.risk_score, 0.0);
}

#[tokio::test]
async fn loop_ticks_until_stopped() {
    let h = harness();
    h.probe.set_percentage(40.0);
    h.optimizer.start().unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.optimizer.tick_count() >= 1);
    assert!(h.optimizer.current_metrics().is_some());

    h.optimizer.stop();
    tokio::task::yield_now().await;
    assert!(!h.optimizer.is_running());
}
