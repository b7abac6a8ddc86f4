use chrono::Utc;
use perfwatch::dashboard::data::risk_score;
use perfwatch::monitor::sampler::MetricsSampler;
use perfwatch::registry::ComponentRegistry;
use perfwatch::{
    HeapSnapshot, LeakType, MemoryLeakFinding, MemoryMetricSample, Severity, Trend,
};
use proptest::prelude::*;

fn severity() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::Low),
        Just(Severity::Medium),
        Just(Severity::High),
        Just(Severity::Critical),
    ]
}

fn trend() -> impl Strategy<Value = Trend> {
    prop_oneof![Just(Trend::Increasing), Just(Trend::Decreasing), Just(Trend::Stable)]
}

proptest! {
    #[test]
    fn component_instances_track_net_registrations(
        ops in proptest::collection::vec(any::<bool>(), 0..64),
    ) {
        let mut registry = ComponentRegistry::new();
        let now = Utc::now();
        let mut live: u32 = 0;

        for register in ops {
            if register {
                registry.register("ProductCard", 512, now);
                live += 1;
            } else {
                registry.unregister("ProductCard", 512);
                live = live.saturating_sub(1);
            }

            match registry.get("ProductCard") {
                Some(record) => {
                    prop_assert_eq!(record.instances, live, "instances follow net registrations");
                    prop_assert_eq!(record.total_size, live as u64 * 512);
                }
                None => prop_assert_eq!(live, 0, "record absent only at zero"),
            }
        }
    }

    #[test]
    fn risk_score_is_bounded(
        percentage in 0u64..=150,
        trend in trend(),
        severities in proptest::collection::vec(severity(), 0..40),
    ) {
        let current = MemoryMetricSample::new(HeapSnapshot::new(percentage, percentage, 100), trend, Utc::now());
        let leaks: Vec<MemoryLeakFinding> = severities
            .into_iter()
            .enumerate()
            .map(|(i, severity)| MemoryLeakFinding {
                id: format!("listener-0-{}", i),
                component: "EventListener".into(),
                leak_type: LeakType::Listener,
                severity,
                description: String::new(),
                detected_at: Utc::now(),
                estimated_size: 0,
            })
            .collect();

        let score = risk_score(Some(&current), &leaks);
        prop_assert!((0.0..=100.0).contains(&score));
        prop_assert!((0.0..=100.0).contains(&risk_score(None, &leaks)));
    }

    #[test]
    fn trend_stable_until_window_fills(
        used in proptest::collection::vec(0u64..10_000_000, 1..5),
    ) {
        let mut sampler = MetricsSampler::new(100, 5, 0.05);
        let now = Utc::now();
        for value in used {
            let sample = sampler.record(HeapSnapshot::new(value, value, 10_000_000), now);
            prop_assert_eq!(sample.trend(), Trend::Stable);
        }
    }

    #[test]
    fn trend_follows_direction(
        base in 1_000_000u64..5_000_000,
        step in 100_000u64..500_000,
    ) {
        let mut rising = MetricsSampler::new(100, 5, 0.05);
        let mut falling = MetricsSampler::new(100, 5, 0.05);
        let now = Utc::now();
        let limit = 100_000_000;

        let mut last_up = None;
        let mut last_down = None;
        for i in 0..5 {
            let up = base + step * i;
            let down = base + step * (4 - i);
            last_up = Some(rising.record(HeapSnapshot::new(up, up, limit), now));
            last_down = Some(falling.record(HeapSnapshot::new(down, down, limit), now));
        }

        prop_assert_eq!(last_up.map(|s| s.trend()), Some(Trend::Increasing));
        prop_assert_eq!(last_down.map(|s| s.trend()), Some(Trend::Decreasing));
    }
}
