use std::sync::{Arc, Barrier};
use std::time::Duration;

use assert2::check;
use meterkit::timesource::{TimeSource, fakes::ManualTime};
use meterkit::{DistributionSummary, Meter, MeterId, Registry, Statistic, Tags};
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn concurrent_first_access_yields_one_summary() {
    init_logging();
    const THREADS: usize = 8;
    let registry = Registry::new();
    let barrier = Barrier::new(THREADS);
    let summaries: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    let builder = DistributionSummary::builder("request.size")
                        .tag("method", "POST")
                        .tag("status", "200");
                    barrier.wait();
                    let summary = builder.register(&registry).unwrap();
                    for i in 0..100 {
                        summary.record(i as f64);
                    }
                    summary
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    check!(registry.len() == 1);
    for summary in &summaries {
        check!(Arc::ptr_eq(summary, &summaries[0]));
    }
    check!(summaries[0].count() == (THREADS * 100) as u64);
}

#[test]
fn lookup_by_structural_identity() {
    init_logging();
    let registry = Registry::new();
    let summary = DistributionSummary::builder("request.size")
        .tags([("b", "2"), ("a", "1")])
        .register(&registry)
        .unwrap();
    summary.record(10.0);

    let tags: Tags = [("a", "1"), ("b", "2")].into_iter().collect();
    let found = registry.get(&MeterId::new("request.size", tags)).unwrap();
    check!(found.count() == 1);
    check!(registry.get(&MeterId::untagged("request.size")).is_none());
}

#[test]
fn exporter_reads_every_meter() {
    init_logging();
    let registry = Registry::new();
    for (uri, size) in [("/a", 10.0), ("/b", 20.0), ("/c", 30.0)] {
        DistributionSummary::builder("response.size")
            .tag("uri", uri)
            .register(&registry)
            .unwrap()
            .record(size);
    }

    let mut totals: Vec<(String, f64)> = registry
        .meters()
        .iter()
        .map(|meter| {
            let total = meter
                .measure()
                .into_iter()
                .find(|m| m.statistic == Statistic::TotalAmount)
                .unwrap()
                .value;
            (meter.id().to_string(), total)
        })
        .collect();
    totals.sort_by(|a, b| a.0.cmp(&b.0));
    check!(
        totals
            == vec![
                ("response.size{uri=/a}".to_string(), 10.0),
                ("response.size{uri=/b}".to_string(), 20.0),
                ("response.size{uri=/c}".to_string(), 30.0),
            ]
    );
}

#[cfg(feature = "serde")]
#[test]
fn config_from_file_with_decay_window() {
    init_logging();
    let config: meterkit::DistributionConfig = toml::from_str(
        r#"
        expiry = 60

        [sketch]
        compression = 200.0
        shards = 2
        "#,
    )
    .unwrap();
    let clock = ManualTime::new();
    let registry = Registry::new();
    let summary = DistributionSummary::builder("queue.depth")
        .config(config)
        .time_source(TimeSource::custom(clock.clone()))
        .register(&registry)
        .unwrap();
    check!(summary.sketch_config().compression == 200.0);
    check!(summary.sketch_config().shards == 2);

    summary.record(500.0);
    clock.advance(Duration::from_secs(61));
    summary.record(1.0);
    check!(summary.quantile(0.0) == 1.0);
    check!(summary.quantile(1.0) == 1.0);
    check!(summary.count() == 2);
    check!(summary.max() == 500.0);
}
