use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use assert2::check;
use meterkit::{DistributionSummary, SketchConfig, TDigest};

const WRITERS: usize = 8;
const PER_WRITER: usize = 1_000;

#[test]
fn concurrent_writers_match_single_threaded_sketch() {
    let summary = Arc::new(
        DistributionSummary::builder("payload.bytes")
            .sketch_config(SketchConfig {
                shards: 4,
                ..Default::default()
            })
            .create(),
    );
    std::thread::scope(|s| {
        for t in 0..WRITERS {
            let summary = summary.clone();
            s.spawn(move || {
                for i in 0..PER_WRITER {
                    summary.record((t * PER_WRITER + i) as f64);
                }
            });
        }
    });

    let n = WRITERS * PER_WRITER;
    let mut single = TDigest::default();
    for v in 0..n {
        single.insert(v as f64);
    }

    check!(summary.count() == n as u64);
    // integers below 2^53 sum exactly in any order
    check!(summary.total_amount() == (n * (n - 1) / 2) as f64);
    check!(summary.max() == (n - 1) as f64);

    let concurrent = summary.quantile(0.99);
    let expected = single.quantile(0.99).unwrap();
    // one percent of the rank range on either side
    check!(
        (concurrent - expected).abs() <= 0.02 * n as f64,
        "concurrent={concurrent} single={expected}"
    );
    check!((concurrent / n as f64 - 0.99).abs() <= 0.01);
}

#[test]
fn readers_see_monotonic_counters_while_writers_run() {
    let summary = Arc::new(DistributionSummary::builder("sizes").create());
    let done = AtomicBool::new(false);
    std::thread::scope(|s| {
        let writers: Vec<_> = (0..4)
            .map(|_| {
                let summary = summary.clone();
                s.spawn(move || {
                    for i in 0..20_000 {
                        summary.record((i % 1000) as f64);
                    }
                })
            })
            .collect();
        let reader = s.spawn(|| {
            let mut last_count = 0;
            let mut last_total = 0.0;
            while !done.load(Ordering::Relaxed) {
                let count = summary.count();
                let total = summary.total_amount();
                assert!(count >= last_count);
                assert!(total >= last_total);
                let median = summary.quantile(0.5);
                assert!(median.is_nan() || (0.0..1000.0).contains(&median));
                last_count = count;
                last_total = total;
            }
        });
        for writer in writers {
            writer.join().unwrap();
        }
        done.store(true, Ordering::Relaxed);
        reader.join().unwrap();
    });
    check!(summary.count() == 80_000);
}
