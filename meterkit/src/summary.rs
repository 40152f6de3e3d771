// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use meterkit_core::{Measurement, Meter, MeterId, MeterType, QuantileSpec, Statistic};
use meterkit_sketch::{SampleSketch, SketchConfig, is_recordable};
use portable_atomic::AtomicF64;

use crate::sum::CompensatedSum;
use crate::timesource::TimeSource;
use crate::{Builder, DistributionConfig, DistributionSnapshot, ValueAtQuantile};

/// Tracks the distribution of a stream of non-negative amounts, such as response sizes.
///
/// A summary keeps an exact count and a compensated total of everything recorded, the largest amount, and a
/// bounded-memory [`SampleSketch`] answering approximate quantile queries. All operations take
/// `&self` and are safe to call from any number of threads. Recording never fails: negative, NaN
/// and infinite amounts are dropped without affecting any statistic.
///
/// Summaries are created from a [`Builder`], usually through a [`Registry`](crate::Registry) so
/// that every recorder of the same [`MeterId`] shares one instance.
///
/// ```
/// use meterkit::{DistributionSummary, QuantileSpec};
///
/// let summary = DistributionSummary::builder("response.size")
///     .tag("uri", "/api/users")
///     .quantiles(QuantileSpec::new([0.5, 0.99]).unwrap())
///     .create();
///
/// for size in [512.0, 1024.0, 2048.0, -1.0] {
///     summary.record(size);
/// }
/// assert_eq!(summary.count(), 3);
/// assert_eq!(summary.total_amount(), 3584.0);
/// assert_eq!(summary.max(), 2048.0);
/// ```
pub struct DistributionSummary {
    id: MeterId,
    quantiles: QuantileSpec,
    config: DistributionConfig,
    sketch: SampleSketch,
    count: AtomicU64,
    total: CompensatedSum,
    max: AtomicF64,
    window: Option<DecayWindow>,
}

impl fmt::Debug for DistributionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributionSummary")
            .field("id", &self.id)
            .field("count", &self.count())
            .field("total", &self.total_amount())
            .finish_non_exhaustive()
    }
}

impl DistributionSummary {
    /// Start declaring a summary named `name`
    pub fn builder(name: impl Into<meterkit_core::CowStr>) -> Builder {
        Builder::new(name)
    }

    pub(crate) fn new(
        id: MeterId,
        quantiles: QuantileSpec,
        config: DistributionConfig,
        time_source: TimeSource,
    ) -> Self {
        let sketch = SampleSketch::new(config.sketch);
        let config = DistributionConfig {
            sketch: *sketch.config(),
            expiry: config.expiry.filter(|expiry| {
                let valid = !expiry.is_zero();
                if !valid {
                    tracing::warn!(meter = %id, "ignoring zero-length decay window");
                }
                valid
            }),
        };
        Self {
            window: config
                .expiry
                .map(|length| DecayWindow::new(length, time_source)),
            id,
            quantiles,
            config,
            sketch,
            count: AtomicU64::new(0),
            total: CompensatedSum::default(),
            max: AtomicF64::new(0.0),
        }
    }

    /// Record one amount.
    ///
    /// Negative, NaN and infinite amounts are dropped.
    pub fn record(&self, amount: f64) {
        if !is_recordable(amount) {
            tracing::trace!(meter = %self.id, amount, "dropping invalid amount");
            return;
        }
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total.add(amount);
        self.max.fetch_max(amount, Ordering::Relaxed);
        self.rotate_if_expired();
        self.sketch.insert(amount);
    }

    /// Number of amounts recorded since creation
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Sum of the amounts recorded since creation.
    ///
    /// Accumulated with compensation, so small amounts are not lost once the total is large.
    pub fn total_amount(&self) -> f64 {
        self.total.load()
    }

    /// Largest amount recorded since creation, 0 when nothing has been recorded
    pub fn max(&self) -> f64 {
        self.max.load(Ordering::Relaxed)
    }

    /// Mean of the amounts recorded since creation, NaN when nothing has been recorded
    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            return f64::NAN;
        }
        self.total_amount() / count as f64
    }

    /// Estimate the amount at rank `q`, clamped to `[0, 1]`.
    ///
    /// `q = 0` and `q = 1` give the smallest and largest amount in the sketch. Returns NaN when
    /// nothing has been recorded (in the current decay window, if one is configured).
    pub fn quantile(&self, q: f64) -> f64 {
        self.rotate_if_expired();
        self.sketch.quantile(q)
    }

    /// Read every statistic, with one estimate per configured quantile.
    pub fn snapshot(&self) -> DistributionSnapshot {
        self.rotate_if_expired();
        let count = self.count();
        let total = self.total_amount();
        let digest = self.sketch.snapshot();
        DistributionSnapshot {
            count,
            total,
            max: self.max(),
            mean: if count == 0 {
                f64::NAN
            } else {
                total / count as f64
            },
            quantiles: self
                .quantiles
                .iter()
                .map(|quantile| ValueAtQuantile {
                    quantile,
                    value: digest.quantile(quantile).unwrap_or(f64::NAN),
                })
                .collect(),
        }
    }

    /// The identity of this summary
    pub fn id(&self) -> &MeterId {
        &self.id
    }

    /// The quantiles reported by [`snapshot`](Self::snapshot) and [`Meter::measure`]
    pub fn quantile_spec(&self) -> &QuantileSpec {
        &self.quantiles
    }

    /// The effective configuration, after invalid fields were replaced by defaults
    pub fn config(&self) -> &DistributionConfig {
        &self.config
    }

    /// The effective sketch configuration
    pub fn sketch_config(&self) -> &SketchConfig {
        self.sketch.config()
    }

    fn rotate_if_expired(&self) {
        if let Some(window) = &self.window
            && window.try_rotate()
        {
            tracing::debug!(meter = %self.id, "decay window rotated, resetting quantile sketch");
            self.sketch.reset();
        }
    }
}

impl Meter for DistributionSummary {
    fn id(&self) -> &MeterId {
        &self.id
    }

    fn meter_type(&self) -> MeterType {
        MeterType::DistributionSummary
    }

    fn measure(&self) -> Vec<Measurement> {
        let snapshot = self.snapshot();
        let mut measurements = Vec::with_capacity(4 + snapshot.quantiles.len());
        measurements.push(Measurement::new(Statistic::Count, snapshot.count as f64));
        measurements.push(Measurement::new(Statistic::TotalAmount, snapshot.total));
        measurements.push(Measurement::new(Statistic::Max, snapshot.max));
        measurements.push(Measurement::new(Statistic::Mean, snapshot.mean));
        measurements.extend(
            snapshot
                .quantiles
                .iter()
                .map(|v| Measurement::new(Statistic::Quantile(v.quantile), v.value)),
        );
        measurements
    }
}

/// Tracks when the quantile sketch was last reset.
///
/// Rotation is decided with a compare-exchange on the window start, so exactly one caller resets
/// the sketch per elapsed window and recorders never take a lock for it.
struct DecayWindow {
    length: Duration,
    time_source: TimeSource,
    origin: Instant,
    // nanoseconds from `origin` to the start of the current window
    started: AtomicU64,
}

impl DecayWindow {
    fn new(length: Duration, time_source: TimeSource) -> Self {
        Self {
            length,
            origin: time_source.instant(),
            time_source,
            started: AtomicU64::new(0),
        }
    }

    /// Returns true if the current window has elapsed and this caller started the next one.
    fn try_rotate(&self) -> bool {
        let now = nanos(
            self.time_source
                .instant()
                .saturating_duration_since(self.origin),
        );
        let started = self.started.load(Ordering::Acquire);
        if now.saturating_sub(started) < nanos(self.length) {
            return false;
        }
        self.started
            .compare_exchange(started, now, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

fn nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
