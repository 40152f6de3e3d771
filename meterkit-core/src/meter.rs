// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use crate::MeterId;

/// The kind of a meter, reported to exporters alongside its measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[non_exhaustive]
pub enum MeterType {
    /// A monotonically increasing count
    Counter,
    /// A value sampled at read time
    Gauge,
    /// A distribution of durations
    Timer,
    /// A distribution of magnitudes
    DistributionSummary,
    /// Anything else
    Other,
}

/// What a [`Measurement`] describes.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Statistic {
    /// Number of recorded observations
    Count,
    /// Sum of all recorded observations
    TotalAmount,
    /// Largest recorded observation
    Max,
    /// Arithmetic mean of recorded observations
    Mean,
    /// Estimated value at the given rank
    Quantile(f64),
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statistic::Count => f.write_str("count"),
            Statistic::TotalAmount => f.write_str("total"),
            Statistic::Max => f.write_str("max"),
            Statistic::Mean => f.write_str("mean"),
            Statistic::Quantile(q) => write!(f, "quantile({q})"),
        }
    }
}

/// A single value read from a meter.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Measurement {
    /// What the value describes
    pub statistic: Statistic,
    /// The value
    pub value: f64,
}

impl Measurement {
    /// Create a new measurement
    pub fn new(statistic: Statistic, value: f64) -> Self {
        Self { statistic, value }
    }
}

/// The capability every meter exposes to exporters: its identity and a snapshot of its values.
///
/// Reading measurements never resets a meter.
pub trait Meter {
    /// The identity of this meter
    fn id(&self) -> &MeterId;

    /// The kind of meter
    fn meter_type(&self) -> MeterType;

    /// Read the current values of this meter
    fn measure(&self) -> Vec<Measurement>;
}

impl<M: Meter + ?Sized> Meter for std::sync::Arc<M> {
    fn id(&self) -> &MeterId {
        (**self).id()
    }

    fn meter_type(&self) -> MeterType {
        (**self).meter_type()
    }

    fn measure(&self) -> Vec<Measurement> {
        (**self).measure()
    }
}
