// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

/// An estimated value at a configured quantile
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ValueAtQuantile {
    /// The requested rank, in `(0, 1)`
    pub quantile: f64,
    /// The estimated value at that rank. NaN when nothing has been recorded.
    pub value: f64,
}

/// A point-in-time view of a [`DistributionSummary`](crate::DistributionSummary), for exporters.
///
/// Quantile estimates are all taken from a single sketch snapshot. The counters are read
/// separately and may include a few observations the sketch had not yet seen.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DistributionSnapshot {
    /// Number of recorded amounts
    pub count: u64,
    /// Sum of recorded amounts
    pub total: f64,
    /// Largest recorded amount, 0 when empty
    pub max: f64,
    /// `total / count`, NaN when empty
    pub mean: f64,
    /// One entry per configured quantile, in ascending order
    pub quantiles: Vec<ValueAtQuantile>,
}

impl DistributionSnapshot {
    /// The estimate for `quantile`, if it was one of the configured quantiles
    pub fn value_at(&self, quantile: f64) -> Option<f64> {
        self.quantiles
            .iter()
            .find(|v| v.quantile == quantile)
            .map(|v| v.value)
    }
}
