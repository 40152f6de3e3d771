// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Merging t-digest.
//!
//! Values are appended to an insert buffer. When the buffer fills up it is sorted together with the
//! existing centroids and the combined list is compressed by greedily merging neighbours as long as
//! the merged cluster spans at most one unit of the arcsine scale function
//! `k(q) = compression * (asin(2q - 1) / π + 1/2)`. Because `k` is steep near `q = 0` and `q = 1`,
//! clusters at the tails stay small (often single values) while clusters around the median grow.
//!
//! # Error bound
//!
//! Any two adjacent centroids together span more than one unit of `k`, so a compressed digest holds
//! at most `2 * compression + 1` centroids. The rank error of an estimate at rank `q` is bounded by
//! half the width of the cluster covering `q`, roughly `π * sqrt(q * (1 - q)) / (2 * compression)`:
//! about `1.6 / compression` at the median and shrinking towards zero at the tails. The minimum and
//! maximum are tracked exactly. The same bound holds, up to the usual constant factors of the
//! algorithm, whatever the order of insertion and for digests obtained by merging.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::f64::consts::PI;

use crate::{MAX_COMPRESSION, MAX_INSERT_BUFFER};

/// A cluster of values summarised by their mean and count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Centroid {
    mean: f64,
    weight: u64,
}

impl Centroid {
    /// Create a new centroid
    pub fn new(mean: f64, weight: u64) -> Self {
        Self { mean, weight }
    }

    /// Mean of the values in this cluster
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Number of values in this cluster
    pub fn weight(&self) -> u64 {
        self.weight
    }

    fn absorb(&mut self, other: &Centroid) {
        let weight = self.weight.saturating_add(other.weight);
        // incremental form keeps the mean within [self.mean, other.mean]
        self.mean += (other.mean - self.mean) * (other.weight as f64 / weight as f64);
        self.weight = weight;
    }

    fn total_cmp(&self, other: &Centroid) -> Ordering {
        self.mean
            .total_cmp(&other.mean)
            .then(self.weight.cmp(&other.weight))
    }
}

/// Single-writer merging t-digest.
///
/// See the [module documentation](self) for the accuracy guarantees. Non-finite values are ignored.
///
/// ```
/// use meterkit_sketch::TDigest;
///
/// let mut digest = TDigest::new(100.0);
/// for i in 1..=1000 {
///     digest.insert(i as f64);
/// }
/// assert_eq!(digest.quantile(0.0), Some(1.0));
/// assert_eq!(digest.quantile(1.0), Some(1000.0));
/// let median = digest.quantile(0.5).unwrap();
/// assert!((median - 500.0).abs() < 10.0);
/// ```
#[derive(Debug, Clone)]
pub struct TDigest {
    compression: f64,
    buffer_capacity: usize,
    // sorted by mean
    centroids: Vec<Centroid>,
    buffer: Vec<Centroid>,
    count: u64,
    min: f64,
    max: f64,
}

impl Default for TDigest {
    fn default() -> Self {
        Self::new(crate::DEFAULT_COMPRESSION)
    }
}

impl TDigest {
    /// Create a digest with the given compression and an insert buffer of `2 * compression` values.
    ///
    /// # Panics
    ///
    /// Panics if `compression` is not in `(0, MAX_COMPRESSION]`.
    pub fn new(compression: f64) -> Self {
        Self::with_buffer_capacity(compression, default_buffer_capacity(compression))
    }

    /// Create a digest with an explicit insert buffer size.
    ///
    /// # Panics
    ///
    /// Panics if `compression` is not in `(0, MAX_COMPRESSION]`, or if `buffer_capacity` is not in
    /// `1..=MAX_INSERT_BUFFER`.
    pub fn with_buffer_capacity(compression: f64, buffer_capacity: usize) -> Self {
        assert!(
            compression > 0.0 && compression <= MAX_COMPRESSION,
            "compression must be in (0, {MAX_COMPRESSION}], got {compression}"
        );
        assert!(
            (1..=MAX_INSERT_BUFFER).contains(&buffer_capacity),
            "buffer capacity must be in 1..={MAX_INSERT_BUFFER}, got {buffer_capacity}"
        );
        Self {
            compression,
            buffer_capacity,
            centroids: Vec::with_capacity(max_centroids(compression)),
            buffer: Vec::with_capacity(buffer_capacity),
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// The compression parameter
    pub fn compression(&self) -> f64 {
        self.compression
    }

    /// Number of values buffered before compression kicks in
    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }

    /// Add a single value
    pub fn insert(&mut self, value: f64) {
        self.insert_many(value, 1);
    }

    /// Add `weight` occurrences of `value`. The total count saturates at `u64::MAX`.
    pub fn insert_many(&mut self, value: f64, weight: u64) {
        if weight == 0 || !value.is_finite() {
            return;
        }
        self.buffer.push(Centroid::new(value, weight));
        self.count = self.count.saturating_add(weight);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        if self.buffer.len() >= self.buffer_capacity {
            self.compress();
        }
    }

    /// Fold `other` into this digest.
    ///
    /// The result describes the union of both streams and keeps this digest's compression.
    pub fn merge(&mut self, other: &TDigest) {
        if other.count == 0 {
            return;
        }
        self.buffer.extend_from_slice(&other.centroids);
        self.buffer.extend_from_slice(&other.buffer);
        self.count = self.count.saturating_add(other.count);
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.compress();
    }

    /// Fold all buffered values into the centroids
    pub fn compress(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let mut sorted = std::mem::take(&mut self.buffer);
        sorted.append(&mut self.centroids);
        sorted.sort_unstable_by(Centroid::total_cmp);
        compress_sorted(&sorted, self.count, self.compression, &mut self.centroids);
        sorted.clear();
        // hand the allocation back to the buffer
        self.buffer = sorted;
    }

    /// Remove all values
    pub fn clear(&mut self) {
        self.centroids.clear();
        self.buffer.clear();
        self.count = 0;
        self.min = f64::INFINITY;
        self.max = f64::NEG_INFINITY;
    }

    /// Total weight of all inserted values
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns true if nothing was inserted
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Smallest inserted value
    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    /// Largest inserted value
    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }

    /// The compressed centroids, including the effect of any buffered values.
    ///
    /// Borrows when nothing is buffered, otherwise compresses a copy.
    pub fn centroids(&self) -> Cow<'_, [Centroid]> {
        if self.buffer.is_empty() {
            return Cow::Borrowed(&self.centroids);
        }
        let mut sorted = Vec::with_capacity(self.centroids.len() + self.buffer.len());
        sorted.extend_from_slice(&self.centroids);
        sorted.extend_from_slice(&self.buffer);
        sorted.sort_unstable_by(Centroid::total_cmp);
        let mut compressed = Vec::with_capacity(max_centroids(self.compression));
        compress_sorted(&sorted, self.count, self.compression, &mut compressed);
        Cow::Owned(compressed)
    }

    /// Estimate the value at rank `q`.
    ///
    /// `q` is clamped to `[0, 1]`; `q = 0` returns the minimum and `q = 1` the maximum. Returns `None`
    /// if the digest is empty or `q` is NaN.
    pub fn quantile(&self, q: f64) -> Option<f64> {
        if self.count == 0 || q.is_nan() {
            return None;
        }
        let q = q.clamp(0.0, 1.0);
        if q == 0.0 {
            return Some(self.min);
        }
        if q == 1.0 {
            return Some(self.max);
        }
        let centroids = self.centroids();
        let count = self.count as f64;
        let target = q * count;

        // piecewise linear through (0, min), (midpoint rank of each centroid, mean), (count, max)
        let mut prev_rank = 0.0;
        let mut prev_value = self.min;
        let mut cumulative = 0.0;
        for centroid in centroids.iter() {
            let mid_rank = cumulative + centroid.weight as f64 / 2.0;
            if target < mid_rank {
                return Some(interpolate(
                    target,
                    (prev_rank, prev_value),
                    (mid_rank, centroid.mean),
                ));
            }
            cumulative += centroid.weight as f64;
            prev_rank = mid_rank;
            prev_value = centroid.mean;
        }
        Some(interpolate(
            target,
            (prev_rank, prev_value),
            (count, self.max),
        ))
    }

    /// Estimate the fraction of values less than or equal to `value` (the CDF).
    ///
    /// Returns `None` if the digest is empty or `value` is NaN.
    pub fn rank(&self, value: f64) -> Option<f64> {
        if self.count == 0 || value.is_nan() {
            return None;
        }
        // checked before min so that a single-valued digest reports 1 at its only value
        if value >= self.max {
            return Some(1.0);
        }
        if value < self.min {
            return Some(0.0);
        }
        let centroids = self.centroids();
        let count = self.count as f64;

        let mut prev_rank = 0.0;
        let mut prev_value = self.min;
        let mut cumulative = 0.0;
        for centroid in centroids.iter() {
            let mid_rank = cumulative + centroid.weight as f64 / 2.0;
            if value < centroid.mean {
                let rank = interpolate(value, (prev_value, prev_rank), (centroid.mean, mid_rank));
                return Some(rank / count);
            }
            cumulative += centroid.weight as f64;
            prev_rank = mid_rank;
            prev_value = centroid.mean;
        }
        let rank = interpolate(value, (prev_value, prev_rank), (self.max, count));
        Some((rank / count).clamp(0.0, 1.0))
    }
}

fn default_buffer_capacity(compression: f64) -> usize {
    ((compression * 2.0).ceil() as usize).max(1)
}

fn max_centroids(compression: f64) -> usize {
    (2.0 * compression.ceil()) as usize + 1
}

/// Linear interpolation at `x` between `(x0, y0)` and `(x1, y1)`, returning `y0` on a degenerate
/// segment.
fn interpolate(x: f64, (x0, y0): (f64, f64), (x1, y1): (f64, f64)) -> f64 {
    let width = x1 - x0;
    if width <= 0.0 {
        return y0;
    }
    let t = ((x - x0) / width).clamp(0.0, 1.0);
    y0 + t * (y1 - y0)
}

fn scale(q: f64, compression: f64) -> f64 {
    // clamp: drift in q can push the asin argument just past ±1
    let x = (2.0 * q - 1.0).clamp(-1.0, 1.0);
    compression * (x.asin() / PI + 0.5)
}

/// Greedily merge `sorted` into `out` so that no cluster spans more than one unit of [`scale`].
fn compress_sorted(sorted: &[Centroid], total: u64, compression: f64, out: &mut Vec<Centroid>) {
    out.clear();
    let Some((first, rest)) = sorted.split_first() else {
        return;
    };
    let total = total as f64;
    let mut current = *first;
    let mut weight_before = 0u64;
    let mut k_start = scale(0.0, compression);
    for centroid in rest {
        let proposed = weight_before
            .saturating_add(current.weight)
            .saturating_add(centroid.weight) as f64
            / total;
        if scale(proposed, compression) - k_start <= 1.0 {
            current.absorb(centroid);
        } else {
            weight_before = weight_before.saturating_add(current.weight);
            k_start = scale(weight_before as f64 / total, compression);
            out.push(current);
            current = *centroid;
        }
    }
    out.push(current);
}
