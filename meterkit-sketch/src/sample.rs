// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

use crossbeam_utils::CachePadded;

use crate::{SketchConfig, TDigest};

static NEXT_SHARD_HINT: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    // threads are spread round-robin over shards in the order they first record
    static SHARD_HINT: usize = NEXT_SHARD_HINT.fetch_add(1, Ordering::Relaxed);
}

fn shard_hint() -> usize {
    SHARD_HINT.try_with(|hint| *hint).unwrap_or(0)
}

fn lock(shard: &Mutex<TDigest>) -> MutexGuard<'_, TDigest> {
    // a panic while holding the lock cannot leave a digest in a state worse than approximate
    shard.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A concurrent, bounded-memory streaming quantile sketch.
///
/// Writers are spread over a fixed number of [`TDigest`] shards, each behind its own cache-padded
/// lock. A writer first tries the shard assigned to its thread and falls over to the next shard that
/// is not currently held before blocking, so an insert only ever waits for another insert or for a
/// reader copying a single shard.
///
/// Reads copy each shard in turn and merge the copies into a snapshot digest. A snapshot reflects
/// every insert that completed before the read started and possibly some that raced with it.
///
/// Negative, NaN and infinite values are dropped. No operation fails.
///
/// ```
/// use meterkit_sketch::{SampleSketch, SketchConfig};
/// use std::sync::Arc;
///
/// let sketch = Arc::new(SampleSketch::new(SketchConfig::default()));
/// std::thread::scope(|s| {
///     for t in 0..4 {
///         let sketch = sketch.clone();
///         s.spawn(move || {
///             for i in 0..250 {
///                 sketch.insert((t * 250 + i) as f64);
///             }
///         });
///     }
/// });
/// assert_eq!(sketch.count(), 1000);
/// assert_eq!(sketch.quantile(1.0), 999.0);
/// ```
pub struct SampleSketch {
    config: SketchConfig,
    shards: Box<[CachePadded<Mutex<TDigest>>]>,
}

impl Default for SampleSketch {
    fn default() -> Self {
        Self::new(SketchConfig::default())
    }
}

impl fmt::Debug for SampleSketch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleSketch")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SampleSketch {
    /// Create a sketch. Invalid configuration fields are replaced by their defaults.
    pub fn new(config: SketchConfig) -> Self {
        let config = config.sanitized();
        let shards = (0..config.shards)
            .map(|_| {
                CachePadded::new(Mutex::new(TDigest::with_buffer_capacity(
                    config.compression,
                    config.buffer_capacity(),
                )))
            })
            .collect();
        Self { config, shards }
    }

    /// The effective configuration
    pub fn config(&self) -> &SketchConfig {
        &self.config
    }

    /// Add a value. Negative, NaN and infinite values are dropped.
    pub fn insert(&self, value: f64) {
        if !is_recordable(value) {
            tracing::trace!(value, "dropping value the sketch cannot represent");
            return;
        }
        self.lock_for_write().insert(value);
    }

    /// Estimate the value at rank `q` (clamped to `[0, 1]`).
    ///
    /// Returns NaN when nothing has been inserted.
    pub fn quantile(&self, q: f64) -> f64 {
        self.snapshot().quantile(q).unwrap_or(f64::NAN)
    }

    /// Estimate several quantiles from a single snapshot.
    pub fn quantiles(&self, qs: impl IntoIterator<Item = f64>) -> Vec<f64> {
        let snapshot = self.snapshot();
        qs.into_iter()
            .map(|q| snapshot.quantile(q).unwrap_or(f64::NAN))
            .collect()
    }

    /// Estimate the fraction of inserted values less than or equal to `value`.
    ///
    /// Returns NaN when nothing has been inserted.
    pub fn rank(&self, value: f64) -> f64 {
        self.snapshot().rank(value).unwrap_or(f64::NAN)
    }

    /// Merge every shard into one digest describing everything inserted so far.
    pub fn snapshot(&self) -> TDigest {
        let mut merged =
            TDigest::with_buffer_capacity(self.config.compression, self.config.buffer_capacity());
        for shard in self.shards.iter() {
            // copy under the lock, merge outside of it
            let part = lock(shard).clone();
            merged.merge(&part);
        }
        merged.compress();
        merged
    }

    /// Fold the contents of `other` into this sketch.
    ///
    /// `other` is snapshotted first, so merging a sketch into itself doubles every weight rather
    /// than deadlocking.
    pub fn merge(&self, other: &SampleSketch) {
        let snapshot = other.snapshot();
        self.merge_digest(&snapshot);
    }

    /// Fold a digest into this sketch.
    pub fn merge_digest(&self, digest: &TDigest) {
        if digest.is_empty() {
            return;
        }
        self.lock_for_write().merge(digest);
    }

    /// Discard everything inserted so far.
    ///
    /// Shards are cleared one at a time; inserts racing with a reset may or may not survive it.
    pub fn reset(&self) {
        for shard in self.shards.iter() {
            lock(shard).clear();
        }
    }

    /// Number of values held by the sketch
    pub fn count(&self) -> u64 {
        self.shards
            .iter()
            .map(|shard| lock(shard).count())
            .fold(0, u64::saturating_add)
    }

    /// Returns true if the sketch holds no values
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| lock(shard).is_empty())
    }

    fn lock_for_write(&self) -> MutexGuard<'_, TDigest> {
        let len = self.shards.len();
        let start = shard_hint() % len;
        for offset in 0..len {
            match self.shards[(start + offset) % len].try_lock() {
                Ok(guard) => return guard,
                Err(TryLockError::Poisoned(poisoned)) => return poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => continue,
            }
        }
        lock(&self.shards[start])
    }
}

/// Returns true for the values a sketch accepts: finite and not negative.
pub fn is_recordable(value: f64) -> bool {
    value >= 0.0 && value.is_finite()
}
