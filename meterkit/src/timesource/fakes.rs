// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::Time;

/// A clock that only moves when told to.
///
/// Clones share the same clock, so a test can keep one handle and give another to a summary.
///
/// ```
/// use meterkit::timesource::{TimeSource, fakes::ManualTime};
/// use std::time::Duration;
///
/// let clock = ManualTime::new();
/// let ts = TimeSource::custom(clock.clone());
/// let start = ts.instant();
/// clock.advance(Duration::from_secs(5));
/// assert_eq!(ts.instant() - start, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct ManualTime(Arc<Mutex<Instant>>);

impl Default for ManualTime {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualTime {
    /// Create a clock stopped at the current instant
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(Instant::now())))
    }

    /// Move the clock forward
    pub fn advance(&self, elapsed: Duration) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) += elapsed;
    }
}

impl Time for ManualTime {
    fn instant(&self) -> Instant {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
