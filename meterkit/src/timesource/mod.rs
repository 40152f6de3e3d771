// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Clock used by summaries with a decay window.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

/// Module containing fake time sources for testing
///
/// To enable this module, you must enable the `test-util` feature.
#[cfg(feature = "test-util")]
pub mod fakes;

/// Trait for providing custom time sources
pub trait Time: Send + Sync + Debug {
    /// Get the current instant
    fn instant(&self) -> Instant;
}

/// Where a summary reads the current time from.
///
/// Defaults to the system monotonic clock.
#[derive(Clone, Default)]
pub enum TimeSource {
    /// [`Instant::now`]
    #[default]
    System,
    /// A custom [`Time`] implementation
    Custom(Arc<dyn Time>),
}

impl Debug for TimeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "TimeSource::System"),
            Self::Custom(_) => write!(f, "TimeSource::Custom(...)"),
        }
    }
}

impl TimeSource {
    /// Create a time source backed by a custom [`Time`] implementation
    pub fn custom(time: impl Time + 'static) -> Self {
        Self::Custom(Arc::new(time))
    }

    /// The current instant according to this source
    pub fn instant(&self) -> Instant {
        match self {
            Self::System => Instant::now(),
            Self::Custom(time) => time.instant(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert2::check;

    use super::*;

    #[derive(Debug)]
    struct Fixed(Instant);

    impl Time for Fixed {
        fn instant(&self) -> Instant {
            self.0
        }
    }

    #[test]
    fn custom_source_is_used() {
        let at = Instant::now() + Duration::from_secs(3600);
        let ts = TimeSource::custom(Fixed(at));
        check!(ts.instant() == at);
        check!(format!("{ts:?}") == "TimeSource::Custom(...)");
    }

    #[test]
    fn system_source_moves_forward() {
        let ts = TimeSource::default();
        let first = ts.instant();
        check!(ts.instant() >= first);
    }
}
