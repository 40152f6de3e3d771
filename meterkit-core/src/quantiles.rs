// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use ordered_float::OrderedFloat;
use smallvec::SmallVec;

/// Error returned when a requested quantile is not in the open interval `(0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidQuantile(pub f64);

impl fmt::Display for InvalidQuantile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "quantile {} is not in the open interval (0, 1)", self.0)
    }
}

impl std::error::Error for InvalidQuantile {}

/// The ordered set of quantiles a distribution summary reports.
///
/// Values are sorted ascending with duplicates removed. Every value lies strictly between 0 and 1:
/// the extremes are always available through the summary's max and the sketch's min, so requesting
/// them as quantiles is rejected.
///
/// ```
/// use meterkit_core::QuantileSpec;
///
/// let spec = QuantileSpec::new([0.99, 0.5, 0.95, 0.5]).unwrap();
/// assert_eq!(spec.iter().collect::<Vec<_>>(), vec![0.5, 0.95, 0.99]);
/// assert!(QuantileSpec::new([1.0]).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QuantileSpec {
    quantiles: SmallVec<[OrderedFloat<f64>; 4]>,
}

impl QuantileSpec {
    /// A spec requesting no quantiles
    pub const fn empty() -> Self {
        Self {
            quantiles: SmallVec::new_const(),
        }
    }

    /// Build a spec from the given quantiles.
    ///
    /// Fails with the first value that is NaN or outside `(0, 1)`.
    pub fn new(quantiles: impl IntoIterator<Item = f64>) -> Result<Self, InvalidQuantile> {
        let mut values = SmallVec::<[OrderedFloat<f64>; 4]>::new();
        for q in quantiles {
            if !(q > 0.0 && q < 1.0) {
                return Err(InvalidQuantile(q));
            }
            values.push(OrderedFloat(q));
        }
        values.sort_unstable();
        values.dedup();
        Ok(Self { quantiles: values })
    }

    /// Iterate over the quantiles in ascending order
    pub fn iter(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
        self.quantiles.iter().map(|q| q.into_inner())
    }

    /// Returns true if `q` is part of this spec
    pub fn contains(&self, q: f64) -> bool {
        self.quantiles.binary_search(&OrderedFloat(q)).is_ok()
    }

    /// Number of quantiles
    pub fn len(&self) -> usize {
        self.quantiles.len()
    }

    /// Returns true if no quantile is requested
    pub fn is_empty(&self) -> bool {
        self.quantiles.is_empty()
    }
}

impl TryFrom<Vec<f64>> for QuantileSpec {
    type Error = InvalidQuantile;

    fn try_from(value: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&[f64]> for QuantileSpec {
    type Error = InvalidQuantile;

    fn try_from(value: &[f64]) -> Result<Self, Self::Error> {
        Self::new(value.iter().copied())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for QuantileSpec {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for QuantileSpec {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = Vec::<f64>::deserialize(deserializer)?;
        Self::new(values).map_err(serde::de::Error::custom)
    }
}
