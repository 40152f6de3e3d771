// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use meterkit_sketch::SketchConfig;

/// Configuration of a [`DistributionSummary`](crate::DistributionSummary).
///
/// Can be loaded from an application config file. `expiry` is given in seconds:
///
/// ```
/// use meterkit::DistributionConfig;
/// use std::time::Duration;
///
/// let config: DistributionConfig = toml::from_str(r#"
///     expiry = 60
///
///     [sketch]
///     compression = 50.0
/// "#).unwrap();
/// assert_eq!(config.expiry, Some(Duration::from_secs(60)));
/// assert_eq!(config.sketch.compression, 50.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
pub struct DistributionConfig {
    /// Configuration of the underlying quantile sketch
    pub sketch: SketchConfig,

    /// Length of the decay window.
    ///
    /// When set, quantiles describe only the amounts recorded since the window last rotated. Count,
    /// total and max are never reset. When unset, quantiles cover the whole lifetime of the summary.
    #[cfg_attr(feature = "serde", serde(with = "expiry_secs"))]
    pub expiry: Option<Duration>,
}

#[cfg(feature = "serde")]
mod expiry_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub(super) fn serialize<S: Serializer>(
        expiry: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match expiry {
            Some(expiry) => serializer.serialize_some(&expiry.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(|secs| {
                Duration::try_from_secs_f64(secs)
                    .map_err(|_| D::Error::custom(format!("invalid expiry {secs}, expected seconds")))
            })
            .transpose()
    }
}
