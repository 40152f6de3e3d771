// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

/// Default t-digest compression
pub const DEFAULT_COMPRESSION: f64 = 100.0;

/// Largest accepted compression. Memory grows linearly with compression.
pub const MAX_COMPRESSION: f64 = 10_000.0;

/// Largest accepted shard count
pub const MAX_SHARDS: usize = 256;

/// Largest accepted per-shard insert buffer, twice [`MAX_COMPRESSION`]
pub const MAX_INSERT_BUFFER: usize = 2 * MAX_COMPRESSION as usize;

// default shard count never exceeds this, however many cores the machine has
const MAX_DEFAULT_SHARDS: usize = 16;

/// Configuration of a [`SampleSketch`](crate::SampleSketch).
///
/// All fields have defaults, so a configuration can be deserialized from a partial table:
///
/// ```
/// use meterkit_sketch::SketchConfig;
///
/// let config: SketchConfig = toml::from_str("compression = 200.0").unwrap();
/// assert_eq!(config.compression, 200.0);
/// assert_eq!(config.buffer_capacity(), 400);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
pub struct SketchConfig {
    /// t-digest compression. Higher values keep more centroids and give more accurate estimates.
    ///
    /// Defaults to [`DEFAULT_COMPRESSION`].
    pub compression: f64,

    /// Number of independently locked digests writers are spread over.
    ///
    /// Defaults to the available parallelism rounded up to a power of two, at most 16.
    pub shards: usize,

    /// Number of values each shard buffers before compressing.
    ///
    /// Defaults to twice the compression when unset. At most [`MAX_INSERT_BUFFER`].
    pub insert_buffer: Option<usize>,
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            compression: DEFAULT_COMPRESSION,
            shards: default_shards(),
            insert_buffer: None,
        }
    }
}

fn valid_insert_buffer(size: usize) -> bool {
    (1..=MAX_INSERT_BUFFER).contains(&size)
}

fn default_shards() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .next_power_of_two()
        .min(MAX_DEFAULT_SHARDS)
}

impl SketchConfig {
    /// Effective insert buffer size per shard
    pub fn buffer_capacity(&self) -> usize {
        self.insert_buffer
            .unwrap_or_else(|| (self.compression * 2.0).ceil() as usize)
            .max(1)
    }

    /// Check every field, returning the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.compression.is_finite()
            && self.compression > 0.0
            && self.compression <= MAX_COMPRESSION)
        {
            return Err(ConfigError::Compression(self.compression));
        }
        if self.shards == 0 || self.shards > MAX_SHARDS {
            return Err(ConfigError::Shards(self.shards));
        }
        if let Some(size) = self.insert_buffer
            && !valid_insert_buffer(size)
        {
            return Err(ConfigError::InsertBuffer(size));
        }
        Ok(())
    }

    /// Replace every invalid field with its default, logging a warning for each.
    ///
    /// Sketches are always built from sanitized configurations so that construction cannot fail.
    pub fn sanitized(self) -> Self {
        let defaults = SketchConfig::default();
        let mut config = self;
        if !(config.compression.is_finite()
            && config.compression > 0.0
            && config.compression <= MAX_COMPRESSION)
        {
            tracing::warn!(
                compression = config.compression,
                default = defaults.compression,
                "invalid sketch compression, using default"
            );
            config.compression = defaults.compression;
        }
        if config.shards == 0 || config.shards > MAX_SHARDS {
            tracing::warn!(
                shards = config.shards,
                default = defaults.shards,
                "invalid sketch shard count, using default"
            );
            config.shards = defaults.shards;
        }
        if let Some(size) = config.insert_buffer
            && !valid_insert_buffer(size)
        {
            tracing::warn!(
                insert_buffer = size,
                max = MAX_INSERT_BUFFER,
                "invalid sketch insert buffer, using default"
            );
            config.insert_buffer = None;
        }
        config
    }
}

/// An invalid [`SketchConfig`] field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// Compression is not finite or not in `(0, MAX_COMPRESSION]`
    Compression(f64),
    /// Shard count is not in `1..=MAX_SHARDS`
    Shards(usize),
    /// Insert buffer size is not in `1..=MAX_INSERT_BUFFER`
    InsertBuffer(usize),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Compression(c) => write!(
                f,
                "compression must be finite and in (0, {MAX_COMPRESSION}], got {c}"
            ),
            ConfigError::Shards(s) => {
                write!(f, "shard count must be in 1..={MAX_SHARDS}, got {s}")
            }
            ConfigError::InsertBuffer(b) => {
                write!(f, "insert buffer must be in 1..={MAX_INSERT_BUFFER}, got {b}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use assert2::check;
    use rstest::rstest;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SketchConfig::default();
        check!(config.validate() == Ok(()));
        check!(config.shards.is_power_of_two());
        check!(config.shards <= 16);
        check!(config.buffer_capacity() == 200);
    }

    #[rstest]
    #[case(SketchConfig { compression: 0.0, ..Default::default() }, ConfigError::Compression(0.0))]
    #[case(SketchConfig { compression: -5.0, ..Default::default() }, ConfigError::Compression(-5.0))]
    #[case(SketchConfig { compression: 1e9, ..Default::default() }, ConfigError::Compression(1e9))]
    #[case(SketchConfig { shards: 0, ..Default::default() }, ConfigError::Shards(0))]
    #[case(SketchConfig { shards: 1000, ..Default::default() }, ConfigError::Shards(1000))]
    #[case(SketchConfig { insert_buffer: Some(0), ..Default::default() }, ConfigError::InsertBuffer(0))]
    #[case(SketchConfig { insert_buffer: Some(20_001), ..Default::default() }, ConfigError::InsertBuffer(20_001))]
    #[case(SketchConfig { insert_buffer: Some(usize::MAX), ..Default::default() }, ConfigError::InsertBuffer(usize::MAX))]
    fn invalid_fields(#[case] config: SketchConfig, #[case] expected: ConfigError) {
        check!(config.validate() == Err(expected));
        check!(config.sanitized().validate() == Ok(()));
    }

    #[test]
    fn sanitized_keeps_valid_fields() {
        let config = SketchConfig {
            compression: f64::NAN,
            shards: 3,
            insert_buffer: Some(64),
        }
        .sanitized();
        check!(config.compression == DEFAULT_COMPRESSION);
        check!(config.shards == 3);
        check!(config.buffer_capacity() == 64);
    }

    #[test]
    fn error_messages() {
        check!(ConfigError::Shards(0).to_string() == "shard count must be in 1..=256, got 0");
        check!(
            ConfigError::InsertBuffer(0).to_string() == "insert buffer must be in 1..=20000, got 0"
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize() {
        let config: SketchConfig =
            serde_json::from_str(r#"{"compression": 50.0, "shards": 2, "insert_buffer": 10}"#)
                .unwrap();
        check!(config.compression == 50.0);
        check!(config.shards == 2);
        check!(config.buffer_capacity() == 10);

        check!(serde_json::from_str::<SketchConfig>(r#"{"compresion": 50.0}"#).is_err());
        let config: SketchConfig = toml::from_str("shards = 4").unwrap();
        check!(config.compression == DEFAULT_COMPRESSION);
        check!(config.shards == 4);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn oversized_insert_buffer_is_replaced() {
        let config: SketchConfig =
            serde_json::from_str(r#"{"insert_buffer": 18446744073709551615}"#).unwrap();
        check!(config.validate() == Err(ConfigError::InsertBuffer(usize::MAX)));
        let config = config.sanitized();
        check!(config.insert_buffer == None);
        check!(config.buffer_capacity() == 200);
        // constructing a sketch from it must not try to allocate the requested buffer
        let sketch = crate::SampleSketch::new(config);
        sketch.insert(1.0);
        check!(sketch.count() == 1);
    }
}
