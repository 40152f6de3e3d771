// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::Duration;

use meterkit_core::{CowStr, MeterId, QuantileSpec, Tag, Tags};
use meterkit_sketch::SketchConfig;

use crate::timesource::TimeSource;
use crate::{DistributionConfig, DistributionSummary, Registry, RegistryError};

/// Collects the identity and configuration of a [`DistributionSummary`].
///
/// Every setter overwrites: a second call to [`quantiles`](Self::quantiles) replaces the first spec
/// rather than merging with it, and a tag whose key is already present replaces the existing value.
///
/// The builder is only a description. [`create`](Self::create) builds a new, independent summary
/// each time it is called, and [`register`](Self::register) returns the one summary a
/// [`Registry`] holds for the builder's [`MeterId`].
///
/// ```
/// use meterkit::{DistributionSummary, QuantileSpec};
///
/// let builder = DistributionSummary::builder("payload.bytes")
///     .tag("operation", "GetItem")
///     .tag("operation", "PutItem")
///     .quantiles(QuantileSpec::new([0.5]).unwrap())
///     .quantiles(QuantileSpec::new([0.9, 0.99]).unwrap());
///
/// let summary = builder.create();
/// assert_eq!(summary.id().to_string(), "payload.bytes{operation=PutItem}");
/// assert_eq!(summary.quantile_spec().iter().collect::<Vec<_>>(), vec![0.9, 0.99]);
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct Builder {
    name: CowStr,
    tags: Tags,
    quantiles: QuantileSpec,
    config: DistributionConfig,
    time_source: TimeSource,
}

impl Builder {
    /// Start declaring a summary named `name`, with no tags, no quantiles and the default
    /// configuration.
    pub fn new(name: impl Into<CowStr>) -> Self {
        Self {
            name: name.into(),
            tags: Tags::empty(),
            quantiles: QuantileSpec::empty(),
            config: DistributionConfig::default(),
            time_source: TimeSource::default(),
        }
    }

    /// Set the quantiles reported by the summary, replacing any previously set.
    pub fn quantiles(mut self, quantiles: QuantileSpec) -> Self {
        self.quantiles_mut(quantiles);
        self
    }

    /// Set the quantiles reported by the summary, replacing any previously set.
    pub fn quantiles_mut(&mut self, quantiles: QuantileSpec) -> &mut Self {
        self.quantiles = quantiles;
        self
    }

    /// Add a tag. A tag already present under `key` is replaced.
    pub fn tag(mut self, key: impl Into<CowStr>, value: impl Into<CowStr>) -> Self {
        self.tag_mut(key, value);
        self
    }

    /// Add a tag. A tag already present under `key` is replaced.
    pub fn tag_mut(&mut self, key: impl Into<CowStr>, value: impl Into<CowStr>) -> &mut Self {
        self.tags.insert(Tag::new(key, value));
        self
    }

    /// Add tags in order, as if by calling [`tag`](Self::tag) for each. When a key repeats, the
    /// last value wins.
    pub fn tags<T: Into<Tag>>(mut self, tags: impl IntoIterator<Item = T>) -> Self {
        self.tags.extend(tags);
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: DistributionConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the sketch configuration
    pub fn sketch_config(mut self, sketch: SketchConfig) -> Self {
        self.config.sketch = sketch;
        self
    }

    /// Only keep amounts recorded in the last `expiry` in the quantile sketch.
    ///
    /// See [`DistributionConfig::expiry`].
    pub fn expiry(mut self, expiry: Duration) -> Self {
        self.config.expiry = Some(expiry);
        self
    }

    /// Read time for the decay window from `time_source` instead of the system clock
    pub fn time_source(mut self, time_source: TimeSource) -> Self {
        self.time_source = time_source;
        self
    }

    /// The name of the summary
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The identity of the summaries this builder creates
    pub fn id(&self) -> MeterId {
        MeterId::new(self.name.clone(), self.tags.clone())
    }

    /// Build a new summary from the current configuration.
    ///
    /// Each call returns a fresh summary with its own state. Use [`register`](Self::register) to
    /// share one summary between recorders.
    pub fn create(&self) -> DistributionSummary {
        DistributionSummary::new(
            self.id(),
            self.quantiles.clone(),
            self.config,
            self.time_source.clone(),
        )
    }

    /// Get the summary `registry` holds for this builder's identity, creating it if needed.
    pub fn register(&self, registry: &Registry) -> Result<Arc<DistributionSummary>, RegistryError> {
        registry.summary(self)
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use super::*;

    #[test]
    fn tag_overwrites() {
        let summary = Builder::new("sizes").tag("k", "a").tag("k", "b").create();
        let tags: Vec<(&str, &str)> = summary
            .id()
            .tags()
            .iter()
            .map(|t| (t.key(), t.value()))
            .collect();
        check!(tags == vec![("k", "b")]);
    }

    #[test]
    fn tags_later_entries_win() {
        let builder = Builder::new("sizes")
            .tag("region", "us-east-1")
            .tags([("k", "1"), ("region", "eu-west-1"), ("k", "2")]);
        let id = builder.id();
        check!(id.tags().len() == 2);
        check!(id.tag("k") == Some("2"));
        check!(id.tag("region") == Some("eu-west-1"));
    }

    #[test]
    fn quantiles_last_write_wins() {
        let builder = Builder::new("sizes")
            .quantiles(QuantileSpec::new([0.5, 0.75]).unwrap())
            .quantiles(QuantileSpec::new([0.99]).unwrap());
        let summary = builder.create();
        check!(summary.quantile_spec().iter().collect::<Vec<_>>() == vec![0.99]);
    }

    #[test]
    fn mutable_setters() {
        let mut builder = Builder::new("sizes");
        builder
            .tag_mut("k", "a")
            .quantiles_mut(QuantileSpec::new([0.5]).unwrap());
        for shard in ["a", "b"] {
            builder.tag_mut("shard", shard);
        }
        let id = builder.id();
        check!(id.to_string() == "sizes{k=a,shard=b}");
    }

    #[test]
    fn create_returns_independent_summaries() {
        let builder = Builder::new("sizes").tag("k", "v");
        let first = builder.create();
        let second = builder.create();
        first.record(10.0);
        check!(first.count() == 1);
        check!(second.count() == 0);
        check!(first.id() == second.id());
    }

    #[test]
    fn builder_is_a_snapshot() {
        let builder = Builder::new("sizes").tag("k", "a");
        let summary = builder.create();
        let builder = builder.tag("k", "b");
        check!(summary.id().tag("k") == Some("a"));
        check!(builder.id().tag("k") == Some("b"));
    }

    #[test]
    fn sketch_config_is_sanitized() {
        let summary = Builder::new("sizes")
            .sketch_config(SketchConfig {
                compression: 50.0,
                shards: 0,
                insert_buffer: None,
            })
            .create();
        check!(summary.sketch_config().compression == 50.0);
        check!(summary.sketch_config().shards >= 1);
    }
}
