// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod builder;
mod config;
mod registry;
mod snapshot;
mod sum;
mod summary;
pub mod timesource;

#[cfg(feature = "metrics-rs-024")]
#[cfg_attr(docsrs, doc(cfg(feature = "metrics-rs-024")))]
pub mod metrics_rs;

pub use builder::Builder;
pub use config::DistributionConfig;
pub use registry::{Registry, RegistryError};
pub use snapshot::{DistributionSnapshot, ValueAtQuantile};
pub use summary::DistributionSummary;

pub use meterkit_core::{
    CowStr, InvalidQuantile, Measurement, Meter, MeterId, MeterType, QuantileSpec, Statistic, Tag,
    Tags,
};
pub use meterkit_sketch::{SampleSketch, SketchConfig, TDigest};
