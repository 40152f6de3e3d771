// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod config;
mod sample;
pub mod tdigest;

pub use config::{
    ConfigError, DEFAULT_COMPRESSION, MAX_COMPRESSION, MAX_INSERT_BUFFER, MAX_SHARDS, SketchConfig,
};
pub use sample::{SampleSketch, is_recordable};
pub use tdigest::{Centroid, TDigest};
