// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod id;
mod meter;
mod quantiles;
mod tag;

pub use id::MeterId;
pub use meter::{Measurement, Meter, MeterType, Statistic};
pub use quantiles::{InvalidQuantile, QuantileSpec};
pub use tag::{CowStr, Tag, Tags};
