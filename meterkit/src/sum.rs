// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::Ordering;

use portable_atomic::AtomicU128;

/// A running `f64` sum with Neumaier compensation, updated atomically.
///
/// The rounded sum and the accumulated rounding error are packed into one 128-bit word so a single
/// compare-exchange keeps them consistent. Small amounts added to a large total are carried in the
/// compensation term instead of being rounded away.
#[derive(Debug, Default)]
pub(crate) struct CompensatedSum(AtomicU128);

impl CompensatedSum {
    pub(crate) fn add(&self, amount: f64) {
        // the closure always returns Some, so the update cannot fail
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |packed| {
                let (sum, compensation) = unpack(packed);
                let (sum, compensation) = neumaier(sum, compensation, amount);
                Some(pack(sum, compensation))
            });
    }

    pub(crate) fn load(&self) -> f64 {
        let (sum, compensation) = unpack(self.0.load(Ordering::Relaxed));
        sum + compensation
    }
}

fn neumaier(sum: f64, compensation: f64, amount: f64) -> (f64, f64) {
    let t = sum + amount;
    let lost = if sum.abs() >= amount.abs() {
        (sum - t) + amount
    } else {
        (amount - t) + sum
    };
    (t, compensation + lost)
}

fn pack(sum: f64, compensation: f64) -> u128 {
    (u128::from(sum.to_bits()) << 64) | u128::from(compensation.to_bits())
}

fn unpack(packed: u128) -> (f64, f64) {
    (
        f64::from_bits((packed >> 64) as u64),
        f64::from_bits(packed as u64),
    )
}
