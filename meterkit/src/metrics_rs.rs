// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Integration with [`metrics`](metrics_024) 0.24.

use std::sync::Arc;

use metrics_024::{Histogram, HistogramFn};

use crate::DistributionSummary;

impl HistogramFn for DistributionSummary {
    fn record(&self, value: f64) {
        DistributionSummary::record(self, value);
    }
}

/// Wrap a summary in a [`metrics::Histogram`](Histogram) handle.
///
/// Values recorded through the handle go through [`DistributionSummary::record`], so invalid
/// amounts are dropped in the same way.
pub fn histogram(summary: Arc<DistributionSummary>) -> Histogram {
    Histogram::from_arc(summary)
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use super::*;
    use crate::Registry;

    #[test]
    fn histogram_records_into_summary() {
        let registry = Registry::new();
        let summary = DistributionSummary::builder("response.size")
            .register(&registry)
            .unwrap();
        let handle = histogram(summary.clone());
        handle.record(100.0);
        handle.record(300.0);
        handle.record(-1.0);
        check!(summary.count() == 2);
        check!(summary.total_amount() == 400.0);
        check!(summary.quantile(1.0) == 300.0);
    }
}
