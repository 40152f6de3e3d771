// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use hashbrown::HashMap;
use meterkit_core::MeterId;

use crate::{Builder, DistributionSummary};

/// An error returned when a [`Registry`] refuses to create a summary
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistryError {
    /// The meter name is empty
    EmptyName,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::EmptyName => f.write_str("meter name must not be empty"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Holds at most one [`DistributionSummary`] per [`MeterId`].
///
/// Concurrent first accesses to the same identity all receive the same summary. The configuration
/// of the builder that created a summary wins; later builders with the same identity but other
/// quantiles or configuration get the existing summary unchanged.
///
/// ```
/// use meterkit::{DistributionSummary, Registry};
/// use std::sync::Arc;
///
/// let registry = Registry::new();
/// let builder = DistributionSummary::builder("request.size").tag("method", "GET");
/// let a = builder.register(&registry).unwrap();
/// let b = registry.summary(&builder).unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
#[derive(Default)]
pub struct Registry {
    summaries: RwLock<HashMap<MeterId, Arc<DistributionSummary>>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the summary registered for `builder`'s identity, creating it from `builder` if there is
    /// none.
    pub fn summary(&self, builder: &Builder) -> Result<Arc<DistributionSummary>, RegistryError> {
        if builder.name().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let id = builder.id();
        if let Some(summary) = self.get(&id) {
            return Ok(summary);
        }

        let mut summaries = self.summaries.write().unwrap_or_else(PoisonError::into_inner);
        // another thread may have created it between the two locks
        let summary = summaries.entry(id).or_insert_with_key(|id| {
            tracing::debug!(meter = %id, "registering distribution summary");
            Arc::new(builder.create())
        });
        Ok(summary.clone())
    }

    /// The summary registered under `id`, if any
    pub fn get(&self, id: &MeterId) -> Option<Arc<DistributionSummary>> {
        self.summaries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Remove the summary registered under `id`.
    ///
    /// Recorders still holding the summary keep using it, but the next registration of `id`
    /// creates a new one.
    pub fn remove(&self, id: &MeterId) -> Option<Arc<DistributionSummary>> {
        let removed = self
            .summaries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        if removed.is_some() {
            tracing::debug!(meter = %id, "removed distribution summary");
        }
        removed
    }

    /// Number of registered summaries
    pub fn len(&self) -> usize {
        self.summaries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if no summary is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every registered summary, in no particular order
    pub fn meters(&self) -> Vec<Arc<DistributionSummary>> {
        self.summaries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use super::*;

    #[test]
    fn empty_name_is_rejected() {
        let registry = Registry::new();
        let err = registry.summary(&Builder::new("")).unwrap_err();
        check!(err == RegistryError::EmptyName);
        check!(err.to_string() == "meter name must not be empty");
        check!(registry.is_empty());
    }

    #[test]
    fn builder_can_create_unnamed_summaries() {
        // the builder itself does not validate names
        let summary = Builder::new("").create();
        summary.record(1.0);
        check!(summary.count() == 1);
    }

    #[test]
    fn remove_then_register_creates_a_new_summary() {
        let registry = Registry::new();
        let builder = Builder::new("sizes");
        let first = builder.register(&registry).unwrap();
        first.record(5.0);

        let removed = registry.remove(&builder.id()).unwrap();
        check!(Arc::ptr_eq(&first, &removed));
        check!(registry.remove(&builder.id()).is_none());

        let second = builder.register(&registry).unwrap();
        check!(second.count() == 0);
        check!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn first_configuration_wins() {
        let registry = Registry::new();
        let first = Builder::new("sizes")
            .quantiles(meterkit_core::QuantileSpec::new([0.5]).unwrap())
            .register(&registry)
            .unwrap();
        let second = Builder::new("sizes")
            .quantiles(meterkit_core::QuantileSpec::new([0.99]).unwrap())
            .register(&registry)
            .unwrap();
        check!(Arc::ptr_eq(&first, &second));
        check!(second.quantile_spec().iter().collect::<Vec<_>>() == vec![0.5]);
    }

    #[test]
    fn tags_distinguish_summaries() {
        let registry = Registry::new();
        let get = Builder::new("sizes").tag("method", "GET").register(&registry).unwrap();
        let put = Builder::new("sizes").tag("method", "PUT").register(&registry).unwrap();
        check!(!Arc::ptr_eq(&get, &put));
        check!(registry.len() == 2);
        check!(registry.meters().len() == 2);
    }
}
