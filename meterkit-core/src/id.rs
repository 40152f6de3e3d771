// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use crate::{CowStr, Tag, Tags};

/// The identity of a meter: a name plus a set of tags.
///
/// A `MeterId` is immutable once constructed and compares structurally, which makes it suitable as
/// the key of a registry map. Since [`Tags`] keeps its entries sorted, ids built from the same pairs
/// in a different order are equal.
///
/// ```
/// use meterkit_core::{MeterId, Tags};
///
/// let id = MeterId::new("http.response.size", [("method", "GET"), ("status", "200")].into_iter().collect());
/// assert_eq!(id.to_string(), "http.response.size{method=GET,status=200}");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MeterId {
    name: CowStr,
    tags: Tags,
}

impl MeterId {
    /// Create a new id
    pub fn new(name: impl Into<CowStr>, tags: Tags) -> Self {
        Self {
            name: name.into(),
            tags,
        }
    }

    /// Create an id without tags
    pub fn untagged(name: impl Into<CowStr>) -> Self {
        Self::new(name, Tags::empty())
    }

    /// The meter name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The tags of this meter
    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// The value of the tag `key`, if present
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key)
    }

    /// Returns a new id with `tag` added, replacing any existing tag with the same key.
    pub fn with_tag(&self, tag: impl Into<Tag>) -> Self {
        let mut tags = self.tags.clone();
        tags.insert(tag.into());
        Self::new(self.name.clone(), tags)
    }
}

impl fmt::Display for MeterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.tags.is_empty() {
            write!(f, "{{{}}}", self.tags)?;
        }
        Ok(())
    }
}
