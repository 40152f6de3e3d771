// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::{borrow::Cow, fmt};

use smallvec::SmallVec;

/// Owned or `'static` string used for meter names and tag keys/values.
pub type CowStr = Cow<'static, str>;

/// An immutable `(key, value)` label attached to a meter.
///
/// Tags compare by value, first by key and then by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tag {
    key: CowStr,
    value: CowStr,
}

impl Tag {
    /// Create a new tag
    pub fn new(key: impl Into<CowStr>, value: impl Into<CowStr>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// The key of this tag
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The value of this tag
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl<K: Into<CowStr>, V: Into<CowStr>> From<(K, V)> for Tag {
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// A set of tags behaving as a mapping from key to value.
///
/// Tags are kept sorted by key and a key appears at most once: inserting a tag whose key is already
/// present replaces the existing value rather than adding a second entry. Two tag sets holding the
/// same pairs are equal (and hash equally) regardless of the order the pairs were inserted in.
///
/// Bulk insertion through [`Extend`] or [`FromIterator`] folds every pair through [`Tags::insert`]
/// in iteration order, so on a key collision the later pair wins.
///
/// ```
/// use meterkit_core::{Tag, Tags};
///
/// let tags: Tags = [("status", "200"), ("method", "GET"), ("status", "500")]
///     .into_iter()
///     .map(Tag::from)
///     .collect();
/// assert_eq!(tags.len(), 2);
/// assert_eq!(tags.get("status"), Some("500"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tags {
    // inline storage covers the common case of a handful of dimensions
    tags: SmallVec<[Tag; 4]>,
}

impl Tags {
    /// An empty tag set
    pub const fn empty() -> Self {
        Self {
            tags: SmallVec::new_const(),
        }
    }

    /// Insert `tag`, replacing the value of an existing tag with the same key.
    ///
    /// Returns the value previously associated with the key, if any.
    pub fn insert(&mut self, tag: Tag) -> Option<CowStr> {
        match self.position(tag.key()) {
            Ok(index) => Some(std::mem::replace(&mut self.tags[index].value, tag.value)),
            Err(index) => {
                self.tags.insert(index, tag);
                None
            }
        }
    }

    /// Remove the tag with the given key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<CowStr> {
        self.position(key)
            .ok()
            .map(|index| self.tags.remove(index).value)
    }

    /// The value associated with `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.position(key).ok().map(|index| self.tags[index].value())
    }

    /// Returns true if a tag with `key` is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_ok()
    }

    /// Iterate over the tags, ordered by key
    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.tags.iter()
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns true if there are no tags
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    fn position(&self, key: &str) -> Result<usize, usize> {
        self.tags.binary_search_by(|tag| tag.key().cmp(key))
    }
}

impl<T: Into<Tag>> Extend<T> for Tags {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for tag in iter {
            self.insert(tag.into());
        }
    }
}

impl<T: Into<Tag>> FromIterator<T> for Tags {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut tags = Tags::empty();
        tags.extend(iter);
        tags
    }
}

impl<'a> IntoIterator for &'a Tags {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for Tags {
    type Item = Tag;
    type IntoIter = smallvec::IntoIter<[Tag; 4]>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.into_iter()
    }
}

impl fmt::Display for Tags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tag) in self.tags.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{tag}")?;
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Tags {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for tag in self {
            map.serialize_entry(tag.key(), tag.value())?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    use assert2::check;

    use super::*;

    fn hash_of(tags: &Tags) -> u64 {
        let mut hasher = DefaultHasher::new();
        tags.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn insert_overwrites_existing_key() {
        let mut tags = Tags::empty();
        check!(tags.insert(Tag::new("k", "a")).is_none());
        check!(tags.insert(Tag::new("k", "b")).as_deref() == Some("a"));
        check!(tags.len() == 1);
        check!(tags.iter().collect::<Vec<_>>() == vec![&Tag::new("k", "b")]);
    }

    #[test]
    fn order_of_insertion_is_irrelevant() {
        let a: Tags = [("b", "2"), ("a", "1"), ("c", "3")].into_iter().collect();
        let b: Tags = [("c", "3"), ("b", "2"), ("a", "1")].into_iter().collect();
        check!(a == b);
        check!(hash_of(&a) == hash_of(&b));
        let keys: Vec<_> = a.iter().map(Tag::key).collect();
        check!(keys == vec!["a", "b", "c"]);
    }

    #[test]
    fn later_entries_win_within_one_extend() {
        let mut tags = Tags::empty();
        tags.extend([("region", "us-east-1"), ("region", "eu-west-1")]);
        check!(tags.get("region") == Some("eu-west-1"));
        check!(tags.len() == 1);
    }

    #[test]
    fn remove_and_lookup() {
        let mut tags: Tags = [("a", "1"), ("b", "2")].into_iter().collect();
        check!(tags.contains_key("a"));
        check!(tags.remove("a").as_deref() == Some("1"));
        check!(!tags.contains_key("a"));
        check!(tags.remove("a").is_none());
        check!(tags.get("b") == Some("2"));
    }

    #[test]
    fn display() {
        let tags: Tags = [("uri", "/api"), ("method", "GET")].into_iter().collect();
        check!(tags.to_string() == "method=GET,uri=/api");
        check!(Tags::empty().to_string() == "");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serializes_as_map() {
        let tags: Tags = [("uri", "/api"), ("method", "GET")].into_iter().collect();
        check!(serde_json::to_string(&tags).unwrap() == r#"{"method":"GET","uri":"/api"}"#);
    }
}
