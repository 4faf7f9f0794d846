// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Relationship records and per-class collections.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::keys::{Category, ElementId, PairKey};

/// One inferred relationship.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelationshipRecord {
    /// Undirected pair.
    Pair { a: ElementId, b: ElementId },
    /// Directed pair: the first element relates to the second (host → door,
    /// space → wall).
    OrderedPair { from: ElementId, to: ElementId },
    /// A group of two or more elements.
    Group(Vec<ElementId>),
}

impl RelationshipRecord {
    pub fn pair(a: impl Into<ElementId>, b: impl Into<ElementId>) -> Self {
        RelationshipRecord::Pair {
            a: a.into(),
            b: b.into(),
        }
    }

    pub fn ordered(from: impl Into<ElementId>, to: impl Into<ElementId>) -> Self {
        RelationshipRecord::OrderedPair {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Member ids in record order.
    pub fn ids(&self) -> Vec<&ElementId> {
        match self {
            RelationshipRecord::Pair { a, b } => vec![a, b],
            RelationshipRecord::OrderedPair { from, to } => vec![from, to],
            RelationshipRecord::Group(ids) => ids.iter().collect(),
        }
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.ids().into_iter().any(|x| x == id)
    }

    /// Forgets direction and puts member ids in canonical order.
    ///
    /// Pairs become `Pair { a <= b }`; groups are sorted. A group of exactly
    /// two members is the same relation as a pair and becomes one.
    pub fn into_unordered(self) -> Self {
        match self {
            RelationshipRecord::Pair { a, b } | RelationshipRecord::OrderedPair { from: a, to: b } => {
                if b < a {
                    RelationshipRecord::Pair { a: b, b: a }
                } else {
                    RelationshipRecord::Pair { a, b }
                }
            }
            RelationshipRecord::Group(ids) if ids.len() == 2 => {
                let [a, b]: [ElementId; 2] = match ids.try_into() {
                    Ok(pair) => pair,
                    Err(ids) => return RelationshipRecord::Group(ids),
                };
                RelationshipRecord::Pair { a, b }.into_unordered()
            }
            RelationshipRecord::Group(mut ids) => {
                ids.sort();
                RelationshipRecord::Group(ids)
            }
        }
    }

    fn is_empty(&self) -> bool {
        matches!(self, RelationshipRecord::Group(ids) if ids.is_empty())
    }
}

/// Records serialize as plain id arrays, e.g. `["12", "34"]`.
impl Serialize for RelationshipRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let ids = self.ids();
        let mut seq = serializer.serialize_seq(Some(ids.len()))?;
        for id in ids {
            seq.serialize_element(id)?;
        }
        seq.end()
    }
}

/// Key of a relationship bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationKey {
    /// Direct relationships between two categories, e.g. `wall-door`.
    Pair(PairKey),
    /// Derived chains through an intermediate category, e.g.
    /// `space-door-space`.
    Chain(Category, Category, Category),
}

impl fmt::Display for RelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationKey::Pair(key) => write!(f, "{}", key),
            RelationKey::Chain(a, b, c) => write!(f, "{}-{}-{}", a, b, c),
        }
    }
}

impl From<PairKey> for RelationKey {
    fn from(key: PairKey) -> Self {
        RelationKey::Pair(key)
    }
}

/// Records of one relationship class, bucketed by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationshipCollection {
    buckets: BTreeMap<RelationKey, Vec<RelationshipRecord>>,
    /// Single-element classifications such as `door-to-exit`.
    labels: BTreeMap<&'static str, Vec<ElementId>>,
}

impl RelationshipCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures a (possibly empty) bucket exists for `key`.
    pub fn touch(&mut self, key: impl Into<RelationKey>) {
        self.buckets.entry(key.into()).or_default();
    }

    pub fn extend(
        &mut self,
        key: impl Into<RelationKey>,
        records: impl IntoIterator<Item = RelationshipRecord>,
    ) {
        self.buckets.entry(key.into()).or_default().extend(records);
    }

    /// Records under `key`; empty when the bucket does not exist.
    pub fn get(&self, key: impl Into<RelationKey>) -> &[RelationshipRecord] {
        self.buckets
            .get(&key.into())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RelationKey, &[RelationshipRecord])> {
        self.buckets.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &RelationKey> {
        self.buckets.keys()
    }

    /// Attaches a label to `ids`, e.g. `door-to-exit`.
    pub fn label(&mut self, name: &'static str, ids: impl IntoIterator<Item = ElementId>) {
        self.labels.entry(name).or_default().extend(ids);
    }

    /// Elements carrying label `name`.
    pub fn labelled(&self, name: &str) -> &[ElementId] {
        self.labels.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn labels(&self) -> impl Iterator<Item = (&'static str, &[ElementId])> {
        self.labels.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Total number of records over all buckets.
    pub fn record_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// `true` when no bucket holds a record and no label is attached.
    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(Vec::is_empty) && self.labels.values().all(Vec::is_empty)
    }

    /// Collapses records under `key` that differ only in member order.
    ///
    /// Every record is turned into its unordered form; the bucket is then
    /// sorted by member ids and duplicates removed. Empty groups are dropped.
    /// Applying this twice gives the same result as applying it once.
    pub fn deduplicate_unordered(&mut self, key: impl Into<RelationKey>) {
        let key = key.into();
        let Some(records) = self.buckets.get_mut(&key) else {
            return;
        };

        let before = records.len();
        let mut normalized: Vec<RelationshipRecord> = std::mem::take(records)
            .into_iter()
            .filter(|r| !r.is_empty())
            .map(RelationshipRecord::into_unordered)
            .collect();
        normalized.sort_by(|x, y| x.ids().cmp(&y.ids()).then_with(|| x.cmp(y)));
        normalized.dedup();

        tracing::debug!(
            key = %key,
            before,
            after = normalized.len(),
            "Removed repeated unordered records"
        );
        *records = normalized;
    }
}

impl Serialize for RelationshipCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.buckets.len() + self.labels.len()))?;
        for (key, records) in &self.buckets {
            map.serialize_entry(&key.to_string(), records)?;
        }
        for (name, ids) in &self.labels {
            map.serialize_entry(name, ids)?;
        }
        map.end()
    }
}
