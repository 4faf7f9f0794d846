// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Identifier and category key types.
//!
//! Element ids are opaque strings handed over by the extraction layer. Most
//! authoring tools emit integer ids, so [`ElementId`] orders numerically when
//! it can and falls back to lexical order otherwise. Relationship buckets are
//! keyed by [`PairKey`], displayed as `"{first}-{second}"`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Stable identifier of a building element within one run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value of the id, if it is an integer.
    pub fn numeric(&self) -> Option<i64> {
        self.0.trim().parse().ok()
    }
}

impl Ord for ElementId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for ElementId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<u64> for ElementId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

/// Identifier of a building level (storey).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelId(String);

impl LevelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LevelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Building element categories the engine reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Slab,
    Space,
    Wall,
    Door,
    Window,
    Column,
    Stair,
    #[serde(rename = "separationline")]
    SeparationLine,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Slab,
        Category::Space,
        Category::Wall,
        Category::Door,
        Category::Window,
        Category::Column,
        Category::Stair,
        Category::SeparationLine,
    ];

    /// Returns the category's key name as used in pair keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Slab => "slab",
            Category::Space => "space",
            Category::Wall => "wall",
            Category::Door => "door",
            Category::Window => "window",
            Category::Column => "column",
            Category::Stair => "stair",
            Category::SeparationLine => "separationline",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::UnknownCategory(s.to_string()))
    }
}

/// Ordered category pair naming a relationship bucket, e.g. `space-door`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    pub first: Category,
    pub second: Category,
}

impl PairKey {
    pub const fn new(first: Category, second: Category) -> Self {
        Self { first, second }
    }

    /// Returns `true` if either side is `category`.
    pub fn involves(&self, category: Category) -> bool {
        self.first == category || self.second == category
    }

    /// Returns `true` for self-pairs such as `wall-wall`.
    pub fn is_self_pair(&self) -> bool {
        self.first == self.second
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.first, self.second)
    }
}

impl FromStr for PairKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        // Category names never contain '-', so one split is unambiguous.
        let (a, b) = s
            .split_once('-')
            .ok_or_else(|| Error::MalformedPairKey(s.to_string()))?;
        if b.contains('-') {
            return Err(Error::MalformedPairKey(s.to_string()));
        }
        Ok(PairKey::new(a.parse()?, b.parse()?))
    }
}

impl Serialize for PairKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PairKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_names_round_trip() {
        for cat in Category::ALL {
            assert_eq!(cat.as_str().parse::<Category>().unwrap(), cat);
        }
        assert_eq!(Category::SeparationLine.to_string(), "separationline");
    }

    #[test]
    fn unknown_category_is_rejected() {
        let err = "furniture".parse::<Category>().unwrap_err();
        assert!(matches!(err, Error::UnknownCategory(ref s) if s == "furniture"));
    }

    #[test]
    fn pair_key_parse_and_display() {
        let key: PairKey = "space-door".parse().unwrap();
        assert_eq!(key, PairKey::new(Category::Space, Category::Door));
        assert_eq!(key.to_string(), "space-door");
        assert!(key.involves(Category::Door));
        assert!(!key.is_self_pair());
    }

    #[test]
    fn malformed_pair_keys() {
        assert!(matches!(
            "wall".parse::<PairKey>(),
            Err(Error::MalformedPairKey(_))
        ));
        assert!(matches!(
            "wall-wall-wall".parse::<PairKey>(),
            Err(Error::MalformedPairKey(_))
        ));
        assert!(matches!(
            "wall-roof".parse::<PairKey>(),
            Err(Error::UnknownCategory(_))
        ));
    }

    #[test]
    fn element_ids_order_numerically() {
        let mut ids: Vec<ElementId> = ["100", "9", "abc", "20", "-3"]
            .into_iter()
            .map(ElementId::from)
            .collect();
        ids.sort();
        let sorted: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(sorted, vec!["-3", "9", "20", "100", "abc"]);
    }

    #[test]
    fn element_id_ordering_agrees_with_equality() {
        let a = ElementId::from("7");
        let b = ElementId::from("07");
        assert_ne!(a, b);
        assert_ne!(a.cmp(&b), Ordering::Equal);
    }

    #[test]
    fn pair_key_serde_as_string() {
        let key = PairKey::new(Category::Wall, Category::Stair);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"wall-stair\"");
        let back: PairKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
