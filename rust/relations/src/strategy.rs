// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Matching strategies and dispatch matrices.
//!
//! A dispatch matrix maps category pairs to a [`StrategyTag`]. Tags keep the
//! textual form used by configuration files (`"bbx-intersection-same"`,
//! `"slab-level"`, ...) but are parsed once into a closed enum, so the
//! dispatcher never branches on substrings. Each relationship class then
//! resolves a tag into a [`MatchStrategy`] carrying concrete tolerances.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::keys::PairKey;

/// How two bounding boxes have to relate to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BboxMode {
    /// Any positive overlap volume.
    Intersection,
    /// Overlap of at least a fraction of the second box's volume.
    Inclusion,
}

/// Level condition applied before geometric tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LevelFilter {
    #[default]
    All,
    Same,
    Different,
}

impl LevelFilter {
    fn suffix(&self) -> &'static str {
        match self {
            LevelFilter::All => "",
            LevelFilter::Same => "-same",
            LevelFilter::Different => "-different",
        }
    }

    /// Splits an optional `-all|-same|-different` suffix off `s`.
    fn strip(s: &str) -> (&str, LevelFilter) {
        for (suffix, filter) in [
            ("-all", LevelFilter::All),
            ("-same", LevelFilter::Same),
            ("-different", LevelFilter::Different),
        ] {
            if let Some(base) = s.strip_suffix(suffix) {
                return (base, filter);
            }
        }
        (s, LevelFilter::All)
    }
}

/// A matching strategy as named in a dispatch matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyTag {
    /// `slab-level`: equal level ids.
    SlabLevel,
    /// `wall-opening`: host reference of doors and windows.
    WallOpening,
    /// `space-boundary`: elements referenced by a space's boundary loops.
    SpaceBoundary,
    /// `door-to-from`: door from/to spaces in the active phase.
    DoorToFrom,
    /// `bbx-{intersection|inclusion}[-{all|same|different}]`.
    Bbox { mode: BboxMode, level: LevelFilter },
    /// `line-line-alignment[-level]`: parallel location lines.
    LineLineAlignment { level: LevelFilter },
    /// `line-point-alignment[-level]`: point close to a location line.
    LinePointAlignment { level: LevelFilter },
    /// `line-intersection[-level]`: wall face lines meet.
    LineIntersection { level: LevelFilter },
    /// `group-point-alignment-<size>`: collinear groups of `size` points.
    GroupPointAlignment { size: usize },
}

impl fmt::Display for StrategyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyTag::SlabLevel => f.write_str("slab-level"),
            StrategyTag::WallOpening => f.write_str("wall-opening"),
            StrategyTag::SpaceBoundary => f.write_str("space-boundary"),
            StrategyTag::DoorToFrom => f.write_str("door-to-from"),
            StrategyTag::Bbox { mode, level } => {
                let mode = match mode {
                    BboxMode::Intersection => "intersection",
                    BboxMode::Inclusion => "inclusion",
                };
                write!(f, "bbx-{}{}", mode, level.suffix())
            }
            StrategyTag::LineLineAlignment { level } => {
                write!(f, "line-line-alignment{}", level.suffix())
            }
            StrategyTag::LinePointAlignment { level } => {
                write!(f, "line-point-alignment{}", level.suffix())
            }
            StrategyTag::LineIntersection { level } => {
                write!(f, "line-intersection{}", level.suffix())
            }
            StrategyTag::GroupPointAlignment { size } => {
                write!(f, "group-point-alignment-{}", size)
            }
        }
    }
}

impl FromStr for StrategyTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let unknown = || Error::UnknownStrategy(s.to_string());

        match s {
            "slab-level" => return Ok(StrategyTag::SlabLevel),
            "wall-opening" => return Ok(StrategyTag::WallOpening),
            "space-boundary" => return Ok(StrategyTag::SpaceBoundary),
            "door-to-from" => return Ok(StrategyTag::DoorToFrom),
            _ => {}
        }

        if let Some(size) = s.strip_prefix("group-point-alignment-") {
            let size = size.parse().map_err(|_| unknown())?;
            return Ok(StrategyTag::GroupPointAlignment { size });
        }

        let (base, level) = LevelFilter::strip(s);
        match base {
            "bbx-intersection" => Ok(StrategyTag::Bbox {
                mode: BboxMode::Intersection,
                level,
            }),
            "bbx-inclusion" => Ok(StrategyTag::Bbox {
                mode: BboxMode::Inclusion,
                level,
            }),
            "line-line-alignment" => Ok(StrategyTag::LineLineAlignment { level }),
            "line-point-alignment" => Ok(StrategyTag::LinePointAlignment { level }),
            "line-intersection" => Ok(StrategyTag::LineIntersection { level }),
            _ => Err(unknown()),
        }
    }
}

impl Serialize for StrategyTag {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StrategyTag {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Parameters of the bounding-box matcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BboxParams {
    pub mode: BboxMode,
    pub level: LevelFilter,
    /// Per-axis growth (positive) or shrinkage (negative) applied to both
    /// boxes before the overlap test.
    pub reshape: [f64; 3],
    /// Fraction of the second box's volume that must overlap in
    /// [`BboxMode::Inclusion`].
    pub factor_inclusion: f64,
}

impl BboxParams {
    pub fn intersection(level: LevelFilter, reshape: [f64; 3]) -> Self {
        Self {
            mode: BboxMode::Intersection,
            level,
            reshape,
            factor_inclusion: 1.0,
        }
    }
}

/// A strategy with its parameters resolved against the tolerance context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchStrategy {
    Level,
    Host,
    Boundary,
    DoorPassage,
    BoundingBox(BboxParams),
    LineLine { tolerance: f64, level: LevelFilter },
    LinePoint { tolerance: f64, level: LevelFilter },
    LineIntersection { level: LevelFilter },
    GroupPoint { size: usize, tolerance: f64 },
}

/// One matrix entry: which strategy relates a category pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub pair: PairKey,
    pub tag: StrategyTag,
}

/// Ordered list of rules for one relationship class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DispatchMatrix {
    rules: Vec<Rule>,
}

impl DispatchMatrix {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Parses textual `(pair, tag)` entries, failing on the first bad one.
    pub fn parse<'s>(entries: impl IntoIterator<Item = (&'s str, &'s str)>) -> Result<Self> {
        let rules = entries
            .into_iter()
            .map(|(pair, tag)| -> Result<Rule> {
                Ok(Rule {
                    pair: pair.parse()?,
                    tag: tag.parse()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Parses textual entries, logging and skipping the ones that do not
    /// parse. A bad entry never invalidates the rest of the matrix.
    pub fn parse_lenient<'s>(entries: impl IntoIterator<Item = (&'s str, &'s str)>) -> Self {
        let mut rules = Vec::new();
        for (pair, tag) in entries {
            match (pair.parse::<PairKey>(), tag.parse::<StrategyTag>()) {
                (Ok(pair), Ok(tag)) => rules.push(Rule { pair, tag }),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::warn!(pair = pair, tag = tag, error = %e, "Skipping matrix entry");
                }
            }
        }
        Self { rules }
    }

    pub fn push(&mut self, pair: PairKey, tag: StrategyTag) {
        self.rules.push(Rule { pair, tag });
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
