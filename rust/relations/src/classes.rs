// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Relationship classes.
//!
//! A class fixes three things: the categories in scope, a default dispatch
//! matrix, and how each strategy tag turns into concrete tolerances for a
//! given category pair. Running a class builds the scope, dispatches the
//! matrix and finally collapses the pair keys known to be symmetric.

use std::fmt;
use std::str::FromStr;

use crate::derived;
use crate::dispatch::{Dispatcher, EngineContext, StrategyResolver};
use crate::element::Element;
use crate::error::{Error, Result};
use crate::keys::{Category, PairKey};
use crate::matchers::PARALLEL_TOLERANCE;
use crate::pool::ElementPool;
use crate::record::RelationshipCollection;
use crate::scope::build_scope_filtered;
use crate::strategy::{BboxMode, BboxParams, DispatchMatrix, LevelFilter, MatchStrategy, StrategyTag};
use crate::tolerance::ToleranceContext;

use Category::*;

const fn pair(first: Category, second: Category) -> PairKey {
    PairKey::new(first, second)
}

const WALL_WALL: PairKey = pair(Wall, Wall);
const STAIR_STAIR: PairKey = pair(Stair, Stair);
const COLUMN_COLUMN: PairKey = pair(Column, Column);

const BBOX_INTERSECTION: StrategyTag = StrategyTag::Bbox {
    mode: BboxMode::Intersection,
    level: LevelFilter::All,
};

/// The five relationship classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationshipKind {
    AccessibleConnectivity,
    AdjacentConnectivity,
    SpatialContainment,
    StructuralSupport,
    LocationalAlignment,
}

impl RelationshipKind {
    pub const ALL: [RelationshipKind; 5] = [
        RelationshipKind::AccessibleConnectivity,
        RelationshipKind::AdjacentConnectivity,
        RelationshipKind::SpatialContainment,
        RelationshipKind::StructuralSupport,
        RelationshipKind::LocationalAlignment,
    ];

    /// Full name, also the output file stem.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::AccessibleConnectivity => "accessible_connectivity",
            RelationshipKind::AdjacentConnectivity => "adjacent_connectivity",
            RelationshipKind::SpatialContainment => "spatial_containment",
            RelationshipKind::StructuralSupport => "structural_support",
            RelationshipKind::LocationalAlignment => "locational_alignment",
        }
    }

    /// Short trigger name used on the command line and in configuration.
    pub fn trigger(&self) -> &'static str {
        match self {
            RelationshipKind::AccessibleConnectivity => "accessible",
            RelationshipKind::AdjacentConnectivity => "adjacent",
            RelationshipKind::SpatialContainment => "spatial",
            RelationshipKind::StructuralSupport => "structural",
            RelationshipKind::LocationalAlignment => "locational",
        }
    }

    /// The class implementing this kind.
    pub fn class(&self) -> &'static dyn RelationshipClass {
        match self {
            RelationshipKind::AccessibleConnectivity => &AccessibleConnectivity,
            RelationshipKind::AdjacentConnectivity => &AdjacentConnectivity,
            RelationshipKind::SpatialContainment => &SpatialContainment,
            RelationshipKind::StructuralSupport => &StructuralSupport,
            RelationshipKind::LocationalAlignment => &LocationalAlignment,
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipKind {
    type Err = Error;

    /// Accepts either the trigger (`adjacent`) or the full name
    /// (`adjacent_connectivity`).
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        RelationshipKind::ALL
            .iter()
            .copied()
            .find(|k| k.trigger() == s || k.as_str() == s)
            .ok_or_else(|| Error::UnknownRelationship(s.to_string()))
    }
}

/// A relationship class: scope, default matrix and tag resolution.
pub trait RelationshipClass: StrategyResolver {
    fn kind(&self) -> RelationshipKind;

    /// Categories this class reasons about.
    fn scope(&self) -> &'static [Category];

    fn default_matrix(&self) -> DispatchMatrix;

    /// Pair keys whose records are collapsed regardless of direction.
    fn symmetric_keys(&self) -> &'static [PairKey];

    /// Whether `element` takes part in this class's scope.
    fn accepts(&self, _element: &Element, _ctx: &EngineContext) -> bool {
        true
    }

    /// Hook run on the finished collection, after deduplication.
    fn finish(&self, _collection: &mut RelationshipCollection, _pool: &ElementPool, _ctx: &EngineContext) {}

    /// Runs the class with its default matrix.
    fn construct(&self, pool: &ElementPool, ctx: &EngineContext) -> RelationshipCollection {
        self.construct_with(pool, ctx, &self.default_matrix())
    }

    /// Runs the class with a caller-provided matrix.
    fn construct_with(
        &self,
        pool: &ElementPool,
        ctx: &EngineContext,
        matrix: &DispatchMatrix,
    ) -> RelationshipCollection {
        let index = build_scope_filtered(pool, self.scope(), |e| self.accepts(e, ctx));
        let mut collection = Dispatcher::new(pool, ctx).run(matrix, &index, self);

        for &key in self.symmetric_keys() {
            collection.deduplicate_unordered(key);
        }
        self.finish(&mut collection, pool, ctx);

        tracing::info!(
            relationship = %self.kind(),
            rules = matrix.len(),
            records = collection.record_count(),
            "Constructed relationships"
        );
        collection
    }
}

/// Runs the selected classes, each independently, in trigger order.
pub fn construct_all(
    pool: &ElementPool,
    ctx: &EngineContext,
    triggers: &[RelationshipKind],
) -> Vec<(RelationshipKind, RelationshipCollection)> {
    triggers
        .iter()
        .map(|&kind| (kind, kind.class().construct(pool, ctx)))
        .collect()
}

fn typed_matrix(rules: &[(PairKey, StrategyTag)]) -> DispatchMatrix {
    let mut matrix = DispatchMatrix::default();
    for &(pair, tag) in rules {
        matrix.push(pair, tag);
    }
    matrix
}

fn bbox(mode: BboxMode, level: LevelFilter, reshape: [f64; 3], ctx: &EngineContext) -> MatchStrategy {
    MatchStrategy::BoundingBox(BboxParams {
        mode,
        level,
        reshape,
        factor_inclusion: ctx.inclusion_factor,
    })
}

// ---------------------------------------------------------------------------
// Accessible connectivity
// ---------------------------------------------------------------------------

/// Which spaces can be walked between: doors, separation lines and stairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessibleConnectivity;

impl StrategyResolver for AccessibleConnectivity {
    fn resolve(
        &self,
        _pair: PairKey,
        tag: StrategyTag,
        tol: &ToleranceContext,
        ctx: &EngineContext,
    ) -> Option<MatchStrategy> {
        match tag {
            StrategyTag::DoorToFrom => Some(MatchStrategy::DoorPassage),
            StrategyTag::SpaceBoundary => Some(MatchStrategy::Boundary),
            // stairs sit between slabs, so grow vertically to reach them
            StrategyTag::Bbox { mode, level } => Some(bbox(
                mode,
                level,
                [0.0, 0.0, tol.max_slab_thickness * 0.5],
                ctx,
            )),
            _ => None,
        }
    }
}

impl RelationshipClass for AccessibleConnectivity {
    fn kind(&self) -> RelationshipKind {
        RelationshipKind::AccessibleConnectivity
    }

    fn scope(&self) -> &'static [Category] {
        &[Space, Door, SeparationLine, Stair]
    }

    fn default_matrix(&self) -> DispatchMatrix {
        typed_matrix(&[
            (pair(Space, Door), StrategyTag::DoorToFrom),
            (pair(Space, SeparationLine), StrategyTag::SpaceBoundary),
            (pair(Space, Stair), BBOX_INTERSECTION),
            (pair(Stair, Stair), BBOX_INTERSECTION),
        ])
    }

    fn symmetric_keys(&self) -> &'static [PairKey] {
        &[STAIR_STAIR]
    }

    fn finish(&self, collection: &mut RelationshipCollection, pool: &ElementPool, ctx: &EngineContext) {
        if ctx.derived {
            derived::apply(collection, pool, ctx);
        }
    }
}

// ---------------------------------------------------------------------------
// Adjacent connectivity
// ---------------------------------------------------------------------------

/// Physical contact: elements resting on slabs, touching walls, space
/// boundaries and stair landings.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdjacentConnectivity;

impl StrategyResolver for AdjacentConnectivity {
    fn resolve(
        &self,
        pair_key: PairKey,
        tag: StrategyTag,
        tol: &ToleranceContext,
        ctx: &EngineContext,
    ) -> Option<MatchStrategy> {
        match tag {
            StrategyTag::SlabLevel => Some(MatchStrategy::Level),
            StrategyTag::SpaceBoundary => Some(MatchStrategy::Boundary),
            StrategyTag::LineIntersection { level } => Some(MatchStrategy::LineIntersection { level }),
            StrategyTag::Bbox { mode, level } => {
                let reshape = if pair_key == pair(Wall, Stair) {
                    // walls run past stair flights; shrink vertically so only
                    // side contact counts
                    [
                        tol.max_wall_thickness,
                        tol.max_wall_thickness,
                        -tol.max_slab_thickness * 0.5,
                    ]
                } else if pair_key.involves(Stair) {
                    [0.0, 0.0, tol.max_slab_thickness * 0.5]
                } else {
                    [0.0; 3]
                };
                Some(bbox(mode, level, reshape, ctx))
            }
            _ => None,
        }
    }
}

impl RelationshipClass for AdjacentConnectivity {
    fn kind(&self) -> RelationshipKind {
        RelationshipKind::AdjacentConnectivity
    }

    fn scope(&self) -> &'static [Category] {
        &[Slab, Space, Wall, Column, Stair]
    }

    fn default_matrix(&self) -> DispatchMatrix {
        typed_matrix(&[
            (pair(Slab, Space), StrategyTag::SlabLevel),
            (pair(Slab, Wall), StrategyTag::SlabLevel),
            (pair(Slab, Column), StrategyTag::SlabLevel),
            (pair(Slab, Stair), BBOX_INTERSECTION),
            (pair(Stair, Stair), BBOX_INTERSECTION),
            (pair(Wall, Wall), BBOX_INTERSECTION),
            (pair(Wall, Stair), BBOX_INTERSECTION),
            (pair(Space, Wall), StrategyTag::SpaceBoundary),
        ])
    }

    fn symmetric_keys(&self) -> &'static [PairKey] {
        &[STAIR_STAIR, WALL_WALL]
    }
}

// ---------------------------------------------------------------------------
// Spatial containment
// ---------------------------------------------------------------------------

/// What lies inside what: elements within spaces, openings within walls.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpatialContainment;

impl StrategyResolver for SpatialContainment {
    fn resolve(
        &self,
        _pair: PairKey,
        tag: StrategyTag,
        _tol: &ToleranceContext,
        ctx: &EngineContext,
    ) -> Option<MatchStrategy> {
        match tag {
            StrategyTag::WallOpening => Some(MatchStrategy::Host),
            StrategyTag::SpaceBoundary => Some(MatchStrategy::Boundary),
            StrategyTag::Bbox { mode, level } => Some(bbox(mode, level, [0.0; 3], ctx)),
            _ => None,
        }
    }
}

impl RelationshipClass for SpatialContainment {
    fn kind(&self) -> RelationshipKind {
        RelationshipKind::SpatialContainment
    }

    fn scope(&self) -> &'static [Category] {
        &[Space, Wall, Column, Stair, Door, Window]
    }

    fn default_matrix(&self) -> DispatchMatrix {
        let inclusion = StrategyTag::Bbox {
            mode: BboxMode::Inclusion,
            level: LevelFilter::All,
        };
        typed_matrix(&[
            (pair(Space, Wall), inclusion),
            (pair(Space, Column), inclusion),
            (pair(Space, Stair), inclusion),
            (pair(Wall, Door), StrategyTag::WallOpening),
            (pair(Wall, Window), StrategyTag::WallOpening),
        ])
    }

    fn symmetric_keys(&self) -> &'static [PairKey] {
        &[]
    }
}

// ---------------------------------------------------------------------------
// Structural support
// ---------------------------------------------------------------------------

/// Load paths: walls and columns bearing on each other and on slabs.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralSupport;

impl StrategyResolver for StructuralSupport {
    fn resolve(
        &self,
        _pair: PairKey,
        tag: StrategyTag,
        tol: &ToleranceContext,
        ctx: &EngineContext,
    ) -> Option<MatchStrategy> {
        match tag {
            StrategyTag::SlabLevel => Some(MatchStrategy::Level),
            StrategyTag::LineIntersection { level } => Some(MatchStrategy::LineIntersection { level }),
            StrategyTag::Bbox { mode, level } => {
                // elements on different levels are separated by a slab
                let reshape = match level {
                    LevelFilter::Same => [0.0; 3],
                    LevelFilter::All | LevelFilter::Different => [0.0, 0.0, tol.max_slab_thickness],
                };
                Some(bbox(mode, level, reshape, ctx))
            }
            _ => None,
        }
    }
}

impl RelationshipClass for StructuralSupport {
    fn kind(&self) -> RelationshipKind {
        RelationshipKind::StructuralSupport
    }

    fn scope(&self) -> &'static [Category] {
        &[Column, Wall, Slab]
    }

    fn default_matrix(&self) -> DispatchMatrix {
        typed_matrix(&[
            (pair(Wall, Wall), BBOX_INTERSECTION),
            (pair(Wall, Column), BBOX_INTERSECTION),
            (
                pair(Column, Column),
                StrategyTag::Bbox {
                    mode: BboxMode::Intersection,
                    level: LevelFilter::Different,
                },
            ),
            (pair(Slab, Wall), StrategyTag::SlabLevel),
            (pair(Slab, Column), StrategyTag::SlabLevel),
        ])
    }

    fn symmetric_keys(&self) -> &'static [PairKey] {
        &[WALL_WALL, COLUMN_COLUMN]
    }

    fn accepts(&self, element: &Element, ctx: &EngineContext) -> bool {
        !ctx.structural_only
            || !matches!(element.category, Wall | Column)
            || element.is_structural()
    }
}

// ---------------------------------------------------------------------------
// Locational alignment
// ---------------------------------------------------------------------------

/// Elements laid out on common lines: aligned walls, columns on wall axes.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationalAlignment;

impl StrategyResolver for LocationalAlignment {
    fn resolve(
        &self,
        _pair: PairKey,
        tag: StrategyTag,
        tol: &ToleranceContext,
        _ctx: &EngineContext,
    ) -> Option<MatchStrategy> {
        match tag {
            StrategyTag::LineLineAlignment { level } => Some(MatchStrategy::LineLine {
                tolerance: 2.0 * tol.max_wall_thickness,
                level,
            }),
            StrategyTag::LinePointAlignment { level } => Some(MatchStrategy::LinePoint {
                tolerance: tol.max_wall_thickness + tol.max_column_thickness,
                level,
            }),
            StrategyTag::GroupPointAlignment { size } => Some(MatchStrategy::GroupPoint {
                size,
                tolerance: PARALLEL_TOLERANCE,
            }),
            _ => None,
        }
    }
}

impl RelationshipClass for LocationalAlignment {
    fn kind(&self) -> RelationshipKind {
        RelationshipKind::LocationalAlignment
    }

    fn scope(&self) -> &'static [Category] {
        &[Column, Wall]
    }

    fn default_matrix(&self) -> DispatchMatrix {
        typed_matrix(&[
            (
                pair(Wall, Wall),
                StrategyTag::LineLineAlignment {
                    level: LevelFilter::Same,
                },
            ),
            (
                pair(Wall, Column),
                StrategyTag::LinePointAlignment {
                    level: LevelFilter::Same,
                },
            ),
        ])
    }

    fn symmetric_keys(&self) -> &'static [PairKey] {
        &[WALL_WALL]
    }
}
