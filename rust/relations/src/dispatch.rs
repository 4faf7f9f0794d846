// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dependency dispatcher.
//!
//! Walks a dispatch matrix, resolves every rule's strategy tag through a
//! [`StrategyResolver`] and runs the matching matcher over the category-pair
//! lists. Rules are evaluated in parallel with rayon; their results are
//! merged back in matrix order, so the output does not depend on thread
//! scheduling.
//!
//! Configuration problems in a single rule (a pair outside the scope, a tag
//! the relationship class cannot use) are logged and the rule is skipped.

use rayon::prelude::*;

use crate::keys::PairKey;
use crate::matchers::{self, PairLists};
use crate::pool::ElementPool;
use crate::record::{RelationshipCollection, RelationshipRecord};
use crate::scope::CategoryPairIndex;
use crate::strategy::{DispatchMatrix, MatchStrategy, StrategyTag};
use crate::tolerance::ToleranceContext;

/// Default fraction of a box that must overlap for inclusion matching.
pub const DEFAULT_INCLUSION_FACTOR: f64 = 0.8;

/// Run-wide engine settings, passed explicitly to every class.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineContext {
    /// Design phase for door from/to rooms. `None` selects the most recent
    /// phase of the pool.
    pub phase: Option<String>,
    /// Fraction of the contained box that must overlap in inclusion mode.
    pub inclusion_factor: f64,
    /// Restrict structural support to load-bearing walls and columns.
    pub structural_only: bool,
    /// Run the derived accessibility passes after accessible connectivity.
    pub derived: bool,
}

impl Default for EngineContext {
    fn default() -> Self {
        Self {
            phase: None,
            inclusion_factor: DEFAULT_INCLUSION_FACTOR,
            structural_only: false,
            derived: true,
        }
    }
}

/// Turns a strategy tag into a parameterized strategy for one category
/// pair, or `None` when the tag does not apply to that pair.
pub trait StrategyResolver: Sync {
    fn resolve(
        &self,
        pair: PairKey,
        tag: StrategyTag,
        tolerances: &ToleranceContext,
        ctx: &EngineContext,
    ) -> Option<MatchStrategy>;
}

/// Runs dispatch matrices against one element pool.
pub struct Dispatcher<'a> {
    pool: &'a ElementPool,
    ctx: &'a EngineContext,
    tolerances: ToleranceContext,
}

impl<'a> Dispatcher<'a> {
    /// Creates a dispatcher, deriving the tolerance context from the pool.
    pub fn new(pool: &'a ElementPool, ctx: &'a EngineContext) -> Self {
        Self::with_tolerances(pool, ctx, ToleranceContext::from_pool(pool))
    }

    pub fn with_tolerances(
        pool: &'a ElementPool,
        ctx: &'a EngineContext,
        tolerances: ToleranceContext,
    ) -> Self {
        Self {
            pool,
            ctx,
            tolerances,
        }
    }

    pub fn tolerances(&self) -> &ToleranceContext {
        &self.tolerances
    }

    /// Evaluates every rule of `matrix` over `index`.
    ///
    /// The returned collection has a bucket for every pair key of the scope,
    /// empty unless some rule produced records for it.
    pub fn run<R>(
        &self,
        matrix: &DispatchMatrix,
        index: &CategoryPairIndex<'_>,
        resolver: &R,
    ) -> RelationshipCollection
    where
        R: StrategyResolver + ?Sized,
    {
        let phase = self.pool.active_phase(self.ctx.phase.as_deref());

        let results: Vec<(PairKey, Vec<RelationshipRecord>)> = matrix
            .rules()
            .par_iter()
            .filter_map(|rule| {
                let lists = match index.get(rule.pair) {
                    Ok(lists) => lists,
                    Err(e) => {
                        tracing::warn!(pair = %rule.pair, tag = %rule.tag, error = %e, "Skipping rule");
                        return None;
                    }
                };
                let Some(strategy) = resolver.resolve(rule.pair, rule.tag, &self.tolerances, self.ctx)
                else {
                    tracing::warn!(pair = %rule.pair, tag = %rule.tag, "Strategy does not apply to pair, skipping rule");
                    return None;
                };

                let records = self.apply(strategy, lists, phase);
                tracing::debug!(pair = %rule.pair, tag = %rule.tag, records = records.len(), "Evaluated rule");
                Some((rule.pair, records))
            })
            .collect();

        let mut collection = RelationshipCollection::new();
        for key in index.keys() {
            collection.touch(key);
        }
        for (pair, records) in results {
            collection.extend(pair, records);
        }
        collection
    }

    fn apply(
        &self,
        strategy: MatchStrategy,
        lists: PairLists<'_, '_>,
        phase: Option<&str>,
    ) -> Vec<RelationshipRecord> {
        match strategy {
            MatchStrategy::Level => matchers::match_via_level(lists),
            MatchStrategy::Host => matchers::match_via_host(lists),
            MatchStrategy::Boundary => matchers::match_via_boundary(lists),
            MatchStrategy::DoorPassage => matchers::match_accessibility_via_door(lists, phase),
            MatchStrategy::BoundingBox(params) => matchers::match_via_bbox(lists, &params),
            MatchStrategy::LineLine { tolerance, level } => {
                matchers::match_alignment_line_line(lists, tolerance, level)
            }
            MatchStrategy::LinePoint { tolerance, level } => {
                matchers::match_alignment_line_point(lists, tolerance, level, self.pool)
            }
            MatchStrategy::LineIntersection { level } => {
                matchers::match_via_line_intersection(lists, level)
            }
            MatchStrategy::GroupPoint { size, tolerance } => {
                matchers::match_alignment_point_group(lists, size, tolerance)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::keys::Category;
    use crate::scope::build_scope;
    use crate::strategy::{BboxParams, LevelFilter};

    /// Resolves level and bounding-box tags, rejects the rest.
    struct LevelAndBox;

    impl StrategyResolver for LevelAndBox {
        fn resolve(
            &self,
            _pair: PairKey,
            tag: StrategyTag,
            _tolerances: &ToleranceContext,
            _ctx: &EngineContext,
        ) -> Option<MatchStrategy> {
            match tag {
                StrategyTag::SlabLevel => Some(MatchStrategy::Level),
                StrategyTag::Bbox { level, .. } => {
                    Some(MatchStrategy::BoundingBox(BboxParams::intersection(level, [0.0; 3])))
                }
                _ => None,
            }
        }
    }

    fn pool() -> ElementPool {
        ElementPool::from_elements([
            Element::new("1", Category::Slab)
                .with_level("L1")
                .with_bounding_box([0.0, 0.0, -0.3], [10.0, 10.0, 0.0]),
            Element::new("2", Category::Wall)
                .with_level("L1")
                .with_bounding_box([0.0, 0.0, 0.0], [5.0, 0.2, 3.0]),
            Element::new("3", Category::Wall)
                .with_level("L1")
                .with_bounding_box([4.9, 0.0, 0.0], [5.1, 5.0, 3.0]),
        ])
        .unwrap()
    }

    #[test]
    fn runs_rules_and_touches_every_scope_key() {
        let pool = pool();
        let ctx = EngineContext::default();
        let index = build_scope(&pool, &[Category::Slab, Category::Wall]);
        let matrix = DispatchMatrix::parse([("slab-wall", "slab-level"), ("wall-wall", "bbx-intersection")])
            .unwrap();

        let collection = Dispatcher::new(&pool, &ctx).run(&matrix, &index, &LevelAndBox);

        assert_eq!(collection.keys().count(), 4);
        assert_eq!(collection.get(PairKey::new(Category::Slab, Category::Wall)).len(), 2);
        // both orientations before deduplication
        assert_eq!(collection.get(PairKey::new(Category::Wall, Category::Wall)).len(), 2);
        assert!(collection.get(PairKey::new(Category::Slab, Category::Slab)).is_empty());
    }

    #[test]
    fn configuration_errors_skip_only_their_rule() {
        let pool = pool();
        let ctx = EngineContext::default();
        let index = build_scope(&pool, &[Category::Slab, Category::Wall]);
        let matrix = DispatchMatrix::parse([
            ("slab-door", "slab-level"),
            ("wall-wall", "wall-opening"),
            ("slab-wall", "slab-level"),
        ])
        .unwrap();

        let collection = Dispatcher::new(&pool, &ctx).run(&matrix, &index, &LevelAndBox);

        assert_eq!(collection.record_count(), 2);
        assert!(collection.keys().all(|k| !k.to_string().contains("door")));
    }

    #[test]
    fn rules_for_the_same_pair_append_in_matrix_order() {
        let pool = pool();
        let ctx = EngineContext::default();
        let index = build_scope(&pool, &[Category::Slab, Category::Wall]);
        let mut matrix = DispatchMatrix::default();
        let key = PairKey::new(Category::Slab, Category::Wall);
        matrix.push(key, StrategyTag::SlabLevel);
        matrix.push(
            key,
            StrategyTag::Bbox {
                mode: crate::strategy::BboxMode::Intersection,
                level: LevelFilter::Different,
            },
        );

        let collection = Dispatcher::new(&pool, &ctx).run(&matrix, &index, &LevelAndBox);
        assert_eq!(collection.get(key).len(), 2);
    }

    #[test]
    fn dispatcher_derives_tolerances() {
        let pool = pool();
        let ctx = EngineContext::default();
        let dispatcher = Dispatcher::new(&pool, &ctx);
        approx::assert_relative_eq!(dispatcher.tolerances().max_slab_thickness, 0.3);
    }
}
