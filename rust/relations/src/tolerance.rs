// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Adaptive tolerances derived from the element pool.
//!
//! Matching volumes are grown or shrunk by typical element thicknesses rather
//! than by fixed constants, so the same rules work across models with thin
//! partitions and heavy structural walls alike.

use serde::Serialize;

use crate::keys::Category;
use crate::pool::ElementPool;

/// Maximum element thicknesses found in the pool.
///
/// Each field is `0.0` when the category is absent or none of its elements
/// carries the needed geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ToleranceContext {
    /// Largest slab bounding-box height.
    pub max_slab_thickness: f64,
    /// Largest declared wall width.
    pub max_wall_thickness: f64,
    /// Largest column thickness, a column's thickness being its smallest
    /// bounding-box extent.
    pub max_column_thickness: f64,
}

impl ToleranceContext {
    /// Scans the pool once per category. Elements without the needed
    /// geometry are skipped rather than counted as zero.
    pub fn from_pool(pool: &ElementPool) -> Self {
        let max_slab_thickness = pool
            .elements(Category::Slab)
            .iter()
            .filter_map(|e| e.bounding_box)
            .map(|b| b.max[2] - b.min[2])
            .fold(0.0, f64::max);

        let max_wall_thickness = pool
            .elements(Category::Wall)
            .iter()
            .filter_map(|e| e.width)
            .fold(0.0, f64::max);

        let max_column_thickness = pool
            .elements(Category::Column)
            .iter()
            .filter_map(|e| e.bounding_box)
            .map(|b| {
                let [dx, dy, dz] = b.extents();
                dx.min(dy).min(dz)
            })
            .fold(0.0, f64::max);

        let ctx = Self {
            max_slab_thickness,
            max_wall_thickness,
            max_column_thickness,
        };
        tracing::debug!(
            slab = ctx.max_slab_thickness,
            wall = ctx.max_wall_thickness,
            column = ctx.max_column_thickness,
            "Derived tolerance context"
        );
        ctx
    }
}
