// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Relationship matchers.
//!
//! One function per matching strategy. Each takes the two element lists of a
//! category pair plus its parameters and returns the matched records in
//! input order. Matchers are pure: they only borrow the pool, and an element
//! without the geometry a matcher needs is skipped, never an error.

use rustc_hash::FxHashSet;

use crate::element::{Element, Location};
use crate::geometry::{
    lines_parallel_with_distance, point_near_line, points_collinear, walls_intersect_by_faces,
    BoundingBox3,
};
use crate::keys::{ElementId, LevelId};
use crate::pool::ElementPool;
use crate::record::RelationshipRecord;
use crate::strategy::{BboxMode, BboxParams, LevelFilter};

/// The two element lists of a category pair.
pub type PairLists<'l, 'e> = (&'l [&'e Element], &'l [&'e Element]);

/// Cross-product magnitude below which two directions count as parallel.
pub const PARALLEL_TOLERANCE: f64 = 1e-5;

/// Slack on the projection parameter when testing whether a point falls
/// within a segment.
pub const SEGMENT_TOLERANCE: f64 = 0.05;

/// Absolute tolerance for segment intersection tests.
pub const INTERSECTION_TOLERANCE: f64 = 1e-5;

fn same_element(a: &Element, b: &Element) -> bool {
    a.id == b.id
}

/// Level condition between `a` and `b`. With a `Same`/`Different` filter a
/// pair where either level is missing never passes.
pub fn levels_pass(filter: LevelFilter, a: &Element, b: &Element) -> bool {
    match filter {
        LevelFilter::All => true,
        LevelFilter::Same | LevelFilter::Different => match (&a.level, &b.level) {
            (Some(la), Some(lb)) => (la == lb) == (filter == LevelFilter::Same),
            _ => false,
        },
    }
}

/// Relates elements that sit on the same level.
pub fn match_via_level(lists: PairLists<'_, '_>) -> Vec<RelationshipRecord> {
    let (list_a, list_b) = lists;
    let mut out = Vec::new();
    for a in list_a {
        let Some(level_a) = &a.level else {
            continue;
        };
        for b in list_b {
            if same_element(a, b) {
                continue;
            }
            if b.level.as_ref() == Some(level_a) {
                out.push(RelationshipRecord::ordered(a.id.clone(), b.id.clone()));
            }
        }
    }
    out
}

/// Relates elements whose bounding boxes overlap.
///
/// Both boxes are reshaped by `params.reshape` first. In
/// [`BboxMode::Intersection`] any positive overlap matches. In
/// [`BboxMode::Inclusion`] the overlap must be positive and at least
/// `factor_inclusion` times the volume of `b`'s original box.
pub fn match_via_bbox(lists: PairLists<'_, '_>, params: &BboxParams) -> Vec<RelationshipRecord> {
    let (list_a, list_b) = lists;

    let targets: Vec<(&Element, BoundingBox3, f64)> = list_b
        .iter()
        .filter_map(|b| match b.bounding_box {
            Some(bb) => Some((*b, bb.reshaped(params.reshape), bb.volume())),
            None => {
                tracing::debug!(id = %b.id, "No bounding box, skipped");
                None
            }
        })
        .collect();

    let mut out = Vec::new();
    for a in list_a {
        let Some(bb_a) = a.bounding_box else {
            tracing::debug!(id = %a.id, "No bounding box, skipped");
            continue;
        };
        let bb_a = bb_a.reshaped(params.reshape);

        for (b, bb_b, volume_b) in &targets {
            if same_element(a, b) || !levels_pass(params.level, a, b) {
                continue;
            }
            let overlap = bb_a.overlap_volume(bb_b);
            let matched = match params.mode {
                BboxMode::Intersection => overlap > 0.0,
                BboxMode::Inclusion => overlap > 0.0 && overlap >= params.factor_inclusion * volume_b,
            };
            if matched {
                out.push(RelationshipRecord::ordered(a.id.clone(), b.id.clone()));
            }
        }
    }
    out
}

/// Relates each hosted opening in the second list to its host.
pub fn match_via_host(lists: PairLists<'_, '_>) -> Vec<RelationshipRecord> {
    let (_, list_b) = lists;
    list_b
        .iter()
        .filter_map(|b| {
            let host = b.host.as_ref()?;
            Some(RelationshipRecord::ordered(host.clone(), b.id.clone()))
        })
        .collect()
}

/// Relates each space to the elements of the second list referenced by its
/// boundary loops. Unplaced spaces are skipped.
pub fn match_via_boundary(lists: PairLists<'_, '_>) -> Vec<RelationshipRecord> {
    let (spaces, list_b) = lists;
    let targets: FxHashSet<&ElementId> = list_b.iter().map(|b| &b.id).collect();

    let mut out = Vec::new();
    for space in spaces {
        if space.location.is_none() {
            tracing::debug!(id = %space.id, "Unplaced space, skipped");
            continue;
        }
        let mut seen = FxHashSet::default();
        for id in space.boundary_elements() {
            if targets.contains(id) && seen.insert(id) {
                out.push(RelationshipRecord::ordered(space.id.clone(), id.clone()));
            }
        }
    }
    out
}

/// Relates spaces to the doors that open from or to them in `phase`.
///
/// Without a phase nothing matches. Doors with no rooms recorded for the
/// phase are skipped.
pub fn match_accessibility_via_door(
    lists: PairLists<'_, '_>,
    phase: Option<&str>,
) -> Vec<RelationshipRecord> {
    let (spaces, doors) = lists;
    let Some(phase) = phase else {
        tracing::debug!("No design phase, door accessibility skipped");
        return Vec::new();
    };

    let mut out = Vec::new();
    for space in spaces {
        for door in doors {
            let Some(rooms) = door.rooms_in_phase(phase) else {
                continue;
            };
            if rooms.from_room.as_ref() == Some(&space.id) || rooms.to_room.as_ref() == Some(&space.id) {
                out.push(RelationshipRecord::ordered(space.id.clone(), door.id.clone()));
            }
        }
    }
    out
}

/// Relates elements whose location lines are parallel and at most
/// `tolerance` apart.
pub fn match_alignment_line_line(
    lists: PairLists<'_, '_>,
    tolerance: f64,
    level: LevelFilter,
) -> Vec<RelationshipRecord> {
    let (list_a, list_b) = lists;
    let mut out = Vec::new();
    for a in list_a {
        let Some(line_a) = a.curve() else {
            continue;
        };
        for b in list_b {
            if same_element(a, b) || !levels_pass(level, a, b) {
                continue;
            }
            let Some(line_b) = b.curve() else {
                continue;
            };
            match lines_parallel_with_distance(line_a, line_b, PARALLEL_TOLERANCE) {
                Some(distance) if distance <= tolerance => {
                    out.push(RelationshipRecord::ordered(a.id.clone(), b.id.clone()));
                }
                _ => {}
            }
        }
    }
    out
}

/// Absolute position of a point-like element.
///
/// Point placements are level-relative, so the level elevation is added to
/// z; an unknown level yields `None`. Curve placements use the midpoint.
fn absolute_point(element: &Element, pool: &ElementPool) -> Option<[f64; 3]> {
    match element.location.as_ref()? {
        Location::Point(p) => {
            let elevation = pool.level_elevation(element.level.as_ref()?)?;
            Some([p[0], p[1], p[2] + elevation])
        }
        Location::Curve(c) => Some(c.midpoint()),
    }
}

/// Relates line elements of the first list to point elements of the second
/// list lying within `tolerance` of the line.
pub fn match_alignment_line_point(
    lists: PairLists<'_, '_>,
    tolerance: f64,
    level: LevelFilter,
    pool: &ElementPool,
) -> Vec<RelationshipRecord> {
    let (list_a, list_b) = lists;

    let points: Vec<(&Element, [f64; 3])> = list_b
        .iter()
        .filter_map(|b| match absolute_point(b, pool) {
            Some(p) => Some((*b, p)),
            None => {
                tracing::debug!(id = %b.id, "No absolute location point, skipped");
                None
            }
        })
        .collect();

    let mut out = Vec::new();
    for a in list_a {
        let Some(line) = a.curve() else {
            continue;
        };
        for (b, point) in &points {
            if same_element(a, b) || !levels_pass(level, a, b) {
                continue;
            }
            match point_near_line(line, point, PARALLEL_TOLERANCE, SEGMENT_TOLERANCE) {
                Some((_, distance)) if distance <= tolerance => {
                    out.push(RelationshipRecord::ordered(a.id.clone(), b.id.clone()));
                }
                _ => {}
            }
        }
    }
    out
}

/// Relates walls whose face lines meet, extended by the other wall's half
/// width. Walls without a width are treated as zero-width lines.
pub fn match_via_line_intersection(
    lists: PairLists<'_, '_>,
    level: LevelFilter,
) -> Vec<RelationshipRecord> {
    let (list_a, list_b) = lists;
    let mut out = Vec::new();
    for a in list_a {
        let Some(line_a) = a.curve() else {
            continue;
        };
        let width_a = a.width.unwrap_or(0.0);
        for b in list_b {
            if same_element(a, b) || !levels_pass(level, a, b) {
                continue;
            }
            let Some(line_b) = b.curve() else {
                continue;
            };
            let width_b = b.width.unwrap_or(0.0);
            if walls_intersect_by_faces(line_a, width_a, line_b, width_b, true, INTERSECTION_TOLERANCE) {
                out.push(RelationshipRecord::ordered(a.id.clone(), b.id.clone()));
            }
        }
    }
    out
}

/// Index combinations of `k` out of `n`, in lexicographic order.
fn combinations(n: usize, k: usize) -> impl Iterator<Item = Vec<usize>> {
    let mut next = (k <= n).then(|| (0..k).collect::<Vec<_>>());
    std::iter::from_fn(move || {
        let current = next.take()?;
        let mut idx = current.clone();
        let mut i = k;
        while i > 0 {
            i -= 1;
            if idx[i] != i + n - k {
                idx[i] += 1;
                for j in i + 1..k {
                    idx[j] = idx[j - 1] + 1;
                }
                next = Some(idx);
                break;
            }
        }
        Some(current)
    })
}

/// Groups of `size` elements from the first list, on one level, whose
/// location points are collinear.
///
/// Elements without a level or location are left out. The number of
/// candidate groups grows combinatorially with the level population.
pub fn match_alignment_point_group(
    lists: PairLists<'_, '_>,
    size: usize,
    tolerance: f64,
) -> Vec<RelationshipRecord> {
    let (list_a, _) = lists;
    if size < 2 {
        return Vec::new();
    }

    // level id -> (element, point), first-seen level order
    let mut by_level: Vec<(&LevelId, Vec<(&Element, [f64; 3])>)> = Vec::new();
    for e in list_a {
        let (Some(level), Some(location)) = (&e.level, &e.location) else {
            continue;
        };
        let entry = match by_level.iter_mut().position(|(l, _)| *l == level) {
            Some(i) => &mut by_level[i].1,
            None => {
                by_level.push((level, Vec::new()));
                let last = by_level.len() - 1;
                &mut by_level[last].1
            }
        };
        entry.push((*e, location.point()));
    }

    let mut out = Vec::new();
    for (level, members) in &by_level {
        tracing::trace!(level = %level, count = members.len(), size, "Point groups on level");
        for combo in combinations(members.len(), size) {
            let points: Vec<[f64; 3]> = combo.iter().map(|&i| members[i].1).collect();
            if points_collinear(&points, tolerance) {
                out.push(RelationshipRecord::Group(
                    combo.iter().map(|&i| members[i].0.id.clone()).collect(),
                ));
            }
        }
    }
    out
}
