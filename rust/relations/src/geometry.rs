// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometric predicates used by the relationship matchers.
//!
//! Everything here is a pure function over plain coordinates: bounding-box
//! overlap and reshaping, parallel-line distance, point-to-line projection,
//! collinearity and segment intersection. Every floating comparison takes an
//! explicit tolerance; there is no hidden epsilon.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A straight 3D segment between two points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment3 {
    pub start: [f64; 3],
    pub end: [f64; 3],
}

impl Segment3 {
    pub fn new(start: [f64; 3], end: [f64; 3]) -> Self {
        Self { start, end }
    }

    pub fn start_point(&self) -> Point3<f64> {
        Point3::from(self.start)
    }

    pub fn end_point(&self) -> Point3<f64> {
        Point3::from(self.end)
    }

    /// Direction vector from start to end (not normalized).
    pub fn direction(&self) -> Vector3<f64> {
        self.end_point() - self.start_point()
    }

    pub fn length(&self) -> f64 {
        self.direction().norm()
    }

    pub fn midpoint(&self) -> [f64; 3] {
        let m = nalgebra::center(&self.start_point(), &self.end_point());
        [m.x, m.y, m.z]
    }
}

/// An axis-aligned 3D bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox3 {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl BoundingBox3 {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Self { min, max }
    }

    /// Extent along x, y and z.
    pub fn extents(&self) -> [f64; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    pub fn volume(&self) -> f64 {
        bbox_volume(&self.min, &self.max)
    }

    pub fn center(&self) -> [f64; 3] {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        ]
    }

    /// Returns a copy grown (positive) or shrunk (negative) by `delta` on
    /// each side of every axis.
    pub fn reshaped(&self, delta: [f64; 3]) -> Self {
        let (min, max) = bbox_reshape(&self.min, &self.max, delta);
        Self { min, max }
    }

    pub fn overlap_volume(&self, other: &BoundingBox3) -> f64 {
        bbox_overlap_volume(&self.min, &self.max, &other.min, &other.max)
    }
}

/// Volume of the box spanned by `min` and `max`.
pub fn bbox_volume(min: &[f64; 3], max: &[f64; 3]) -> f64 {
    (max[0] - min[0]) * (max[1] - min[1]) * (max[2] - min[2])
}

/// Overlap volume of two axis-aligned boxes.
///
/// Per axis the overlap is `max(0, min(max_i) - max(min_i))`; the volume is
/// the product of the three, so boxes disjoint on any axis give `0.0`.
pub fn bbox_overlap_volume(
    min1: &[f64; 3],
    max1: &[f64; 3],
    min2: &[f64; 3],
    max2: &[f64; 3],
) -> f64 {
    (0..3)
        .map(|i| (max1[i].min(max2[i]) - min1[i].max(min2[i])).max(0.0))
        .product()
}

/// Expands (positive `delta`) or contracts (negative `delta`) a box
/// symmetrically on every axis.
pub fn bbox_reshape(min: &[f64; 3], max: &[f64; 3], delta: [f64; 3]) -> ([f64; 3], [f64; 3]) {
    (
        [min[0] - delta[0], min[1] - delta[1], min[2] - delta[2]],
        [max[0] + delta[0], max[1] + delta[1], max[2] + delta[2]],
    )
}

/// Tests whether two lines are parallel and, if so, returns their distance.
///
/// The lines are parallel when the cross product of their directions has a
/// magnitude of at most `tol`. The distance is the length of the component of
/// `b.start - a.start` orthogonal to the unit direction of `a`. Returns `None`
/// for non-parallel lines and for a degenerate (zero-length) line `a`.
pub fn lines_parallel_with_distance(a: &Segment3, b: &Segment3, tol: f64) -> Option<f64> {
    let dir_a = a.direction();
    let dir_b = b.direction();

    if dir_a.cross(&dir_b).norm() > tol {
        return None;
    }

    let len_a = dir_a.norm();
    if len_a < tol {
        return None;
    }

    let unit_a = dir_a / len_a;
    let diff = b.start_point() - a.start_point();
    let orthogonal = diff - unit_a * diff.dot(&unit_a);
    Some(orthogonal.norm())
}

/// Projects `point` onto the line through `line`.
///
/// Returns `(within_segment, distance)`, where `within_segment` is true when
/// the normalized projection parameter lies in
/// `[-tol_segment, 1 + tol_segment]` and `distance` is the perpendicular
/// distance to the infinite line. Returns `None` when the line is shorter
/// than `tol`.
pub fn point_near_line(
    line: &Segment3,
    point: &[f64; 3],
    tol: f64,
    tol_segment: f64,
) -> Option<(bool, f64)> {
    let dir = line.direction();
    let len = dir.norm();
    if len < tol {
        return None;
    }

    let unit = dir / len;
    let v = Point3::from(*point) - line.start_point();
    let proj_len = v.dot(&unit);
    let t = proj_len / len;
    let within_segment = (-tol_segment..=1.0 + tol_segment).contains(&t);

    let distance = (v - unit * proj_len).norm();
    Some((within_segment, distance))
}

/// Returns `true` if every point lies within `tol` of the line through the
/// first two points (cross-product magnitude test).
///
/// Fewer than two points are trivially collinear. Coincident first points
/// cannot define a line and yield `false`.
pub fn points_collinear(points: &[[f64; 3]], tol: f64) -> bool {
    if points.len() < 2 {
        return true;
    }

    let p0 = Point3::from(points[0]);
    let reference = Point3::from(points[1]) - p0;
    if reference.norm() < tol {
        return false;
    }

    points[2..]
        .iter()
        .all(|p| reference.cross(&(Point3::from(*p) - p0)).norm() <= tol)
}

/// Tests whether two 3D segments intersect.
///
/// Parallel segments intersect only when collinear and overlapping. Otherwise
/// the closest-approach parameters of both lines must lie in `[0, 1]` and the
/// two closest points must coincide within `tol` on every axis.
pub fn segments_intersect(p: &Segment3, q: &Segment3, tol: f64) -> bool {
    let p_dir = p.direction();
    let q_dir = q.direction();
    let r = q.start_point() - p.start_point();
    let cross_dir = p_dir.cross(&q_dir);

    if cross_dir.norm() <= tol {
        if p_dir.cross(&r).norm() > tol {
            return false; // parallel, not collinear
        }
        let p_len_sq = p_dir.dot(&p_dir);
        if p_len_sq <= tol * tol {
            return false;
        }
        let t0 = r.dot(&p_dir) / p_len_sq;
        let t1 = (q.end_point() - p.start_point()).dot(&p_dir) / p_len_sq;
        let in_unit = |t: f64| (0.0..=1.0).contains(&t);
        // q covering p entirely also counts as overlap
        return in_unit(t0) || in_unit(t1) || (t0.min(t1) < 0.0 && t0.max(t1) > 1.0);
    }

    let denom = cross_dir.dot(&cross_dir);
    let t = r.cross(&q_dir).dot(&cross_dir) / denom;
    let s = r.cross(&p_dir).dot(&cross_dir) / denom;

    if !(0.0..=1.0).contains(&t) || !(0.0..=1.0).contains(&s) {
        return false;
    }

    let on_p = p.start_point() + p_dir * t;
    let on_q = q.start_point() + q_dir * s;
    (on_p - on_q).iter().all(|c| c.abs() < tol)
}

/// The two copies of `segment` offset by `±width / 2` along its XY normal.
///
/// Returns `None` for segments with no horizontal extent (vertical or
/// zero-length), which have no defined XY normal.
pub fn offset_segment_pair(segment: &Segment3, width: f64) -> Option<[Segment3; 2]> {
    let d = width * 0.5;
    let dir = segment.direction();
    let len_xy = (dir.x * dir.x + dir.y * dir.y).sqrt();
    if len_xy == 0.0 {
        return None;
    }

    let normal = Vector3::new(-dir.y / len_xy, dir.x / len_xy, 0.0) * d;
    let shift = |s: Point3<f64>, sign: f64| {
        let p = s + normal * sign;
        [p.x, p.y, p.z]
    };

    Some([
        Segment3::new(shift(segment.start_point(), 1.0), shift(segment.end_point(), 1.0)),
        Segment3::new(shift(segment.start_point(), -1.0), shift(segment.end_point(), -1.0)),
    ])
}

/// Extends `segment` by `length / 2` beyond each end along its direction.
///
/// A zero-length segment is returned unchanged.
pub fn extend_segment(segment: &Segment3, length: f64) -> Segment3 {
    let dir = segment.direction();
    let len = dir.norm();
    if len == 0.0 {
        return *segment;
    }

    let step = dir / len * (length * 0.5);
    let start = segment.start_point() - step;
    let end = segment.end_point() + step;
    Segment3::new([start.x, start.y, start.z], [end.x, end.y, end.z])
}

/// Tests whether two walls, given by their location lines and widths, meet.
///
/// Each wall is replaced by its two face lines (offset by half its width).
/// With `extend` set, each face line is also lengthened by half the *other*
/// wall's width, so corner joints where the faces stop short still register.
pub fn walls_intersect_by_faces(
    a: &Segment3,
    width_a: f64,
    b: &Segment3,
    width_b: f64,
    extend: bool,
    tol: f64,
) -> bool {
    let (Some(faces_a), Some(faces_b)) = (offset_segment_pair(a, width_a), offset_segment_pair(b, width_b))
    else {
        return false;
    };

    let faces_a = if extend {
        faces_a.map(|s| extend_segment(&s, width_b))
    } else {
        faces_a
    };
    let faces_b = if extend {
        faces_b.map(|s| extend_segment(&s, width_a))
    } else {
        faces_b
    };

    faces_a
        .iter()
        .any(|fa| faces_b.iter().any(|fb| segments_intersect(fa, fb, tol)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn seg(a: [f64; 3], b: [f64; 3]) -> Segment3 {
        Segment3::new(a, b)
    }

    #[test]
    fn overlap_of_disjoint_boxes_is_zero() {
        let v = bbox_overlap_volume(&[0.0; 3], &[1.0; 3], &[2.0; 3], &[3.0; 3]);
        assert_eq!(v, 0.0);
    }

    #[test]
    fn overlap_is_symmetric() {
        let boxes = [
            ([0.0, 0.0, 0.0], [2.0, 3.0, 4.0]),
            ([1.0, -1.0, 0.5], [5.0, 1.5, 2.0]),
            ([-3.0, -3.0, -3.0], [0.5, 0.5, 0.5]),
            ([10.0, 10.0, 10.0], [11.0, 11.0, 11.0]),
        ];
        for (min1, max1) in &boxes {
            for (min2, max2) in &boxes {
                assert_eq!(
                    bbox_overlap_volume(min1, max1, min2, max2),
                    bbox_overlap_volume(min2, max2, min1, max1)
                );
            }
        }
    }

    #[test]
    fn overlap_of_partially_overlapping_boxes() {
        let v = bbox_overlap_volume(&[0.0; 3], &[2.0; 3], &[1.0; 3], &[3.0; 3]);
        assert_relative_eq!(v, 1.0);
    }

    #[test]
    fn touching_boxes_do_not_overlap() {
        let v = bbox_overlap_volume(&[0.0; 3], &[1.0; 3], &[1.0, 0.0, 0.0], &[2.0, 1.0, 1.0]);
        assert_eq!(v, 0.0);
    }

    #[test]
    fn reshape_expands_and_contracts() {
        let b = BoundingBox3::new([0.0; 3], [4.0, 4.0, 3.0]);
        let grown = b.reshaped([0.5, 0.5, 0.0]);
        assert_eq!(grown.min, [-0.5, -0.5, 0.0]);
        assert_eq!(grown.max, [4.5, 4.5, 3.0]);

        let shrunk = b.reshaped([0.0, 0.0, -0.5]);
        assert_eq!(shrunk.min, [0.0, 0.0, 0.5]);
        assert_eq!(shrunk.max, [4.0, 4.0, 2.5]);
    }

    #[test]
    fn reshape_lets_touching_boxes_overlap() {
        let a = BoundingBox3::new([0.0; 3], [1.0; 3]);
        let b = BoundingBox3::new([0.0, 0.0, 1.0], [1.0, 1.0, 2.0]);
        assert_eq!(a.overlap_volume(&b), 0.0);
        let tol = [0.0, 0.0, 0.1];
        assert!(a.reshaped(tol).overlap_volume(&b.reshaped(tol)) > 0.0);
    }

    #[test]
    fn parallel_horizontal_segments_distance() {
        let a = seg([0.0, 0.0, 0.0], [10.0, 0.0, 0.0]);
        let b = seg([2.0, 5.0, 0.0], [8.0, 5.0, 0.0]);
        let d = lines_parallel_with_distance(&a, &b, 1e-5).unwrap();
        assert_relative_eq!(d, 5.0, epsilon = 1e-5);
    }

    #[test]
    fn antiparallel_segments_are_parallel() {
        let a = seg([0.0, 0.0, 0.0], [10.0, 0.0, 0.0]);
        let b = seg([8.0, 2.0, 0.0], [2.0, 2.0, 0.0]);
        let d = lines_parallel_with_distance(&a, &b, 1e-5).unwrap();
        assert_relative_eq!(d, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn perpendicular_segments_are_not_parallel() {
        let a = seg([0.0, 0.0, 0.0], [10.0, 0.0, 0.0]);
        let b = seg([0.0, 0.0, 0.0], [0.0, 10.0, 0.0]);
        assert!(lines_parallel_with_distance(&a, &b, 1e-5).is_none());
    }

    #[test]
    fn degenerate_line_is_not_parallel() {
        let a = seg([1.0, 1.0, 1.0], [1.0, 1.0, 1.0]);
        let b = seg([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
        assert!(lines_parallel_with_distance(&a, &b, 1e-5).is_none());
    }

    #[test]
    fn point_projection_inside_and_outside_segment() {
        let line = seg([0.0, 0.0, 0.0], [10.0, 0.0, 0.0]);

        let (within, d) = point_near_line(&line, &[5.0, 3.0, 0.0], 1e-5, 0.05).unwrap();
        assert!(within);
        assert_relative_eq!(d, 3.0, epsilon = 1e-12);

        let (within, d) = point_near_line(&line, &[20.0, 1.0, 0.0], 1e-5, 0.05).unwrap();
        assert!(!within);
        assert_relative_eq!(d, 1.0, epsilon = 1e-12);

        // just past the end, inside the segment tolerance
        let (within, _) = point_near_line(&line, &[10.4, 0.0, 0.0], 1e-5, 0.05).unwrap();
        assert!(within);
    }

    #[test]
    fn point_near_degenerate_line() {
        let line = seg([1.0, 2.0, 3.0], [1.0, 2.0, 3.0]);
        assert!(point_near_line(&line, &[0.0; 3], 1e-5, 0.05).is_none());
    }

    #[test]
    fn collinear_points() {
        let pts = [[0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [2.0, 2.0, 0.0], [5.0, 5.0, 0.0]];
        assert!(points_collinear(&pts, 1e-5));

        let off = [[0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [2.0, 2.5, 0.0]];
        assert!(!points_collinear(&off, 1e-5));

        assert!(points_collinear(&[[3.0, 3.0, 3.0]], 1e-5));
        assert!(!points_collinear(&[[0.0; 3], [0.0; 3], [1.0, 0.0, 0.0]], 1e-5));
    }

    #[test]
    fn crossing_segments_intersect() {
        let a = seg([0.0, 0.0, 0.0], [4.0, 4.0, 0.0]);
        let b = seg([0.0, 4.0, 0.0], [4.0, 0.0, 0.0]);
        assert!(segments_intersect(&a, &b, 1e-5));
    }

    #[test]
    fn skew_segments_do_not_intersect() {
        let a = seg([0.0, 0.0, 0.0], [4.0, 0.0, 0.0]);
        let b = seg([2.0, -2.0, 1.0], [2.0, 2.0, 1.0]);
        assert!(!segments_intersect(&a, &b, 1e-5));
    }

    #[test]
    fn collinear_segments_overlap_or_not() {
        let a = seg([0.0, 0.0, 0.0], [4.0, 0.0, 0.0]);
        let overlapping = seg([3.0, 0.0, 0.0], [6.0, 0.0, 0.0]);
        let apart = seg([5.0, 0.0, 0.0], [6.0, 0.0, 0.0]);
        let covering = seg([-1.0, 0.0, 0.0], [9.0, 0.0, 0.0]);
        assert!(segments_intersect(&a, &overlapping, 1e-5));
        assert!(!segments_intersect(&a, &apart, 1e-5));
        assert!(segments_intersect(&a, &covering, 1e-5));
    }

    #[test]
    fn offset_pair_of_horizontal_segment() {
        let s = seg([0.0, 0.0, 1.0], [4.0, 0.0, 1.0]);
        let [left, right] = offset_segment_pair(&s, 0.2).unwrap();
        assert_relative_eq!(left.start[1], 0.1);
        assert_relative_eq!(right.start[1], -0.1);
        assert_relative_eq!(left.end[2], 1.0);
        assert!(offset_segment_pair(&seg([0.0; 3], [0.0, 0.0, 3.0]), 0.2).is_none());
    }

    #[test]
    fn extend_segment_both_ends() {
        let s = extend_segment(&seg([0.0; 3], [4.0, 0.0, 0.0]), 1.0);
        assert_relative_eq!(s.start[0], -0.5);
        assert_relative_eq!(s.end[0], 4.5);
        assert_relative_eq!(s.length(), 5.0);
    }

    #[test]
    fn corner_walls_meet_through_face_lines() {
        // L-corner where wall centerlines stop at each other's axis
        let a = seg([0.0, 0.0, 0.0], [4.0, 0.0, 0.0]);
        let b = seg([4.0, 0.0, 0.0], [4.0, 4.0, 0.0]);
        assert!(walls_intersect_by_faces(&a, 0.2, &b, 0.2, true, 1e-5));

        let far = seg([4.5, 0.5, 0.0], [4.5, 4.0, 0.0]);
        assert!(!walls_intersect_by_faces(&a, 0.2, &far, 0.2, true, 1e-5));
    }
}
