// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Building element records as handed over by the geometry extraction layer.
//!
//! An element is plain data: identity, category, level reference and
//! whatever geometry the authoring tool could provide. Any of the geometric
//! fields may be missing; matchers treat absence as "no match" and move on.

use serde::{Deserialize, Serialize};

use crate::geometry::{BoundingBox3, Segment3};
use crate::keys::{Category, ElementId, LevelId};

/// Placement of an element: a single point or a location curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    /// Point placement. For columns the z coordinate is relative to the
    /// element's level.
    Point([f64; 3]),
    /// Curve placement (walls, separation lines, slanted columns).
    Curve(Segment3),
}

impl Location {
    pub fn as_curve(&self) -> Option<&Segment3> {
        match self {
            Location::Curve(s) => Some(s),
            Location::Point(_) => None,
        }
    }

    /// Representative point: the point itself, or the curve midpoint.
    pub fn point(&self) -> [f64; 3] {
        match self {
            Location::Point(p) => *p,
            Location::Curve(s) => s.midpoint(),
        }
    }
}

/// One segment of a space boundary loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundarySegment {
    /// The element forming this part of the boundary (wall, separation line).
    #[serde(default)]
    pub element: Option<ElementId>,
    /// The raw boundary curve.
    #[serde(default)]
    pub curve: Option<Segment3>,
}

/// Structural role of a wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuralUsage {
    NonBearing,
    Bearing,
    Shear,
    Combined,
}

/// The spaces on either side of a door in one design phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseRooms {
    pub phase: String,
    #[serde(default)]
    pub from_room: Option<ElementId>,
    #[serde(default)]
    pub to_room: Option<ElementId>,
}

/// A building level (storey).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub id: LevelId,
    #[serde(default)]
    pub name: Option<String>,
    pub elevation: f64,
}

/// A typed building element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub category: Category,
    #[serde(default)]
    pub level: Option<LevelId>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub bounding_box: Option<BoundingBox3>,
    /// Boundary loops (spaces only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub boundary: Vec<Vec<BoundarySegment>>,

    /// Wall width.
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub room_bounding: Option<bool>,
    #[serde(default)]
    pub structural_usage: Option<StructuralUsage>,

    /// Space name and number.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub number: Option<String>,

    /// Stair elevations.
    #[serde(default)]
    pub base_elevation: Option<f64>,
    #[serde(default)]
    pub top_elevation: Option<f64>,

    /// Host wall of a door or window.
    #[serde(default)]
    pub host: Option<ElementId>,
    /// Door from/to spaces per design phase.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phase_rooms: Vec<PhaseRooms>,
}

impl Element {
    /// Creates an element with identity and category only.
    pub fn new(id: impl Into<ElementId>, category: Category) -> Self {
        Self {
            id: id.into(),
            category,
            level: None,
            location: None,
            bounding_box: None,
            boundary: Vec::new(),
            width: None,
            room_bounding: None,
            structural_usage: None,
            name: None,
            number: None,
            base_elevation: None,
            top_elevation: None,
            host: None,
            phase_rooms: Vec::new(),
        }
    }

    pub fn with_level(mut self, level: impl Into<LevelId>) -> Self {
        self.level = Some(level.into());
        self
    }

    pub fn with_bounding_box(mut self, min: [f64; 3], max: [f64; 3]) -> Self {
        self.bounding_box = Some(BoundingBox3::new(min, max));
        self
    }

    pub fn with_point(mut self, point: [f64; 3]) -> Self {
        self.location = Some(Location::Point(point));
        self
    }

    pub fn with_curve(mut self, start: [f64; 3], end: [f64; 3]) -> Self {
        self.location = Some(Location::Curve(Segment3::new(start, end)));
        self
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_host(mut self, host: impl Into<ElementId>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_boundary(mut self, loops: Vec<Vec<BoundarySegment>>) -> Self {
        self.boundary = loops;
        self
    }

    pub fn with_phase_rooms(
        mut self,
        phase: &str,
        from_room: Option<&str>,
        to_room: Option<&str>,
    ) -> Self {
        self.phase_rooms.push(PhaseRooms {
            phase: phase.to_string(),
            from_room: from_room.map(ElementId::from),
            to_room: to_room.map(ElementId::from),
        });
        self
    }

    /// Location curve, if the element is placed by one.
    pub fn curve(&self) -> Option<&Segment3> {
        self.location.as_ref().and_then(Location::as_curve)
    }

    /// Ids of all elements referenced by the boundary loops, in loop order.
    pub fn boundary_elements(&self) -> impl Iterator<Item = &ElementId> {
        self.boundary
            .iter()
            .flatten()
            .filter_map(|seg| seg.element.as_ref())
    }

    /// From/to spaces of a door in the given phase.
    pub fn rooms_in_phase(&self, phase: &str) -> Option<&PhaseRooms> {
        self.phase_rooms.iter().find(|p| p.phase == phase)
    }

    /// Whether the element carries load.
    ///
    /// Columns always do; walls do unless marked non-bearing. Walls with no
    /// structural usage are treated as bearing.
    pub fn is_structural(&self) -> bool {
        match self.category {
            Category::Column => true,
            Category::Wall => self.structural_usage != Some(StructuralUsage::NonBearing),
            _ => false,
        }
    }

    /// Approximate `(width, length)` of a space from the XY extent of its
    /// boundary curves. Width is the shorter side.
    pub fn room_dimensions(&self) -> Option<(f64, f64)> {
        let mut points = self
            .boundary
            .iter()
            .flatten()
            .filter_map(|seg| seg.curve.as_ref())
            .flat_map(|c| [c.start, c.end])
            .peekable();
        points.peek()?;

        let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
        for p in points {
            min_x = min_x.min(p[0]);
            max_x = max_x.max(p[0]);
            min_y = min_y.min(p[1]);
            max_y = max_y.max(p[1]);
        }

        let dx = max_x - min_x;
        let dy = max_y - min_y;
        Some((dx.min(dy), dx.max(dy)))
    }
}

/// Builds a boundary segment referencing `element` along `curve`.
pub fn boundary_segment(element: &str, curve: Option<Segment3>) -> BoundarySegment {
    BoundarySegment {
        element: Some(ElementId::from(element)),
        curve,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rectangle_loop(w: f64, l: f64) -> Vec<BoundarySegment> {
        let c = [[0.0, 0.0, 0.0], [l, 0.0, 0.0], [l, w, 0.0], [0.0, w, 0.0]];
        (0..4)
            .map(|i| boundary_segment(&format!("{}", 10 + i), Some(Segment3::new(c[i], c[(i + 1) % 4]))))
            .collect()
    }

    #[test]
    fn room_dimensions_from_boundary() {
        let room = Element::new("1", Category::Space).with_boundary(vec![rectangle_loop(3.0, 5.0)]);
        assert_eq!(room.room_dimensions(), Some((3.0, 5.0)));
    }

    #[test]
    fn room_dimensions_without_curves() {
        let room = Element::new("1", Category::Space)
            .with_boundary(vec![vec![boundary_segment("10", None)]]);
        assert_eq!(room.room_dimensions(), None);
    }

    #[test]
    fn boundary_elements_skip_unreferenced_segments() {
        let mut lp = rectangle_loop(1.0, 1.0);
        lp[1].element = None;
        let room = Element::new("1", Category::Space).with_boundary(vec![lp]);
        let ids: Vec<&str> = room.boundary_elements().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["10", "12", "13"]);
    }

    #[test]
    fn structural_classification() {
        let column = Element::new("1", Category::Column);
        let mut wall = Element::new("2", Category::Wall);
        let door = Element::new("3", Category::Door);
        assert!(column.is_structural());
        assert!(wall.is_structural());
        wall.structural_usage = Some(StructuralUsage::NonBearing);
        assert!(!wall.is_structural());
        wall.structural_usage = Some(StructuralUsage::Shear);
        assert!(wall.is_structural());
        assert!(!door.is_structural());
    }

    #[test]
    fn location_representative_point() {
        let wall = Element::new("1", Category::Wall).with_curve([0.0; 3], [4.0, 2.0, 0.0]);
        assert_eq!(wall.location.unwrap().point(), [2.0, 1.0, 0.0]);
        assert!(wall.curve().is_some());

        let column = Element::new("2", Category::Column).with_point([1.0, 1.0, 0.0]);
        assert!(column.curve().is_none());
    }

    #[test]
    fn element_deserializes_with_defaults() {
        let json = r#"{
            "id": "42",
            "category": "separationline",
            "location": {"curve": {"start": [0, 0, 0], "end": [1, 0, 0]}}
        }"#;
        let el: Element = serde_json::from_str(json).unwrap();
        assert_eq!(el.category, Category::SeparationLine);
        assert!(el.level.is_none());
        assert!(el.curve().is_some());
        assert!(el.boundary.is_empty());
    }

    #[test]
    fn door_phase_lookup() {
        let door = Element::new("5", Category::Door)
            .with_phase_rooms("Existing", Some("1"), None)
            .with_phase_rooms("New Construction", Some("1"), Some("2"));
        let rooms = door.rooms_in_phase("New Construction").unwrap();
        assert_eq!(rooms.to_room.as_ref().unwrap().as_str(), "2");
        assert!(door.rooms_in_phase("Demolition").is_none());
    }
}
