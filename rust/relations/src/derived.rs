// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Derived accessibility passes.
//!
//! These run over a finished accessible-connectivity collection and combine
//! its direct records into higher-level ones: space-to-space passages through
//! a door or separation line, vertical passages through chains of stairs,
//! and labels for doors that serve a single space.

use std::collections::{BTreeMap, BTreeSet};

use crate::dispatch::EngineContext;
use crate::keys::{Category, ElementId, PairKey};
use crate::pool::ElementPool;
use crate::record::{RelationKey, RelationshipCollection, RelationshipRecord};

/// Longest stair chain followed when looking for vertical passages.
pub const MAX_STAIR_CHAIN: usize = 3;

/// Label of doors whose from- and to-space are the same space.
pub const DOOR_WITHIN_SPACE: &str = "door-within-space";

/// Label of doors with a space on one side only.
pub const DOOR_TO_EXIT: &str = "door-to-exit";

/// Maps each element of category `via` to the spaces related to it.
fn spaces_by_connector(
    collection: &RelationshipCollection,
    via: Category,
) -> BTreeMap<ElementId, BTreeSet<ElementId>> {
    let mut map: BTreeMap<ElementId, BTreeSet<ElementId>> = BTreeMap::new();
    for record in collection.get(PairKey::new(Category::Space, via)) {
        if let [space, connector] = record.ids()[..] {
            map.entry(connector.clone()).or_default().insert(space.clone());
        }
    }
    map
}

/// Space-to-space passages through connectors of category `via`.
///
/// Every connector related to exactly two spaces yields
/// `Group[space, connector, space]`, spaces in ascending order.
pub fn room_passages(collection: &RelationshipCollection, via: Category) -> Vec<RelationshipRecord> {
    spaces_by_connector(collection, via)
        .into_iter()
        .filter_map(|(connector, spaces)| {
            let mut spaces = spaces.into_iter();
            match (spaces.next(), spaces.next(), spaces.next()) {
                (Some(a), Some(b), None) => Some(RelationshipRecord::Group(vec![a, connector, b])),
                _ => None,
            }
        })
        .collect()
}

/// Doors serving a single space, split by their from/to rooms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoorClassification {
    /// From- and to-room are the same space.
    pub within_space: Vec<ElementId>,
    /// One side has no room.
    pub to_exit: Vec<ElementId>,
}

/// Classifies doors related to exactly one space in `phase`.
pub fn classify_single_room_doors(
    collection: &RelationshipCollection,
    pool: &ElementPool,
    phase: Option<&str>,
) -> DoorClassification {
    let mut out = DoorClassification::default();
    let Some(phase) = phase else {
        return out;
    };

    for (door_id, spaces) in spaces_by_connector(collection, Category::Door) {
        if spaces.len() != 1 {
            continue;
        }
        let Some(rooms) = pool.get(&door_id).and_then(|d| d.rooms_in_phase(phase)) else {
            continue;
        };
        match (&rooms.from_room, &rooms.to_room) {
            (Some(from), Some(to)) if from == to => out.within_space.push(door_id),
            (None, _) | (_, None) => out.to_exit.push(door_id),
            _ => {}
        }
    }
    out
}

/// Spaces joined by a stair or a chain of up to [`MAX_STAIR_CHAIN`] stairs.
///
/// Uses the `space-stair` records as the stair-to-space map and the
/// `stair-stair` records as an undirected stair graph. Each passage is
/// reported once as `Group[space_a, stairs…, space_b]` with
/// `space_a < space_b` and the stairs in walking order from `space_a`.
pub fn vertical_passages(collection: &RelationshipCollection) -> Vec<RelationshipRecord> {
    let mut stair_spaces: BTreeMap<ElementId, BTreeSet<ElementId>> = BTreeMap::new();
    for record in collection.get(PairKey::new(Category::Space, Category::Stair)) {
        if let [space, stair] = record.ids()[..] {
            stair_spaces.entry(stair.clone()).or_default().insert(space.clone());
        }
    }

    let mut graph: BTreeMap<&ElementId, BTreeSet<&ElementId>> = BTreeMap::new();
    for record in collection.get(PairKey::new(Category::Stair, Category::Stair)) {
        if let [a, b] = record.ids()[..] {
            if a != b {
                graph.entry(a).or_default().insert(b);
                graph.entry(b).or_default().insert(a);
            }
        }
    }

    let mut seen: BTreeSet<(ElementId, ElementId, Vec<ElementId>)> = BTreeSet::new();
    let mut out = Vec::new();

    for (start, start_spaces) in &stair_spaces {
        for origin in start_spaces {
            let mut stack: Vec<Vec<&ElementId>> = vec![vec![start]];
            while let Some(path) = stack.pop() {
                if path.len() > MAX_STAIR_CHAIN {
                    continue;
                }
                let Some(&current) = path.last() else {
                    continue;
                };

                if let Some(end_spaces) = stair_spaces.get(current) {
                    for target in end_spaces.iter().filter(|s| *s != origin) {
                        let (low, high, forward) = if origin < target {
                            (origin, target, true)
                        } else {
                            (target, origin, false)
                        };
                        let mut stairs_key: Vec<ElementId> = path.iter().map(|s| (*s).clone()).collect();
                        stairs_key.sort();
                        if !seen.insert((low.clone(), high.clone(), stairs_key)) {
                            continue;
                        }

                        let mut members = Vec::with_capacity(path.len() + 2);
                        members.push(low.clone());
                        if forward {
                            members.extend(path.iter().map(|s| (*s).clone()));
                        } else {
                            members.extend(path.iter().rev().map(|s| (*s).clone()));
                        }
                        members.push(high.clone());
                        out.push(RelationshipRecord::Group(members));
                    }
                }

                if let Some(neighbours) = graph.get(current) {
                    for &next in neighbours {
                        if !path.contains(&next) {
                            let mut extended = path.clone();
                            extended.push(next);
                            stack.push(extended);
                        }
                    }
                }
            }
        }
    }
    out
}

/// Runs every derived pass and stores the results in `collection`.
pub fn apply(collection: &mut RelationshipCollection, pool: &ElementPool, ctx: &EngineContext) {
    let door_passages = room_passages(collection, Category::Door);
    let line_passages = room_passages(collection, Category::SeparationLine);
    let vertical = vertical_passages(collection);
    let phase = pool.active_phase(ctx.phase.as_deref());
    let doors = classify_single_room_doors(collection, pool, phase);

    tracing::debug!(
        door_passages = door_passages.len(),
        line_passages = line_passages.len(),
        vertical = vertical.len(),
        doors_within = doors.within_space.len(),
        doors_to_exit = doors.to_exit.len(),
        "Derived accessibility"
    );

    collection.extend(
        RelationKey::Chain(Category::Space, Category::Door, Category::Space),
        door_passages,
    );
    collection.extend(
        RelationKey::Chain(Category::Space, Category::SeparationLine, Category::Space),
        line_passages,
    );
    collection.extend(
        RelationKey::Chain(Category::Space, Category::Stair, Category::Space),
        vertical,
    );
    collection.label(DOOR_WITHIN_SPACE, doors.within_space);
    collection.label(DOOR_TO_EXIT, doors.to_exit);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;

    const SPACE_DOOR: PairKey = PairKey::new(Category::Space, Category::Door);
    const SPACE_STAIR: PairKey = PairKey::new(Category::Space, Category::Stair);
    const STAIR_STAIR: PairKey = PairKey::new(Category::Stair, Category::Stair);

    fn group(ids: &[&str]) -> RelationshipRecord {
        RelationshipRecord::Group(ids.iter().map(|s| ElementId::from(*s)).collect())
    }

    #[test]
    fn door_between_two_spaces_is_a_passage() {
        let mut c = RelationshipCollection::new();
        c.extend(
            SPACE_DOOR,
            [
                RelationshipRecord::ordered("2", "10"),
                RelationshipRecord::ordered("1", "10"),
                RelationshipRecord::ordered("1", "11"),
                RelationshipRecord::ordered("1", "12"),
                RelationshipRecord::ordered("2", "12"),
                RelationshipRecord::ordered("3", "12"),
            ],
        );
        assert_eq!(room_passages(&c, Category::Door), vec![group(&["1", "10", "2"])]);
        assert!(room_passages(&c, Category::SeparationLine).is_empty());
    }

    #[test]
    fn single_room_doors_are_classified() {
        let mut pool = ElementPool::from_elements([
            Element::new("10", Category::Door).with_phase_rooms("New", Some("1"), Some("1")),
            Element::new("11", Category::Door).with_phase_rooms("New", None, Some("1")),
            Element::new("12", Category::Door).with_phase_rooms("New", Some("1"), Some("2")),
        ])
        .unwrap();
        pool.add_phase("New");

        let mut c = RelationshipCollection::new();
        c.extend(
            SPACE_DOOR,
            [
                RelationshipRecord::ordered("1", "10"),
                RelationshipRecord::ordered("1", "11"),
                RelationshipRecord::ordered("1", "12"),
                RelationshipRecord::ordered("2", "12"),
            ],
        );

        let doors = classify_single_room_doors(&c, &pool, Some("New"));
        assert_eq!(doors.within_space, vec![ElementId::from("10")]);
        assert_eq!(doors.to_exit, vec![ElementId::from("11")]);
        assert_eq!(classify_single_room_doors(&c, &pool, None), DoorClassification::default());
    }

    #[test]
    fn shared_stair_joins_two_spaces() {
        let mut c = RelationshipCollection::new();
        c.extend(
            SPACE_STAIR,
            [RelationshipRecord::ordered("2", "20"), RelationshipRecord::ordered("1", "20")],
        );
        assert_eq!(vertical_passages(&c), vec![group(&["1", "20", "2"])]);
    }

    #[test]
    fn stair_chain_joins_spaces_on_different_levels() {
        let mut c = RelationshipCollection::new();
        c.extend(
            SPACE_STAIR,
            [RelationshipRecord::ordered("1", "20"), RelationshipRecord::ordered("2", "22")],
        );
        c.extend(
            STAIR_STAIR,
            [RelationshipRecord::pair("20", "21"), RelationshipRecord::pair("21", "22")],
        );
        assert_eq!(vertical_passages(&c), vec![group(&["1", "20", "21", "22", "2"])]);
    }

    #[test]
    fn stair_chain_longer_than_limit_is_ignored() {
        let mut c = RelationshipCollection::new();
        c.extend(
            SPACE_STAIR,
            [RelationshipRecord::ordered("1", "20"), RelationshipRecord::ordered("2", "23")],
        );
        c.extend(
            STAIR_STAIR,
            [
                RelationshipRecord::pair("20", "21"),
                RelationshipRecord::pair("21", "22"),
                RelationshipRecord::pair("22", "23"),
            ],
        );
        assert!(vertical_passages(&c).is_empty());
    }

    #[test]
    fn apply_adds_chain_keys_and_labels() {
        let mut pool = ElementPool::from_elements([
            Element::new("10", Category::Door).with_phase_rooms("New", None, Some("1"))
        ])
        .unwrap();
        pool.add_phase("New");

        let mut c = RelationshipCollection::new();
        c.extend(SPACE_DOOR, [RelationshipRecord::ordered("1", "10")]);
        apply(&mut c, &pool, &EngineContext::default());

        assert_eq!(c.labelled(DOOR_TO_EXIT), [ElementId::from("10")]);
        assert!(c.labelled(DOOR_WITHIN_SPACE).is_empty());
        assert!(c
            .keys()
            .any(|k| k.to_string() == "space-stair-space"));
    }
}
