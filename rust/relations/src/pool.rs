// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The element pool: a read-only snapshot of all elements in one run.
//!
//! Elements are grouped by category in input order. Nothing mutates the pool
//! once it is built; matchers only ever borrow it.

use std::collections::BTreeMap;
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::element::{Element, Level};
use crate::error::{Error, Result};
use crate::keys::{Category, ElementId, LevelId};

/// On-disk form of an element pool, as written by the extraction layer.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PoolSnapshot {
    #[serde(default)]
    pub levels: Vec<Level>,
    /// Design phases, oldest first.
    #[serde(default)]
    pub phases: Vec<String>,
    #[serde(default)]
    pub elements: Vec<Element>,
}

/// Elements grouped by category, plus the levels and phases they refer to.
#[derive(Debug, Default)]
pub struct ElementPool {
    by_category: BTreeMap<Category, Vec<Element>>,
    index: FxHashMap<ElementId, (Category, usize)>,
    levels: FxHashMap<LevelId, Level>,
    phases: Vec<String>,
}

impl ElementPool {
    /// Builds a pool from elements alone (no levels, no phases).
    pub fn from_elements(elements: impl IntoIterator<Item = Element>) -> Result<Self> {
        Self::from_snapshot(PoolSnapshot {
            elements: elements.into_iter().collect(),
            ..Default::default()
        })
    }

    /// Builds a pool from a snapshot. Fails on duplicate element ids.
    pub fn from_snapshot(snapshot: PoolSnapshot) -> Result<Self> {
        let mut pool = ElementPool {
            phases: snapshot.phases,
            levels: snapshot
                .levels
                .into_iter()
                .map(|l| (l.id.clone(), l))
                .collect(),
            ..Default::default()
        };

        for element in snapshot.elements {
            let bucket = pool.by_category.entry(element.category).or_default();
            if pool.index.contains_key(&element.id) {
                return Err(Error::DuplicateElement(element.id));
            }
            pool.index
                .insert(element.id.clone(), (element.category, bucket.len()));
            bucket.push(element);
        }

        tracing::debug!(
            elements = pool.index.len(),
            levels = pool.levels.len(),
            phases = pool.phases.len(),
            "Built element pool"
        );
        Ok(pool)
    }

    /// Parses a pool snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: PoolSnapshot = serde_json::from_str(json)?;
        Self::from_snapshot(snapshot)
    }

    /// Reads a pool snapshot from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn add_level(&mut self, id: impl Into<LevelId>, elevation: f64) {
        let id = id.into();
        self.levels.insert(
            id.clone(),
            Level {
                id,
                name: None,
                elevation,
            },
        );
    }

    pub fn add_phase(&mut self, phase: impl Into<String>) {
        self.phases.push(phase.into());
    }

    /// Elements of one category in input order (empty if absent).
    pub fn elements(&self, category: Category) -> &[Element] {
        self.by_category
            .get(&category)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Looks up an element by id.
    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        let &(category, idx) = self.index.get(id)?;
        self.by_category.get(&category)?.get(idx)
    }

    pub fn level(&self, id: &LevelId) -> Option<&Level> {
        self.levels.get(id)
    }

    /// Elevation of a level, if the level is known.
    pub fn level_elevation(&self, id: &LevelId) -> Option<f64> {
        self.levels.get(id).map(|l| l.elevation)
    }

    pub fn phases(&self) -> &[String] {
        &self.phases
    }

    /// The phase used for directional door matching: `requested` if given,
    /// otherwise the most recent phase of the pool.
    ///
    /// The fallback is the last phase, the one a model is usually being
    /// worked in. Relationship files written against the first phase are
    /// reproduced by requesting that phase explicitly.
    pub fn active_phase<'a>(&'a self, requested: Option<&'a str>) -> Option<&'a str> {
        requested.or_else(|| self.phases.last().map(String::as_str))
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Categories present in the pool.
    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.by_category.keys().copied()
    }
}
