// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Category scope resolution.
//!
//! A relationship class declares the categories it reasons about. The scope
//! resolver partitions the pool by those categories and exposes every ordered
//! pair (self-pairs included) as a [`PairKey`] → `(list A, list B)` lookup.

use rustc_hash::FxHashMap;

use crate::element::Element;
use crate::error::{Error, Result};
use crate::keys::{Category, PairKey};
use crate::pool::ElementPool;

/// Borrowed element lists indexed by category pair.
#[derive(Debug, Default)]
pub struct CategoryPairIndex<'a> {
    categories: Vec<Category>,
    lists: FxHashMap<Category, Vec<&'a Element>>,
}

impl<'a> CategoryPairIndex<'a> {
    /// Returns the two element lists for `key`, or `MissingPair` if either
    /// category lies outside the scope.
    pub fn get(&self, key: PairKey) -> Result<(&[&'a Element], &[&'a Element])> {
        match (self.lists.get(&key.first), self.lists.get(&key.second)) {
            (Some(a), Some(b)) => Ok((a.as_slice(), b.as_slice())),
            _ => Err(Error::MissingPair(key)),
        }
    }

    pub fn contains(&self, key: PairKey) -> bool {
        self.lists.contains_key(&key.first) && self.lists.contains_key(&key.second)
    }

    /// All ordered pair keys of the scope, self-pairs included.
    pub fn keys(&self) -> impl Iterator<Item = PairKey> + '_ {
        self.categories.iter().flat_map(move |&a| {
            self.categories.iter().map(move |&b| PairKey::new(a, b))
        })
    }

    /// Elements of one scoped category.
    pub fn elements(&self, category: Category) -> &[&'a Element] {
        self.lists
            .get(&category)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

/// Builds the pair index for `categories` over the whole pool.
pub fn build_scope<'a>(pool: &'a ElementPool, categories: &[Category]) -> CategoryPairIndex<'a> {
    build_scope_filtered(pool, categories, |_| true)
}

/// Builds the pair index keeping only elements accepted by `filter`.
pub fn build_scope_filtered<'a>(
    pool: &'a ElementPool,
    categories: &[Category],
    filter: impl Fn(&Element) -> bool,
) -> CategoryPairIndex<'a> {
    let mut index = CategoryPairIndex::default();
    for &category in categories {
        if index.lists.contains_key(&category) {
            continue;
        }
        let list: Vec<&Element> = pool
            .elements(category)
            .iter()
            .filter(|e| filter(*e))
            .collect();
        tracing::trace!(category = %category, count = list.len(), "Scoped category");
        index.categories.push(category);
        index.lists.insert(category, list);
    }
    index
}

/// Builds the pair index from category names.
///
/// Fails on the first name without a category mapping, before any pair is
/// resolved.
pub fn build_scope_by_names<'a>(
    pool: &'a ElementPool,
    names: &[&str],
) -> Result<CategoryPairIndex<'a>> {
    let categories = names
        .iter()
        .map(|n| n.parse::<Category>())
        .collect::<Result<Vec<_>>>()?;
    Ok(build_scope(pool, &categories))
}
