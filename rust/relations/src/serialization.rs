// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON output of relationship collections.
//!
//! Each class is written to its own `e-<kind>.json` file as an object from
//! bucket key to a list of id arrays. Keys without records are left out, and
//! a class with no records at all produces no file.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::classes::RelationshipKind;
use crate::error::Result;
use crate::record::RelationshipCollection;

/// File name for a relationship class, e.g. `e-spatial_containment.json`.
pub fn file_name(kind: RelationshipKind) -> String {
    format!("e-{}.json", kind.as_str())
}

/// JSON object of the non-empty buckets and labels of `collection`.
pub fn to_json(collection: &RelationshipCollection) -> Result<Map<String, Value>> {
    let Value::Object(map) = serde_json::to_value(collection)? else {
        return Ok(Map::new());
    };
    Ok(map
        .into_iter()
        .filter(|(_, v)| !matches!(v, Value::Array(items) if items.is_empty()))
        .collect())
}

/// Writes `collection` to `dir/e-<kind>.json`, creating `dir` if needed.
///
/// Returns the written path, or `None` when the collection holds no records.
pub fn write_collection(
    dir: &Path,
    kind: RelationshipKind,
    collection: &RelationshipCollection,
) -> Result<Option<PathBuf>> {
    let map = to_json(collection)?;
    if map.is_empty() {
        tracing::info!(relationship = %kind, "No relationships, nothing written");
        return Ok(None);
    }

    fs::create_dir_all(dir)?;
    let path = dir.join(file_name(kind));
    let json = serde_json::to_string_pretty(&Value::Object(map))?;
    fs::write(&path, json)?;

    tracing::info!(relationship = %kind, path = %path.display(), "Wrote relationships");
    Ok(Some(path))
}
