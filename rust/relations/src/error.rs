// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for relationship inference.
//!
//! Only configuration and I/O problems are errors. Degenerate geometry is
//! never an error: matchers skip the offending element and continue.

use crate::keys::{ElementId, PairKey};

/// Result type alias for relationship operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or running relationship inference.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A category name has no entry in the category table.
    #[error("no category mapping for: {0}")]
    UnknownCategory(String),

    /// A pair key is not of the form `"{category}-{category}"`.
    #[error("malformed category pair key: {0}")]
    MalformedPairKey(String),

    /// A strategy tag names no known matching strategy.
    #[error("unrecognized strategy tag: {0}")]
    UnknownStrategy(String),

    /// A relationship class name matches none of the known classes.
    #[error("unknown relationship class: {0}")]
    UnknownRelationship(String),

    /// A dispatch rule references a pair that is not in the category scope.
    #[error("category pair {0} is not in the relationship scope")]
    MissingPair(PairKey),

    /// Two elements in the pool share an id.
    #[error("duplicate element id: {0}")]
    DuplicateElement(ElementId),

    /// Filesystem error while reading a pool or writing relationships.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
