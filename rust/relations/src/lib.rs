// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # IFC-Lite Relations
//!
//! Infers semantic relationships between building elements (slabs, spaces,
//! walls, doors, windows, columns, stairs and room separation lines) from
//! their geometry and metadata.
//!
//! Five relationship classes are built on the same engine:
//!
//! - **Accessible connectivity**: spaces reachable through doors,
//!   separation lines and stairs.
//! - **Adjacent connectivity**: physical contact between elements.
//! - **Spatial containment**: elements inside spaces, openings in walls.
//! - **Structural support**: load paths between walls, columns and slabs.
//! - **Locational alignment**: walls and columns sharing axes.
//!
//! Each class owns a dispatch matrix from category pairs to matching
//! strategies. Tolerances adapt to the model: they derive from the thickest
//! slab, wall and column found in the element pool.
//!
//! ```no_run
//! use ifc_lite_relations::{AdjacentConnectivity, ElementPool, EngineContext, RelationshipClass};
//!
//! let pool = ElementPool::load("pool.json")?;
//! let adjacency = AdjacentConnectivity.construct(&pool, &EngineContext::default());
//! println!("{}", serde_json::to_string_pretty(&adjacency)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod classes;
pub mod config;
pub mod derived;
pub mod dispatch;
pub mod element;
pub mod error;
pub mod geometry;
pub mod keys;
pub mod matchers;
pub mod pool;
pub mod record;
pub mod scope;
pub mod serialization;
pub mod strategy;
pub mod tolerance;

pub use classes::{
    construct_all, AccessibleConnectivity, AdjacentConnectivity, LocationalAlignment,
    RelationshipClass, RelationshipKind, SpatialContainment, StructuralSupport,
};
pub use config::Config;
pub use dispatch::{Dispatcher, EngineContext, StrategyResolver};
pub use element::{Element, Location};
pub use error::{Error, Result};
pub use keys::{Category, ElementId, LevelId, PairKey};
pub use pool::{ElementPool, PoolSnapshot};
pub use record::{RelationKey, RelationshipCollection, RelationshipRecord};
pub use scope::{build_scope, CategoryPairIndex};
pub use strategy::{DispatchMatrix, MatchStrategy, StrategyTag};
pub use tolerance::ToleranceContext;
