// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Run configuration loaded from environment variables.

use std::path::PathBuf;

use crate::classes::RelationshipKind;
use crate::dispatch::{EngineContext, DEFAULT_INCLUSION_FACTOR};

/// Run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory the `e-<kind>.json` files are written to.
    pub output_dir: PathBuf,
    /// Design phase for door from/to rooms (latest phase if unset).
    pub phase: Option<String>,
    /// Relationship classes to construct.
    pub classes: Vec<RelationshipKind>,
    /// Overlap fraction for inclusion matching.
    pub inclusion_factor: f64,
    /// Only load-bearing walls and columns in structural support.
    pub structural_only: bool,
    /// Run the derived accessibility passes.
    pub derived: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, falling back to defaults for
    /// missing or unparsable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            output_dir: lookup("RELATIONS_OUTPUT_DIR")
                .unwrap_or_else(|| "./relations".into())
                .into(),
            phase: lookup("RELATIONS_PHASE")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            classes: lookup("RELATIONS_CLASSES")
                .map(|s| parse_classes(&s))
                .unwrap_or_else(|| RelationshipKind::ALL.to_vec()),
            inclusion_factor: lookup("RELATIONS_INCLUSION_FACTOR")
                .and_then(|s| s.trim().parse().ok())
                .filter(|f: &f64| *f > 0.0 && *f <= 1.0)
                .unwrap_or(DEFAULT_INCLUSION_FACTOR),
            structural_only: lookup("RELATIONS_STRUCTURAL_ONLY")
                .map(|s| parse_flag(&s))
                .unwrap_or(false),
            derived: lookup("RELATIONS_DERIVED")
                .map(|s| parse_flag(&s))
                .unwrap_or(true),
        }
    }

    /// The engine settings of this configuration.
    pub fn engine_context(&self) -> EngineContext {
        EngineContext {
            phase: self.phase.clone(),
            inclusion_factor: self.inclusion_factor,
            structural_only: self.structural_only,
            derived: self.derived,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_flag(s: &str) -> bool {
    matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Parses a comma-separated class list. Unknown names are logged and
/// skipped; duplicates are kept once.
pub fn parse_classes(s: &str) -> Vec<RelationshipKind> {
    let mut classes = Vec::new();
    for name in s.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        match name.parse::<RelationshipKind>() {
            Ok(kind) if !classes.contains(&kind) => classes.push(kind),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Ignoring relationship class"),
        }
    }
    classes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config.output_dir, PathBuf::from("./relations"));
        assert_eq!(config.phase, None);
        assert_eq!(config.classes, RelationshipKind::ALL.to_vec());
        assert_eq!(config.inclusion_factor, 0.8);
        assert!(!config.structural_only);
        assert!(config.derived);
    }

    #[test]
    fn variables_override_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("RELATIONS_OUTPUT_DIR", "/tmp/out"),
            ("RELATIONS_PHASE", "New Construction"),
            ("RELATIONS_CLASSES", "structural, adjacent,structural"),
            ("RELATIONS_INCLUSION_FACTOR", "0.9"),
            ("RELATIONS_STRUCTURAL_ONLY", "true"),
            ("RELATIONS_DERIVED", "0"),
        ]));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.phase.as_deref(), Some("New Construction"));
        assert_eq!(
            config.classes,
            vec![RelationshipKind::StructuralSupport, RelationshipKind::AdjacentConnectivity]
        );
        let ctx = config.engine_context();
        assert_eq!(ctx.inclusion_factor, 0.9);
        assert!(ctx.structural_only);
        assert!(!ctx.derived);
    }

    #[test]
    fn bad_values_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("RELATIONS_INCLUSION_FACTOR", "1.5"),
            ("RELATIONS_CLASSES", "thermal,spatial"),
            ("RELATIONS_PHASE", "  "),
        ]));
        assert_eq!(config.inclusion_factor, 0.8);
        assert_eq!(config.classes, vec![RelationshipKind::SpatialContainment]);
        assert_eq!(config.phase, None);
    }
}
