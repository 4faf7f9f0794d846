// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLI tool: infer element relationships from an element pool snapshot.
//!
//! Usage:
//!   relate <pool.json> [options]

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context};
use ifc_lite_relations::config::parse_classes;
use ifc_lite_relations::serialization::write_collection;
use ifc_lite_relations::{construct_all, Config, ElementPool};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            env::var("RUST_LOG").unwrap_or_else(|_| "info,ifc_lite_relations=debug".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return Ok(());
    }

    let pool_path = PathBuf::from(&args[1]);
    let mut config = Config::from_env();

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--output" => {
                config.output_dir = PathBuf::from(option_value(&args, &mut i)?);
            }
            "--phase" => {
                config.phase = Some(option_value(&args, &mut i)?.to_string());
            }
            "--only" => {
                config.classes = parse_classes(option_value(&args, &mut i)?);
            }
            "--no-derived" => {
                config.derived = false;
            }
            other => {
                print_usage();
                bail!("unknown option: {}", other);
            }
        }
        i += 1;
    }

    if config.classes.is_empty() {
        bail!("no relationship class selected");
    }

    let pool = ElementPool::load(&pool_path)
        .with_context(|| format!("cannot load element pool '{}'", pool_path.display()))?;
    tracing::info!(
        path = %pool_path.display(),
        elements = pool.len(),
        phases = pool.phases().len(),
        "Loaded element pool"
    );

    let ctx = config.engine_context();
    for (kind, collection) in construct_all(&pool, &ctx, &config.classes) {
        let written = write_collection(&config.output_dir, kind, &collection)
            .with_context(|| format!("cannot write {} relationships", kind))?;
        tracing::info!(
            relationship = %kind,
            records = collection.record_count(),
            written = written.is_some(),
            "Finished"
        );
    }
    Ok(())
}

/// Advances past an option and returns its value.
fn option_value<'a>(args: &'a [String], i: &mut usize) -> anyhow::Result<&'a str> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .with_context(|| format!("missing value for {}", flag))
}

fn print_usage() {
    println!(
        r#"Element Relationship Inference
==============================

Infers accessible, adjacent, spatial, structural and locational relationships
between building elements and writes one e-<kind>.json file per class.

USAGE:
  relate <pool.json> [OPTIONS]

ARGUMENTS:
  <pool.json>               Element pool snapshot (levels, phases, elements)

OPTIONS:
  --output <dir>            Output directory (default: $RELATIONS_OUTPUT_DIR or ./relations)
  --phase <name>            Design phase for door rooms (default: latest phase)
  --only <classes>          Comma-separated: accessible,adjacent,spatial,structural,locational
  --no-derived              Skip derived passages and door labels
  -h, --help                Show this help message

ENVIRONMENT:
  RELATIONS_OUTPUT_DIR, RELATIONS_PHASE, RELATIONS_CLASSES,
  RELATIONS_INCLUSION_FACTOR, RELATIONS_STRUCTURAL_ONLY, RELATIONS_DERIVED,
  RUST_LOG"#
    );
}
