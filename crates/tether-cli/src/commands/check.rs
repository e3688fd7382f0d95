//! Seed check command
//!
//! Usage: tether check <PATH>

use clap::Args;
use std::path::PathBuf;
use tether_store::seed::{build_schema, parse_seed_file};

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Path to seed YAML file
    pub path: PathBuf,
}

/// Execute check command
pub fn execute(args: CheckArgs) -> Result<(), Box<dyn std::error::Error>> {
    let seed = parse_seed_file(&args.path)?;
    let schema = build_schema(&seed)?;

    println!(
        "✓ {} is valid: {} entities, {} relationships, {} records",
        args.path.display(),
        schema.entities().len(),
        schema.relationship_count(),
        seed.records.len()
    );
    Ok(())
}
