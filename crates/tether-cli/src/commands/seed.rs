//! Seed import command
//!
//! Usage: tether seed <PATH> [--db <FILE>] [--config <TOML>]

use clap::Args;
use std::path::PathBuf;
use tether_store::seed::import_seed_file;
use tether_store::StoreConfig;

#[derive(Debug, Args)]
pub struct SeedArgs {
    /// Path to seed YAML file
    pub path: PathBuf,

    /// SQLite database file (default: in-memory)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Store configuration TOML; `--db` overrides its path
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Execute seed import
pub fn execute(args: SeedArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => StoreConfig::from_toml_file(path)?,
        None => StoreConfig::in_memory(),
    };
    if let Some(db) = args.db {
        config.path = Some(db);
    }

    println!("Importing {}...", args.path.display());
    let (_gateway, report) = import_seed_file(&args.path, &config)?;
    println!(
        "✓ Imported {} records (digest: {})",
        report.record_count, report.digest
    );
    Ok(())
}
