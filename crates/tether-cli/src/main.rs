//! Tether CLI
//!
//! Command-line interface for Tether seed files

use clap::{Parser, Subcommand};
use tether_core::logging_facility::{self, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "tether")]
#[command(about = "Tether - Relational association resolution", long_about = None)]
struct Cli {
    /// Logging profile (dev, prod, test); no logging when omitted
    #[arg(long, global = true)]
    log_profile: Option<Profile>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse and validate a seed file
    Check(commands::check::CheckArgs),
    /// Import a seed file into a database
    Seed(commands::seed::SeedArgs),
    /// Import a seed in memory and print a hydrated load as JSON
    Query(commands::query::QueryArgs),
}

fn main() {
    let cli = Cli::parse();

    if let Some(profile) = cli.log_profile {
        logging_facility::init(profile);
    }

    let result = match cli.command {
        Commands::Check(args) => commands::check::execute(args),
        Commands::Seed(args) => commands::seed::execute(args),
        Commands::Query(args) => commands::query::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
