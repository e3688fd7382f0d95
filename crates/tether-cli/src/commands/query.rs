//! Query command
//!
//! Usage: tether query <PATH> --entity <NAME> [--where field=value]... [--include path]...

use clap::Args;
use std::path::PathBuf;
use tether_core::{Gateway, Hydrator, Predicate, RelationPath, Schema};
use tether_store::seed::import_seed_file;
use tether_store::StoreConfig;

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Path to seed YAML file
    pub path: PathBuf,

    /// Root entity to load
    #[arg(long)]
    pub entity: String,

    /// Equality filter on a root field, `field=value` (`null` matches null)
    #[arg(long = "where", value_name = "FIELD=VALUE")]
    pub filters: Vec<String>,

    /// Dotted relationship path to resolve, e.g. `preferredGearShift.cars`
    #[arg(long = "include", value_name = "PATH")]
    pub includes: Vec<String>,
}

/// Execute query command
pub fn execute(args: QueryArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (gateway, _report) = import_seed_file(&args.path, &StoreConfig::in_memory())?;

    let predicate = build_predicate(gateway.schema(), &args.entity, &args.filters)?;
    let paths = args
        .includes
        .iter()
        .map(|p| p.parse::<RelationPath>())
        .collect::<Result<Vec<_>, _>>()?;

    let instances = Hydrator::new(&gateway).load(&args.entity, &predicate, &paths)?;
    println!("{}", serde_json::to_string_pretty(&instances)?);
    Ok(())
}

/// AND of `field=value` filters, each literal parsed with its field's type
fn build_predicate(
    schema: &Schema,
    entity: &str,
    filters: &[String],
) -> Result<Predicate, Box<dyn std::error::Error>> {
    let definition = schema.resolve(entity)?;
    let mut predicate = Predicate::all();
    for filter in filters {
        let (field, literal) = filter
            .split_once('=')
            .ok_or_else(|| format!("filter '{}' is not of the form field=value", filter))?;
        let field_def = definition.require_field(field)?;
        let value = field_def.field_type.parse_literal(literal).ok_or_else(|| {
            format!(
                "'{}' is not a valid {} value for {}.{}",
                literal, field_def.field_type, entity, field
            )
        })?;
        predicate = predicate.and(Predicate::eq(field, value));
    }
    Ok(predicate)
}
