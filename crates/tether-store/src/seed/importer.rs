//! Seed importer orchestration
//!
//! Syncs the seed's schema through a gateway and inserts its records in
//! file order.

use std::path::Path;
use std::time::Instant;

use tether_core_types::schema::OP_IMPORT_SEED;
use tether_core::{log_op_end, log_op_error, log_op_start, Gateway};
use tracing::debug;

use crate::db::StoreConfig;
use crate::errors::Result;
use crate::gateway::SqliteGateway;
use crate::seed::{build_schema, compute_seed_digest, parse_seed_file, record_values, SeedV0};

/// Outcome of a successful import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    /// SHA256 digest of the canonical seed
    pub digest: String,
    pub entity_count: usize,
    pub record_count: usize,
}

/// Import a parsed seed through `gateway`
///
/// The gateway must have been opened with the schema built from `seed`.
/// Records are inserted one by one; the first failing record stops the
/// import and earlier records stay committed.
///
/// # Errors
///
/// Schema sync failures, record conversion errors, and any constraint
/// violation raised by an insert.
pub fn import_seed(seed: &SeedV0, gateway: &dyn Gateway) -> Result<ImportReport> {
    let started = Instant::now();
    log_op_start!(OP_IMPORT_SEED, record_count = seed.records.len());

    let result = run_import(seed, gateway);

    let duration_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(report) => {
            log_op_end!(
                OP_IMPORT_SEED,
                duration_ms = duration_ms,
                record_count = report.record_count,
                digest = report.digest.as_str()
            );
        }
        Err(err) => {
            log_op_error!(OP_IMPORT_SEED, err, duration_ms = duration_ms);
        }
    }
    result
}

fn run_import(seed: &SeedV0, gateway: &dyn Gateway) -> Result<ImportReport> {
    let digest = compute_seed_digest(seed)?;
    gateway.sync_schema()?;

    for (index, record) in seed.records.iter().enumerate() {
        let values = record_values(gateway.schema(), record)?;
        gateway.insert(&record.entity, values)?;
        debug!(entity = record.entity.as_str(), index, "imported record");
    }

    Ok(ImportReport {
        digest,
        entity_count: seed.entities.len(),
        record_count: seed.records.len(),
    })
}

/// Parse a seed file, open a gateway for its schema and import it
///
/// # Errors
///
/// Parse, open and import errors, as for [`parse_seed_file`],
/// [`SqliteGateway::open`] and [`import_seed`].
pub fn import_seed_file(path: &Path, config: &StoreConfig) -> Result<(SqliteGateway, ImportReport)> {
    let seed = parse_seed_file(path)?;
    let gateway = SqliteGateway::open(config, build_schema(&seed)?)?;
    let report = import_seed(&seed, &gateway)?;
    Ok((gateway, report))
}
