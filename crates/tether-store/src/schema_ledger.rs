//! Schema ledger
//!
//! `sync` creates one table per entity and records a SHA-256 checksum of
//! each table's DDL in `tether_schema`. Re-syncing is idempotent; an entity
//! whose recorded checksum differs from its current DDL is refused with
//! `SchemaMismatch` instead of being silently altered.

use std::time::Instant;

use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use tether_core_types::schema::{OP_DROP_ALL, OP_SYNC_SCHEMA};
use tether_core::{log_op_end, log_op_error, log_op_start, Schema, TetherError};

use crate::errors::{from_rusqlite, Result};
use crate::statement::{create_table, drop_table, Statement};

pub const LEDGER_TABLE: &str = "tether_schema";

/// Compute SHA256 checksum of a string
pub fn compute_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Create every entity table and record its checksum
///
/// # Errors
///
/// `InvalidDefinition` for an entity named like the ledger table,
/// `SchemaMismatch` for an entity whose table was synced from a different
/// definition, or any SQLite error. Nothing is created when any entity fails.
pub fn sync(conn: &Connection, schema: &Schema) -> Result<()> {
    run(OP_SYNC_SCHEMA, schema, || {
        if let Some(clash) = schema
            .entities()
            .iter()
            .find(|d| d.name().eq_ignore_ascii_case(LEDGER_TABLE))
        {
            return Err(TetherError::InvalidDefinition {
                entity: clash.name().to_string(),
                reason: format!("'{}' is reserved for the schema ledger", LEDGER_TABLE),
            });
        }
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| from_rusqlite("", OP_SYNC_SCHEMA, e))?;
        create_ledger(&tx)?;

        for definition in schema.entities() {
            let ddl = create_table(definition);
            let checksum = compute_checksum(&ddl.sql);
            match recorded_checksum(&tx, definition.name())? {
                Some(recorded) if recorded != checksum => {
                    return Err(TetherError::SchemaMismatch {
                        entity: definition.name().to_string(),
                        recorded,
                        current: checksum,
                    });
                }
                Some(_) => {}
                None => {
                    execute(&tx, definition.name(), &ddl)?;
                    tx.execute(
                        "INSERT INTO tether_schema (entity, checksum, synced_at) VALUES (?1, ?2, ?3)",
                        rusqlite::params![definition.name(), checksum, chrono::Utc::now().to_rfc3339()],
                    )
                    .map_err(|e| from_rusqlite(definition.name(), OP_SYNC_SCHEMA, e))?;
                    tracing::debug!(entity = definition.name(), checksum = checksum.as_str(), "created table");
                }
            }
        }

        tx.commit().map_err(|e| from_rusqlite("", OP_SYNC_SCHEMA, e))
    })
}

/// Drop every entity table and forget its checksum
///
/// # Errors
///
/// Any SQLite error.
pub fn drop_all(conn: &Connection, schema: &Schema) -> Result<()> {
    run(OP_DROP_ALL, schema, || {
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| from_rusqlite("", OP_DROP_ALL, e))?;
        create_ledger(&tx)?;

        for definition in schema.entities() {
            execute(&tx, definition.name(), &drop_table(definition.name()))?;
            tx.execute(
                "DELETE FROM tether_schema WHERE entity = ?1",
                [definition.name()],
            )
            .map_err(|e| from_rusqlite(definition.name(), OP_DROP_ALL, e))?;
        }

        tx.commit().map_err(|e| from_rusqlite("", OP_DROP_ALL, e))
    })
}

/// Checksum recorded for `entity`, if it was ever synced
///
/// # Errors
///
/// Any SQLite error.
pub fn recorded_checksum(conn: &Connection, entity: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT checksum FROM tether_schema WHERE entity = ?1",
        [entity],
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| from_rusqlite(entity, "ledger_lookup", e))
}

fn create_ledger(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS tether_schema (
            entity TEXT NOT NULL PRIMARY KEY,
            checksum TEXT NOT NULL,
            synced_at TEXT NOT NULL
        )",
        [],
    )
    .map_err(|e| from_rusqlite(LEDGER_TABLE, "create_ledger", e))?;
    Ok(())
}

fn execute(conn: &Connection, entity: &str, statement: &Statement) -> Result<()> {
    tracing::trace!(entity, sql = statement.sql.as_str(), "executing statement");
    conn.execute(&statement.sql, rusqlite::params_from_iter(statement.params.iter()))
        .map_err(|e| from_rusqlite(entity, "ddl", e))?;
    Ok(())
}

fn run<F>(op: &str, schema: &Schema, body: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    let started = Instant::now();
    log_op_start!(op, entity_count = schema.entities().len());
    let result = body();
    let duration_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(()) => {
            log_op_end!(op, duration_ms = duration_ms);
        }
        Err(err) => {
            log_op_error!(op, err, duration_ms = duration_ms);
        }
    }
    result
}
