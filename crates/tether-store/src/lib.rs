//! Tether Store - SQLite persistence for Tether
//!
//! Provides:
//! - Connection configuration (`StoreConfig`) and setup
//! - SQL statement rendering for entity tables
//! - A checksummed schema ledger for table (re)creation
//! - `SqliteGateway`, the SQLite implementation of `tether_core::Gateway`
//! - Seed Format v0 parser and importer

pub mod db;
pub mod errors;
pub mod gateway;
pub mod schema_ledger;
pub mod seed;
pub mod statement;

// Re-export key types
pub use db::{JournalMode, StoreConfig};
pub use errors::Result;
pub use gateway::SqliteGateway;
