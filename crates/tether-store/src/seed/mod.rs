//! Seed import system
//!
//! Provides:
//! - Seed Format v0 schema (entities, relationships and records)
//! - YAML parser with validation
//! - Digest canonicalization
//! - Importer orchestration

pub mod digest;
pub mod format_v0;
pub mod importer;
pub mod parser;

pub use digest::compute_seed_digest;
pub use format_v0::SeedV0;
pub use importer::{import_seed, import_seed_file, ImportReport};
pub use parser::{build_schema, parse_seed_file, parse_seed_str, record_values};
