//! Seed digest canonicalization
//!
//! Computes stable SHA256 digests of seeds for reproducibility

use crate::errors::Result;
use crate::seed::format_v0::{SeedField, SeedRecord, SeedRelationship, SeedV0};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Canonical representation of a seed for digest calculation
#[derive(Debug, Serialize)]
struct CanonicalSeed<'a> {
    schema_version: u32,
    entities: Vec<CanonicalEntity<'a>>,
    records: &'a [SeedRecord],
}

/// Fields keep their declared order: it is the column order
#[derive(Debug, Serialize)]
struct CanonicalEntity<'a> {
    name: &'a str,
    primary_key: &'a str,
    fields: &'a [SeedField],
    relationships: Vec<&'a SeedRelationship>,
}

/// Compute a stable digest for a seed
///
/// Returns a SHA256 hex digest of the canonicalized seed representation.
/// Entity order and relationship order do not affect it; record order does,
/// since records are inserted in file order.
///
/// # Errors
///
/// `Serialization` if a value cannot be rendered as JSON.
pub fn compute_seed_digest(seed: &SeedV0) -> Result<String> {
    let canonical = canonicalize_seed(seed);

    // Record values are BTreeMaps, so object keys serialize sorted
    let json = serde_json::to_string(&canonical)?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

fn canonicalize_seed(seed: &SeedV0) -> CanonicalSeed<'_> {
    let mut entities: Vec<CanonicalEntity<'_>> = seed
        .entities
        .iter()
        .map(|e| {
            let mut relationships: Vec<&SeedRelationship> = e.relationships.iter().collect();
            relationships.sort_by(|a, b| a.name.cmp(&b.name));
            CanonicalEntity {
                name: &e.name,
                primary_key: &e.primary_key,
                fields: &e.fields,
                relationships,
            }
        })
        .collect();
    entities.sort_by(|a, b| a.name.cmp(b.name));

    CanonicalSeed {
        schema_version: seed.schema_version,
        entities,
        records: &seed.records,
    }
}
