//! Seed Format v0 schema
//!
//! Defines the YAML structure for seed import

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level seed file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedV0 {
    /// Schema version (must be 0 for this format)
    pub schema_version: u32,

    /// Entity definitions, with their relationships
    pub entities: Vec<SeedEntity>,

    /// Records inserted in file order
    #[serde(default)]
    pub records: Vec<SeedRecord>,
}

/// Entity definition in seed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedEntity {
    pub name: String,

    #[serde(default = "default_primary_key")]
    pub primary_key: String,

    pub fields: Vec<SeedField>,

    #[serde(default)]
    pub relationships: Vec<SeedRelationship>,
}

fn default_primary_key() -> String {
    "id".to_string()
}

/// Field definition in seed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedField {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: SeedFieldType,

    /// Only meaningful for text fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_len: Option<u32>,

    #[serde(default)]
    pub nullable: bool,

    #[serde(default)]
    pub unique: bool,

    /// `uuid_v4` or a scalar literal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedFieldType {
    Text,
    Integer,
    Real,
    Boolean,
    Uuid,
}

/// Relationship declaration in seed
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedRelationship {
    pub name: String,

    pub kind: SeedRelationshipKind,

    pub target: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedRelationshipKind {
    BelongsTo,
    HasOne,
    HasMany,
}

/// One record to insert
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedRecord {
    pub entity: String,

    #[serde(default)]
    pub values: BTreeMap<String, serde_json::Value>,
}
