//! Tether Core - relational association resolution kernel
//!
//! This crate provides the backend-independent half of Tether:
//! - Entity and relationship models with explicit `Related` slots
//! - The Schema Registry and its frozen, shareable `Schema`
//! - Predicates and dotted relationship paths
//! - The `Gateway` trait every persistence backend implements
//! - The Relationship Resolver and the Hydration Engine
//! - The error and structured logging facilities
//!
//! The SQLite gateway lives in `tether-store`.

pub mod errors;
pub mod gateway;
pub mod hydration;
pub mod logging_facility;
pub mod model;
pub mod path;
pub mod predicate;
pub mod registry;
pub mod resolver;

#[cfg(test)]
pub(crate) mod test_support;

#[doc(hidden)]
pub use tether_core_types as core_types;

// Re-export commonly used types
pub use errors::{ErrorKind, Result, TetherError};
pub use gateway::Gateway;
pub use hydration::Hydrator;
pub use model::{
    Association, Cardinality, DefaultGenerator, EntityDefinition, EntityInstance, FieldDef,
    FieldType, FieldValues, KeyValue, Reference, Related, Relationship, RelationshipDeclaration,
    Value,
};
pub use path::RelationPath;
pub use predicate::Predicate;
pub use registry::{Schema, SchemaRegistry};
pub use resolver::Resolver;
