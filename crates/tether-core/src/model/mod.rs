pub mod entity;
pub mod instance;
pub mod relationship;
pub mod value;

pub use entity::{DefaultGenerator, EntityDefinition, FieldDef};
pub use instance::{EntityInstance, FieldValues, Related};
pub use relationship::{Association, Cardinality, Reference, Relationship, RelationshipDeclaration};
pub use value::{FieldType, KeyValue, Value};
