//! Seed parser with validation
//!
//! Parses YAML and validates the schema version, the entity and
//! relationship declarations, and every record against its entity.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tether_core::{
    Association, DefaultGenerator, EntityDefinition, FieldDef, FieldType, FieldValues,
    RelationshipDeclaration, Schema, SchemaRegistry, Value,
};

use crate::errors::{seed_validation, Result};
use crate::seed::format_v0::{
    SeedEntity, SeedField, SeedFieldType, SeedRecord, SeedRelationshipKind, SeedV0,
};

const UUID_V4_DEFAULT: &str = "uuid_v4";

/// Parse a seed file from a path
///
/// # Errors
///
/// `InvalidSeed` if the file cannot be read or fails validation; registry
/// errors keep their own kinds.
pub fn parse_seed_file(path: &Path) -> Result<SeedV0> {
    let content = fs::read_to_string(path)
        .map_err(|e| seed_validation(format!("Failed to read seed file: {}", e)))?;

    parse_seed_str(&content)
}

/// Parse a seed from a string
///
/// # Errors
///
/// See [`parse_seed_file`].
pub fn parse_seed_str(content: &str) -> Result<SeedV0> {
    let seed: SeedV0 = serde_yaml::from_str(content)
        .map_err(|e| seed_validation(format!("YAML parse error: {}", e)))?;

    validate_seed(&seed)?;

    Ok(seed)
}

fn validate_seed(seed: &SeedV0) -> Result<()> {
    if seed.schema_version != 0 {
        return Err(seed_validation(format!(
            "Unsupported schema_version: {}. Expected 0",
            seed.schema_version
        )));
    }

    let schema = build_schema(seed)?;
    for record in &seed.records {
        record_values(&schema, record)?;
    }
    Ok(())
}

/// Register every seed entity, then declare every relationship, and freeze
///
/// Relationships are declared after all entities so a target may appear
/// later in the file than its owner.
///
/// # Errors
///
/// `InvalidSeed` for a malformed field default; registry errors otherwise.
pub fn build_schema(seed: &SeedV0) -> Result<Arc<Schema>> {
    let mut registry = SchemaRegistry::new();
    for entity in &seed.entities {
        registry.register(entity_definition(entity)?)?;
    }
    for entity in &seed.entities {
        for relationship in &entity.relationships {
            let association = match relationship.kind {
                SeedRelationshipKind::BelongsTo => Association::BelongsTo,
                SeedRelationshipKind::HasOne => Association::HasOne,
                SeedRelationshipKind::HasMany => Association::HasMany,
            };
            let mut declaration =
                RelationshipDeclaration::new(&relationship.name, association, &relationship.target);
            if let Some(source_key) = &relationship.source_key {
                declaration = declaration.source_key(source_key);
            }
            if let Some(foreign_key) = &relationship.foreign_key {
                declaration = declaration.foreign_key(foreign_key);
            }
            registry.declare_relationship(&entity.name, declaration)?;
        }
    }
    Ok(registry.freeze())
}

fn entity_definition(entity: &SeedEntity) -> Result<EntityDefinition> {
    let mut definition = EntityDefinition::new(&entity.name).primary_key(&entity.primary_key);
    for field in &entity.fields {
        definition = definition.field(field_definition(&entity.name, field)?);
    }
    Ok(definition)
}

fn field_definition(entity: &str, field: &SeedField) -> Result<FieldDef> {
    let field_type = match field.field_type {
        SeedFieldType::Text => FieldType::Text {
            max_len: field.max_len,
        },
        SeedFieldType::Integer => FieldType::Integer,
        SeedFieldType::Real => FieldType::Real,
        SeedFieldType::Boolean => FieldType::Boolean,
        SeedFieldType::Uuid => FieldType::Uuid,
    };

    let mut definition = FieldDef::new(&field.name, field_type);
    if field.nullable {
        definition = definition.nullable();
    }
    if field.unique {
        definition = definition.unique();
    }

    match &field.default {
        None => {}
        Some(serde_json::Value::String(s)) if s == UUID_V4_DEFAULT => {
            if field_type != FieldType::Uuid {
                return Err(seed_validation(format!(
                    "{}.{}: uuid_v4 default requires a uuid field",
                    entity, field.name
                )));
            }
            definition = definition.default_to(DefaultGenerator::UuidV4);
        }
        Some(literal) => {
            let value = json_value(&field_type, literal).ok_or_else(|| {
                seed_validation(format!(
                    "{}.{}: default {} does not fit type {}",
                    entity, field.name, literal, field_type
                ))
            })?;
            definition = definition.default_to(DefaultGenerator::Value(value));
        }
    }
    Ok(definition)
}

/// Convert a record's JSON values to field values of its entity
///
/// # Errors
///
/// `UnknownEntity`/`UnknownField` for undeclared names, `InvalidSeed` for a
/// value that does not fit its field's type.
pub fn record_values(schema: &Schema, record: &SeedRecord) -> Result<FieldValues> {
    let definition = schema.resolve(&record.entity)?;
    let mut values = FieldValues::new();
    for (name, raw) in &record.values {
        let field = definition.require_field(name)?;
        let value = json_value(&field.field_type, raw).ok_or_else(|| {
            seed_validation(format!(
                "{}.{}: value {} does not fit type {}",
                record.entity, name, raw, field.field_type
            ))
        })?;
        values.insert(name.clone(), value);
    }
    Ok(values)
}

/// Scalar JSON to a value of `field_type`; `None` for arrays, objects and misfits
fn json_value(field_type: &FieldType, raw: &serde_json::Value) -> Option<Value> {
    let value = match raw {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Real(n.as_f64()?),
        },
        serde_json::Value::String(s) => Value::Text(s.clone()),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => return None,
    };
    field_type.coerce(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::ErrorKind;

    const GEARSHIFT_SEED: &str = r#"
schema_version: 0
entities:
  - name: MediumCar
    fields:
      - { name: id, type: uuid, default: uuid_v4 }
      - { name: name, type: text, max_len: 120 }
      - { name: gearShiftId, type: text, max_len: 13, nullable: true }
    relationships:
      - { name: gearShift, kind: belongs_to, target: GearShift }
  - name: GearShift
    primary_key: name
    fields:
      - { name: name, type: text, max_len: 13 }
    relationships:
      - { name: cars, kind: has_many, target: MediumCar }
records:
  - entity: GearShift
    values: { name: manual }
  - entity: MediumCar
    values: { name: SimpleCar1, gearShiftId: manual }
"#;

    #[test]
    fn test_parse_valid_seed() {
        let seed = parse_seed_str(GEARSHIFT_SEED).unwrap();
        assert_eq!(seed.entities.len(), 2);
        assert_eq!(seed.records.len(), 2);
    }

    #[test]
    fn test_build_schema_allows_forward_targets() {
        let seed = parse_seed_str(GEARSHIFT_SEED).unwrap();
        let schema = build_schema(&seed).unwrap();

        let belongs = schema.relationship("MediumCar", "gearShift").unwrap();
        assert_eq!(belongs.source_key, "gearShiftId");
        assert_eq!(belongs.foreign_key, "name");
        assert!(belongs.enforced);

        let cars = schema.relationship("GearShift", "cars").unwrap();
        assert_eq!(cars.foreign_key, "gearShiftId");
    }

    #[test]
    fn test_invalid_schema_version() {
        let yaml = GEARSHIFT_SEED.replace("schema_version: 0", "schema_version: 1");
        let err = parse_seed_str(&yaml).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSeed);
        assert!(err.to_string().contains("schema_version"));
    }

    #[test]
    fn test_registry_errors_keep_their_kind() {
        let yaml = GEARSHIFT_SEED.replace("target: GearShift", "target: Hovercraft");
        let err = parse_seed_str(&yaml).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownEntity);
    }

    #[test]
    fn test_record_with_unknown_field() {
        let yaml = GEARSHIFT_SEED.replace("{ name: manual }", "{ name: manual, speed: 3 }");
        let err = parse_seed_str(&yaml).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownField);
    }

    #[test]
    fn test_record_value_of_wrong_type() {
        let yaml = GEARSHIFT_SEED.replace("{ name: manual }", "{ name: 42 }");
        let err = parse_seed_str(&yaml).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSeed);
    }

    #[test]
    fn test_uuid_default_on_text_field() {
        let yaml = GEARSHIFT_SEED.replace(
            "{ name: name, type: text, max_len: 120 }",
            "{ name: name, type: text, max_len: 120, default: uuid_v4 }",
        );
        let err = parse_seed_str(&yaml).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSeed);
    }

    #[test]
    fn test_literal_default() {
        let yaml = GEARSHIFT_SEED.replace(
            "{ name: name, type: text, max_len: 120 }",
            "{ name: name, type: text, max_len: 120, default: unnamed }",
        );
        let seed = parse_seed_str(&yaml).unwrap();
        let schema = build_schema(&seed).unwrap();
        let name = schema.resolve("MediumCar").unwrap().get_field("name").unwrap();
        assert_eq!(
            name.default,
            Some(DefaultGenerator::Value(Value::from("unnamed")))
        );
    }

    #[test]
    fn test_record_values_coerce_uuid_text() {
        let yaml = GEARSHIFT_SEED.replace(
            "{ name: SimpleCar1, gearShiftId: manual }",
            "{ id: 67e55044-10b1-426f-9247-bb680e5fe0c8, name: SimpleCar1 }",
        );
        let seed = parse_seed_str(&yaml).unwrap();
        let schema = build_schema(&seed).unwrap();
        let values = record_values(&schema, &seed.records[1]).unwrap();
        assert!(values["id"].as_uuid().is_some());
    }
}
