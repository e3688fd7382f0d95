use uuid::Uuid;

use super::instance::FieldValues;
use super::relationship::Relationship;
use super::value::{FieldType, Value};
use crate::errors::{Result, TetherError};

/// How a field value is produced when an insert omits it
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultGenerator {
    /// Random v4 UUID, unique per insert
    UuidV4,
    /// Constant value
    Value(Value),
}

impl DefaultGenerator {
    pub fn generate(&self) -> Value {
        match self {
            DefaultGenerator::UuidV4 => Value::Uuid(Uuid::new_v4()),
            DefaultGenerator::Value(v) => v.clone(),
        }
    }
}

/// Declared field of an entity
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
    pub unique: bool,
    pub default: Option<DefaultGenerator>,
}

impl FieldDef {
    /// Create a non-nullable, non-unique field without a default
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: false,
            unique: false,
            default: None,
        }
    }

    pub fn text(name: impl Into<String>, max_len: u32) -> Self {
        Self::new(name, FieldType::text(max_len))
    }

    pub fn uuid(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Uuid)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_to(mut self, generator: DefaultGenerator) -> Self {
        self.default = Some(generator);
        self
    }

    /// An insert must supply this field
    pub fn is_required(&self) -> bool {
        !self.nullable && self.default.is_none()
    }
}

/// Definition of one persistable record kind
///
/// Built once at startup, registered with the `SchemaRegistry`, and
/// immutable after the registry is frozen.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDefinition {
    name: String,
    primary_key: String,
    fields: Vec<FieldDef>,
    relationships: Vec<Relationship>,
}

impl EntityDefinition {
    /// Start a definition; the primary key defaults to `id`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: "id".to_string(),
            fields: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Add a field; a later field with the same name replaces the earlier one
    pub fn field(mut self, field: FieldDef) -> Self {
        if let Some(existing) = self.fields.iter_mut().find(|f| f.name == field.name) {
            *existing = field;
        } else {
            self.fields.push(field);
        }
        self
    }

    pub fn primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = field.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key_name(&self) -> &str {
        &self.primary_key
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a field, failing with `UnknownField`
    pub fn require_field(&self, name: &str) -> Result<&FieldDef> {
        self.get_field(name).ok_or_else(|| TetherError::UnknownField {
            entity: self.name.clone(),
            field: name.to_string(),
        })
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn get_relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// Field is the primary key or declared unique
    pub fn is_unique_field(&self, name: &str) -> bool {
        name == self.primary_key || self.get_field(name).is_some_and(|f| f.unique)
    }

    pub(crate) fn push_relationship(&mut self, relationship: Relationship) {
        self.relationships.push(relationship);
    }

    /// Structural checks performed on registration
    pub(crate) fn validate(&self) -> Result<()> {
        check_identifier(&self.name).map_err(|reason| self.invalid(reason))?;

        for field in &self.fields {
            check_identifier(&field.name)
                .map_err(|reason| self.invalid(format!("field '{}': {}", field.name, reason)))?;
        }

        let pk = self.get_field(&self.primary_key).ok_or_else(|| {
            self.invalid(format!(
                "primary key '{}' is not a declared field",
                self.primary_key
            ))
        })?;
        if pk.nullable {
            return Err(self.invalid("primary key cannot be nullable"));
        }
        if !pk.field_type.is_key_type() {
            return Err(self.invalid(format!(
                "primary key cannot have type {}",
                pk.field_type
            )));
        }
        Ok(())
    }

    /// Validate and complete the values of a new record
    ///
    /// Unknown fields fail with `UnknownField`. Values are coerced to their
    /// field types, omitted fields get their default (or `Null` when
    /// nullable), and an omitted required field or an explicit null in a
    /// non-nullable field is a `ConstraintViolation`.
    pub fn prepare_insert(&self, values: FieldValues) -> Result<FieldValues> {
        let mut row = FieldValues::new();
        for (name, value) in values {
            let field = self.require_field(&name)?;
            row.insert(name, self.coerce(field, value)?);
        }

        for field in &self.fields {
            match row.get(&field.name) {
                Some(v) if v.is_null() && !field.nullable => {
                    return Err(TetherError::constraint(
                        &self.name,
                        format!("field '{}' cannot be null", field.name),
                    ));
                }
                Some(_) => {}
                None => {
                    let value = match &field.default {
                        Some(generator) => generator.generate(),
                        None if field.nullable => Value::Null,
                        None => {
                            return Err(TetherError::constraint(
                                &self.name,
                                format!("missing required field '{}'", field.name),
                            ));
                        }
                    };
                    row.insert(field.name.clone(), value);
                }
            }
        }
        Ok(row)
    }

    /// Merge changes into a stored row
    ///
    /// The primary key is immutable: a change to a different value is a
    /// `ConstraintViolation`.
    pub fn prepare_update(&self, current: &FieldValues, changes: FieldValues) -> Result<FieldValues> {
        let mut row = current.clone();
        for (name, value) in changes {
            let field = self.require_field(&name)?;
            let value = self.coerce(field, value)?;
            if value.is_null() && !field.nullable {
                return Err(TetherError::constraint(
                    &self.name,
                    format!("field '{}' cannot be null", field.name),
                ));
            }
            if name == self.primary_key && current.get(&name) != Some(&value) {
                return Err(TetherError::constraint(
                    &self.name,
                    format!("primary key '{}' is immutable", name),
                ));
            }
            row.insert(name, value);
        }
        Ok(row)
    }

    fn coerce(&self, field: &FieldDef, value: Value) -> Result<Value> {
        let shown = value.to_string();
        field.field_type.coerce(value).ok_or_else(|| {
            TetherError::constraint(
                &self.name,
                format!(
                    "value '{}' does not fit field '{}' of type {}",
                    shown, field.name, field.field_type
                ),
            )
        })
    }

    fn invalid(&self, reason: impl Into<String>) -> TetherError {
        TetherError::InvalidDefinition {
            entity: self.name.clone(),
            reason: reason.into(),
        }
    }
}

/// Identifiers become quoted SQL names, so keep them to a portable alphabet
pub(crate) fn check_identifier(name: &str) -> std::result::Result<(), String> {
    let mut chars = name.chars();
    match chars.next() {
        None => return Err("identifier cannot be empty".to_string()),
        Some(c) if c.is_ascii_digit() => {
            return Err(format!("identifier '{}' cannot start with a digit", name))
        }
        _ => {}
    }
    if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(format!(
            "identifier '{}' may only contain ASCII letters, digits and '_'",
            name
        ))
    }
}
