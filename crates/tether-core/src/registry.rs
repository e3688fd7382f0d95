//! Schema Registry
//!
//! Entities and relationships are declared once at startup on a mutable
//! `SchemaRegistry`, then frozen into an immutable `Schema` shared behind an
//! `Arc`. A frozen schema has no mutation API, so post-startup changes
//! cannot be expressed.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::debug;

use crate::errors::{Result, TetherError};
use crate::model::entity::check_identifier;
use crate::model::{Association, EntityDefinition, Reference, Relationship, RelationshipDeclaration};

/// Immutable set of entity definitions
///
/// `Send + Sync`; safe for concurrent readers.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    entities: Vec<EntityDefinition>,
    index: HashMap<String, usize>,
}

impl Schema {
    /// Look up an entity definition
    ///
    /// # Errors
    ///
    /// Returns `UnknownEntity` if no entity of that name is registered.
    pub fn resolve(&self, entity: &str) -> Result<&EntityDefinition> {
        self.index
            .get(entity)
            .map(|&i| &self.entities[i])
            .ok_or_else(|| TetherError::UnknownEntity {
                entity: entity.to_string(),
            })
    }

    /// Look up a relationship declared on `owner`
    ///
    /// # Errors
    ///
    /// Returns `UnknownEntity` or `UnknownRelationship`.
    pub fn relationship(&self, owner: &str, name: &str) -> Result<&Relationship> {
        self.resolve(owner)?
            .get_relationship(name)
            .ok_or_else(|| TetherError::UnknownRelationship {
                entity: owner.to_string(),
                relationship: name.to_string(),
            })
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.index.contains_key(entity)
    }

    /// Entity definitions in registration order
    pub fn entities(&self) -> &[EntityDefinition] {
        &self.entities
    }

    pub fn relationship_count(&self) -> usize {
        self.entities.iter().map(|e| e.relationships().len()).sum()
    }

    /// Enforced references whose referencing column lives on `entity`
    ///
    /// A belongs-to and its inverse has-many describe the same column, so
    /// duplicates are collapsed.
    pub fn references_from(&self, entity: &str) -> Vec<Reference> {
        self.all_references()
            .into_iter()
            .filter(|r| r.from_entity == entity)
            .collect()
    }

    /// Enforced references that point at a column of `entity`
    pub fn references_to(&self, entity: &str) -> Vec<Reference> {
        self.all_references()
            .into_iter()
            .filter(|r| r.to_entity == entity)
            .collect()
    }

    fn all_references(&self) -> BTreeSet<Reference> {
        self.entities
            .iter()
            .flat_map(|e| e.relationships())
            .filter_map(Relationship::reference)
            .collect()
    }
}

/// Mutable registry used during startup
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schema: Schema,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity definition
    ///
    /// # Errors
    ///
    /// Returns `DuplicateEntity` if the name is taken, or
    /// `InvalidDefinition` if the definition is malformed.
    pub fn register(&mut self, definition: EntityDefinition) -> Result<&mut Self> {
        if self.schema.contains(definition.name()) {
            return Err(TetherError::DuplicateEntity {
                entity: definition.name().to_string(),
            });
        }
        definition.validate()?;

        debug!(
            entity = definition.name(),
            field_count = definition.fields().len(),
            "registered entity"
        );
        let name = definition.name().to_string();
        self.schema.entities.push(definition);
        self.schema
            .index
            .insert(name, self.schema.entities.len() - 1);
        Ok(self)
    }

    /// Declare a relationship owned by `owner`
    ///
    /// Applies key defaults (see `resolve_keys`), then checks that the source
    /// key exists on the owner, the foreign key exists on the target, and
    /// both carry the same kind of key type.
    ///
    /// # Errors
    ///
    /// Returns `UnknownEntity`, `UnknownField`, `IncompatibleKeyType`,
    /// `DuplicateRelationship` or `InvalidDefinition`.
    pub fn declare_relationship(
        &mut self,
        owner: &str,
        declaration: RelationshipDeclaration,
    ) -> Result<&mut Self> {
        let owner_def = self.schema.resolve(owner)?;
        let target_def = self.schema.resolve(&declaration.target)?;

        check_identifier(&declaration.name).map_err(|reason| TetherError::InvalidDefinition {
            entity: owner.to_string(),
            reason: format!("relationship '{}': {}", declaration.name, reason),
        })?;
        if owner_def.get_relationship(&declaration.name).is_some()
            || owner_def.get_field(&declaration.name).is_some()
        {
            return Err(TetherError::DuplicateRelationship {
                entity: owner.to_string(),
                relationship: declaration.name,
            });
        }

        let (source_key, foreign_key) = resolve_keys(owner_def, target_def, &declaration);
        let source = owner_def.require_field(&source_key)?;
        let foreign = target_def.require_field(&foreign_key)?;

        if !source.field_type.is_key_type()
            || !foreign.field_type.is_key_type()
            || !source.field_type.is_compatible_with(&foreign.field_type)
        {
            return Err(TetherError::IncompatibleKeyType {
                owner: owner.to_string(),
                relationship: declaration.name,
                source_key,
                source_type: source.field_type.to_string(),
                foreign_key,
                foreign_type: foreign.field_type.to_string(),
            });
        }

        let enforced = match declaration.association {
            Association::BelongsTo => target_def.is_unique_field(&foreign_key),
            Association::HasOne | Association::HasMany => owner_def.is_unique_field(&source_key),
        };

        let relationship = Relationship {
            name: declaration.name,
            association: declaration.association,
            owner: owner.to_string(),
            target: declaration.target,
            source_key,
            foreign_key,
            enforced,
        };
        debug!(
            entity = owner,
            relationship = relationship.name.as_str(),
            target = relationship.target.as_str(),
            source_key = relationship.source_key.as_str(),
            foreign_key = relationship.foreign_key.as_str(),
            enforced = relationship.enforced,
            "declared relationship"
        );

        let index = self.schema.index[owner];
        self.schema.entities[index].push_relationship(relationship);
        Ok(self)
    }

    /// Look up an entity definition registered so far
    ///
    /// # Errors
    ///
    /// Returns `UnknownEntity` if absent.
    pub fn resolve(&self, entity: &str) -> Result<&EntityDefinition> {
        self.schema.resolve(entity)
    }

    /// End the startup phase
    pub fn freeze(self) -> Arc<Schema> {
        Arc::new(self.schema)
    }
}

/// Apply the default join keys of a declaration
///
/// - belongs-to: `<relationship>Id` on the owner, matched against the
///   target's primary key
/// - has-one / has-many: the owner's primary key, matched against
///   `<owner in lowerCamelCase>Id` on the target
fn resolve_keys(
    owner: &EntityDefinition,
    target: &EntityDefinition,
    declaration: &RelationshipDeclaration,
) -> (String, String) {
    match declaration.association {
        Association::BelongsTo => (
            declaration
                .source_key
                .clone()
                .unwrap_or_else(|| format!("{}Id", declaration.name)),
            declaration
                .foreign_key
                .clone()
                .unwrap_or_else(|| target.primary_key_name().to_string()),
        ),
        Association::HasOne | Association::HasMany => (
            declaration
                .source_key
                .clone()
                .unwrap_or_else(|| owner.primary_key_name().to_string()),
            declaration
                .foreign_key
                .clone()
                .unwrap_or_else(|| format!("{}Id", lower_camel(owner.name()))),
        ),
    }
}

fn lower_camel(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
