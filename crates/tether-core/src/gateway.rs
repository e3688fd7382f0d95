//! Persistence Gateway
//!
//! The only path by which records enter or leave durable storage. The
//! resolver and hydrator depend on this trait, never on a concrete backend.

use crate::errors::{Result, TetherError};
use crate::model::{EntityInstance, FieldValues, KeyValue};
use crate::predicate::Predicate;
use crate::registry::Schema;

/// Backend-neutral record storage
///
/// Implementations must validate writes against the schema (required
/// fields, primary key and unique constraints, enforced references) and
/// return instances with every relationship unresolved. Result order of
/// `find_many` is insertion order.
pub trait Gateway {
    /// Frozen schema this gateway serves
    fn schema(&self) -> &Schema;

    /// Persist a new record and return it with defaults filled in
    ///
    /// # Errors
    ///
    /// `UnknownEntity`, `UnknownField`, or `ConstraintViolation`.
    fn insert(&self, entity: &str, values: FieldValues) -> Result<EntityInstance>;

    /// First record matching `predicate`, or `None`
    ///
    /// # Errors
    ///
    /// `UnknownEntity` or `UnknownField`.
    fn find_one(&self, entity: &str, predicate: &Predicate) -> Result<Option<EntityInstance>>;

    /// All records matching `predicate`
    ///
    /// # Errors
    ///
    /// `UnknownEntity` or `UnknownField`.
    fn find_many(&self, entity: &str, predicate: &Predicate) -> Result<Vec<EntityInstance>>;

    /// Apply `changes` to the stored record of `instance`
    ///
    /// Returns the fresh row with every relationship unresolved.
    ///
    /// # Errors
    ///
    /// `RecordNotFound`, `UnknownField`, or `ConstraintViolation` (including
    /// an attempt to change the primary key).
    fn update(&self, instance: &EntityInstance, changes: FieldValues) -> Result<EntityInstance>;

    /// Remove the stored record of `instance`
    ///
    /// # Errors
    ///
    /// `RecordNotFound`, or `ConstraintViolation` while an enforced
    /// reference still points at it.
    fn delete(&self, instance: &EntityInstance) -> Result<()>;

    /// Current durable state of `instance`, relationships unresolved
    ///
    /// # Errors
    ///
    /// `RecordNotFound` if the record no longer exists.
    fn reload(&self, instance: &EntityInstance) -> Result<EntityInstance> {
        let (pk, key) = primary_key_of(self.schema(), instance)?;
        self.find_one(instance.entity(), &Predicate::eq(pk, key))?
            .ok_or_else(|| not_found(instance, pk))
    }

    /// Create storage for every registered entity; idempotent
    ///
    /// # Errors
    ///
    /// `SchemaMismatch` when existing storage was created from a different
    /// definition, `StorageUnavailable` or `Persistence`.
    fn sync_schema(&self) -> Result<()>;

    /// Destroy the storage of every registered entity, records included
    ///
    /// `sync_schema` recreates it empty.
    ///
    /// # Errors
    ///
    /// `StorageUnavailable` or `Persistence`.
    fn drop_all(&self) -> Result<()>;
}

/// Primary key field name and key value of a stored instance
///
/// # Errors
///
/// `UnknownEntity`, or `RecordNotFound` when the key is null.
pub fn primary_key_of<'s>(schema: &'s Schema, instance: &EntityInstance) -> Result<(&'s str, KeyValue)> {
    let pk = schema.resolve(instance.entity())?.primary_key_name();
    let key = instance.key_of(pk).ok_or_else(|| not_found(instance, pk))?;
    Ok((pk, key))
}

fn not_found(instance: &EntityInstance, pk: &str) -> TetherError {
    TetherError::RecordNotFound {
        entity: instance.entity().to_string(),
        key: instance.get(pk).to_string(),
    }
}
