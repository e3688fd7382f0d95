//! In-memory gateway and fixtures for unit tests

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::errors::{Result, TetherError};
use crate::gateway::{primary_key_of, Gateway};
use crate::model::{
    DefaultGenerator, EntityDefinition, EntityInstance, FieldDef, FieldValues, RelationshipDeclaration,
    Value,
};
use crate::predicate::Predicate;
use crate::registry::{Schema, SchemaRegistry};

pub(crate) fn values<const N: usize>(pairs: [(&str, Value); N]) -> FieldValues {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// GearShift (natural key `name`), MediumCar and MediumDriver
///
/// - `GearShift.cars` has-many `MediumCar` on `gearShiftId`
/// - `MediumCar.gearShift` belongs-to `GearShift`
/// - `MediumDriver.preferredGearShift` belongs-to `GearShift`
pub(crate) fn gear_shift_schema() -> Arc<Schema> {
    let mut registry = SchemaRegistry::new();
    registry
        .register(
            EntityDefinition::new("GearShift")
                .field(FieldDef::text("name", 13))
                .primary_key("name"),
        )
        .unwrap()
        .register(
            EntityDefinition::new("MediumCar")
                .field(FieldDef::uuid("id").default_to(DefaultGenerator::UuidV4))
                .field(FieldDef::text("name", 120))
                .field(FieldDef::text("gearShiftId", 13).nullable()),
        )
        .unwrap()
        .register(
            EntityDefinition::new("MediumDriver")
                .field(FieldDef::uuid("id").default_to(DefaultGenerator::UuidV4))
                .field(FieldDef::text("name", 120))
                .field(FieldDef::text("preferredGearShiftId", 13).nullable()),
        )
        .unwrap()
        .declare_relationship("GearShift", RelationshipDeclaration::has_many("cars", "MediumCar"))
        .unwrap()
        .declare_relationship("MediumCar", RelationshipDeclaration::belongs_to("gearShift", "GearShift"))
        .unwrap()
        .declare_relationship(
            "MediumDriver",
            RelationshipDeclaration::belongs_to("preferredGearShift", "GearShift"),
        )
        .unwrap();
    registry.freeze()
}

/// Gateway over per-entity vectors, counting `find_*` calls
///
/// Checks primary keys and enforced references on insert; enough to stand
/// in for a backend in resolver and hydration tests.
pub(crate) struct MemoryGateway {
    schema: Arc<Schema>,
    rows: RefCell<BTreeMap<String, Vec<FieldValues>>>,
    queries: Cell<usize>,
}

impl MemoryGateway {
    pub(crate) fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            rows: RefCell::new(BTreeMap::new()),
            queries: Cell::new(0),
        }
    }

    pub(crate) fn query_count(&self) -> usize {
        self.queries.get()
    }

    pub(crate) fn reset_queries(&self) {
        self.queries.set(0);
    }

    fn scan(&self, entity: &str, predicate: &Predicate) -> Result<Vec<EntityInstance>> {
        predicate.validate(self.schema.resolve(entity)?)?;
        self.queries.set(self.queries.get() + 1);
        Ok(self
            .rows
            .borrow()
            .get(entity)
            .into_iter()
            .flatten()
            .map(|row| EntityInstance::new(entity, row.clone()))
            .filter(|instance| predicate.matches(instance))
            .collect())
    }

    fn exists(&self, entity: &str, field: &str, value: &Value) -> bool {
        self.rows
            .borrow()
            .get(entity)
            .is_some_and(|rows| rows.iter().any(|r| r.get(field) == Some(value)))
    }
}

impl Gateway for MemoryGateway {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn insert(&self, entity: &str, values: FieldValues) -> Result<EntityInstance> {
        let definition = self.schema.resolve(entity)?;
        let row = definition.prepare_insert(values)?;
        let pk = definition.primary_key_name();
        if self.exists(entity, pk, &row[pk]) {
            return Err(TetherError::constraint(entity, "duplicate primary key"));
        }
        for reference in self.schema.references_from(entity) {
            let value = &row[&reference.from_field];
            if !value.is_null() && !self.exists(&reference.to_entity, &reference.to_field, value) {
                return Err(TetherError::constraint(entity, "dangling reference"));
            }
        }
        self.rows
            .borrow_mut()
            .entry(entity.to_string())
            .or_default()
            .push(row.clone());
        Ok(EntityInstance::new(entity, row))
    }

    fn find_one(&self, entity: &str, predicate: &Predicate) -> Result<Option<EntityInstance>> {
        Ok(self.scan(entity, predicate)?.into_iter().next())
    }

    fn find_many(&self, entity: &str, predicate: &Predicate) -> Result<Vec<EntityInstance>> {
        self.scan(entity, predicate)
    }

    fn update(&self, instance: &EntityInstance, changes: FieldValues) -> Result<EntityInstance> {
        let definition = self.schema.resolve(instance.entity())?;
        let (pk, key) = primary_key_of(&self.schema, instance)?;
        let key = Value::from(key);
        let mut rows = self.rows.borrow_mut();
        let row = rows
            .get_mut(instance.entity())
            .and_then(|rows| rows.iter_mut().find(|r| r.get(pk) == Some(&key)))
            .ok_or_else(|| TetherError::RecordNotFound {
                entity: instance.entity().to_string(),
                key: key.to_string(),
            })?;
        *row = definition.prepare_update(row, changes)?;
        Ok(EntityInstance::new(instance.entity(), row.clone()))
    }

    fn delete(&self, instance: &EntityInstance) -> Result<()> {
        let (pk, key) = primary_key_of(&self.schema, instance)?;
        let key = Value::from(key);
        let mut rows = self.rows.borrow_mut();
        let rows = rows.entry(instance.entity().to_string()).or_default();
        let before = rows.len();
        rows.retain(|r| r.get(pk) != Some(&key));
        if rows.len() == before {
            return Err(TetherError::RecordNotFound {
                entity: instance.entity().to_string(),
                key: key.to_string(),
            });
        }
        Ok(())
    }

    fn sync_schema(&self) -> Result<()> {
        Ok(())
    }

    fn drop_all(&self) -> Result<()> {
        self.rows.borrow_mut().clear();
        Ok(())
    }
}

#[test]
fn test_memory_gateway_reload_and_delete() {
    let gateway = MemoryGateway::new(gear_shift_schema());
    let gear = gateway
        .insert("GearShift", values([("name", Value::from("manual"))]))
        .unwrap();
    assert_eq!(gateway.reload(&gear).unwrap(), gear);
    gateway.delete(&gear).unwrap();
    let err = gateway.reload(&gear).unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::RecordNotFound);
}
