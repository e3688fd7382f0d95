//! SQLite implementation of the Persistence Gateway
//!
//! One table per entity, one column per field. Primary key, unique and
//! enforced-reference checks run in the same transaction as the write they
//! guard; deletes and key changes are restricted while an enforced
//! reference still points at the row.

use std::sync::Arc;

use rusqlite::{params_from_iter, Connection};
use tether_core::gateway::primary_key_of;
use tether_core::{
    EntityDefinition, EntityInstance, FieldValues, Gateway, Predicate, Schema, TetherError, Value,
};
use tracing::{debug, trace};

use crate::db::{self, StoreConfig};
use crate::errors::{from_rusqlite, Result};
use crate::schema_ledger;
use crate::statement::{self, Statement};

/// Gateway over one SQLite connection
///
/// `Send` but not `Sync`: open one gateway per thread.
pub struct SqliteGateway {
    conn: Connection,
    schema: Arc<Schema>,
}

impl SqliteGateway {
    /// Wrap an already configured connection
    pub fn new(conn: Connection, schema: Arc<Schema>) -> Self {
        Self { conn, schema }
    }

    /// Open the database described by `config`
    ///
    /// # Errors
    ///
    /// `StorageUnavailable` if the database cannot be opened.
    pub fn open(config: &StoreConfig, schema: Arc<Schema>) -> Result<Self> {
        Ok(Self::new(db::open(config)?, schema))
    }

    /// Open a fresh in-memory database
    ///
    /// # Errors
    ///
    /// `Persistence` if the connection cannot be configured.
    pub fn in_memory(schema: Arc<Schema>) -> Result<Self> {
        Ok(Self::new(db::open_in_memory()?, schema))
    }

    fn select(&self, definition: &EntityDefinition, statement: &Statement) -> Result<Vec<EntityInstance>> {
        query(&self.conn, definition, statement)
    }

    /// Reject a row whose primary key or unique values are taken
    ///
    /// `own_key` is the primary key of the row being updated, if any.
    fn check_unique(
        &self,
        conn: &Connection,
        definition: &EntityDefinition,
        row: &FieldValues,
        own_key: Option<&Value>,
    ) -> Result<()> {
        for field in definition.fields() {
            let is_pk = field.name == definition.primary_key_name();
            if !is_pk && !field.unique {
                continue;
            }
            if is_pk && own_key.is_some() {
                continue;
            }
            let value = row.get(&field.name).unwrap_or(&Value::Null);
            if value.is_null() {
                continue;
            }
            let probe = match own_key {
                Some(key) => statement::exists_other(definition, &field.name, value, key),
                None => statement::exists(definition.name(), &field.name, value),
            };
            if probe_any(conn, definition.name(), &probe)? {
                let reason = if is_pk {
                    format!("duplicate primary key '{}' = {}", field.name, value)
                } else {
                    format!("duplicate value for unique field '{}' = {}", field.name, value)
                };
                return Err(TetherError::constraint(definition.name(), reason));
            }
        }
        Ok(())
    }

    /// Reject a row whose enforced references point at nothing
    fn check_references(&self, conn: &Connection, entity: &str, row: &FieldValues) -> Result<()> {
        for reference in self.schema.references_from(entity) {
            let value = row.get(&reference.from_field).unwrap_or(&Value::Null);
            if value.is_null() {
                continue;
            }
            let probe = statement::exists(&reference.to_entity, &reference.to_field, value);
            if !probe_any(conn, entity, &probe)? {
                return Err(TetherError::constraint(
                    entity,
                    format!(
                        "'{}' = {} references no {}.{}",
                        reference.from_field, value, reference.to_entity, reference.to_field
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Reject removing or changing a value that enforced references still use
    ///
    /// `replacement` is the row after an update, `None` for a delete.
    fn check_restrict(
        &self,
        conn: &Connection,
        entity: &str,
        current: &FieldValues,
        replacement: Option<&FieldValues>,
    ) -> Result<()> {
        for reference in self.schema.references_to(entity) {
            let old = current.get(&reference.to_field).unwrap_or(&Value::Null);
            if old.is_null() {
                continue;
            }
            let unchanged = replacement.is_some_and(|row| row.get(&reference.to_field) == Some(old));
            if unchanged {
                continue;
            }
            let probe = statement::exists(&reference.from_entity, &reference.from_field, old);
            if probe_any(conn, entity, &probe)? {
                return Err(TetherError::constraint(
                    entity,
                    format!(
                        "{}.{} = {} is still referenced by {}.{}",
                        entity, reference.to_field, old, reference.from_entity, reference.from_field
                    ),
                ));
            }
        }
        Ok(())
    }

    fn stored_row(
        &self,
        conn: &Connection,
        definition: &EntityDefinition,
        instance: &EntityInstance,
    ) -> Result<FieldValues> {
        let (pk, key) = primary_key_of(&self.schema, instance)?;
        let statement = statement::select_limit(definition, &Predicate::eq(pk, key.clone()), 1);
        query(conn, definition, &statement)?
            .into_iter()
            .next()
            .map(|found| found.values().clone())
            .ok_or_else(|| TetherError::RecordNotFound {
                entity: definition.name().to_string(),
                key: key.to_string(),
            })
    }
}

impl Gateway for SqliteGateway {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn insert(&self, entity: &str, values: FieldValues) -> Result<EntityInstance> {
        let definition = self.schema.resolve(entity)?;
        let row = definition.prepare_insert(values)?;

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| from_rusqlite(entity, "insert", e))?;
        self.check_unique(&tx, definition, &row, None)?;
        self.check_references(&tx, entity, &row)?;
        execute(&tx, entity, &statement::insert(definition, &row))?;
        tx.commit().map_err(|e| from_rusqlite(entity, "insert", e))?;

        let shown_key = row
            .get(definition.primary_key_name())
            .cloned()
            .unwrap_or(Value::Null);
        debug!(entity, key = %shown_key, "inserted record");
        Ok(EntityInstance::new(entity, row))
    }

    fn find_one(&self, entity: &str, predicate: &Predicate) -> Result<Option<EntityInstance>> {
        let definition = self.schema.resolve(entity)?;
        predicate.validate(definition)?;
        let found = self.select(definition, &statement::select_limit(definition, predicate, 1))?;
        Ok(found.into_iter().next())
    }

    fn find_many(&self, entity: &str, predicate: &Predicate) -> Result<Vec<EntityInstance>> {
        let definition = self.schema.resolve(entity)?;
        predicate.validate(definition)?;
        self.select(definition, &statement::select(definition, predicate))
    }

    fn update(&self, instance: &EntityInstance, changes: FieldValues) -> Result<EntityInstance> {
        let entity = instance.entity();
        let definition = self.schema.resolve(entity)?;

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| from_rusqlite(entity, "update", e))?;
        let current = self.stored_row(&tx, definition, instance)?;
        let row = definition.prepare_update(&current, changes)?;
        let own_key = current
            .get(definition.primary_key_name())
            .cloned()
            .unwrap_or(Value::Null);
        self.check_unique(&tx, definition, &row, Some(&own_key))?;
        self.check_references(&tx, entity, &row)?;
        self.check_restrict(&tx, entity, &current, Some(&row))?;
        execute(&tx, entity, &statement::update(definition, &row))?;
        tx.commit().map_err(|e| from_rusqlite(entity, "update", e))?;

        debug!(entity, key = %own_key, "updated record");
        Ok(EntityInstance::new(entity, row))
    }

    fn delete(&self, instance: &EntityInstance) -> Result<()> {
        let entity = instance.entity();
        let definition = self.schema.resolve(entity)?;

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| from_rusqlite(entity, "delete", e))?;
        let current = self.stored_row(&tx, definition, instance)?;
        self.check_restrict(&tx, entity, &current, None)?;
        let key = current
            .get(definition.primary_key_name())
            .cloned()
            .unwrap_or(Value::Null);
        execute(&tx, entity, &statement::delete(definition, &key))?;
        tx.commit().map_err(|e| from_rusqlite(entity, "delete", e))?;

        debug!(entity, key = %key, "deleted record");
        Ok(())
    }

    fn sync_schema(&self) -> Result<()> {
        schema_ledger::sync(&self.conn, &self.schema)
    }

    fn drop_all(&self) -> Result<()> {
        schema_ledger::drop_all(&self.conn, &self.schema)
    }
}

fn execute(conn: &Connection, entity: &str, statement: &Statement) -> Result<usize> {
    trace!(entity, sql = statement.sql.as_str(), "executing statement");
    conn.execute(&statement.sql, params_from_iter(statement.params.iter()))
        .map_err(|e| from_rusqlite(entity, "execute", e))
}

fn probe_any(conn: &Connection, entity: &str, statement: &Statement) -> Result<bool> {
    trace!(entity, sql = statement.sql.as_str(), "executing statement");
    let mut prepared = conn
        .prepare(&statement.sql)
        .map_err(|e| from_rusqlite(entity, "probe", e))?;
    prepared
        .exists(params_from_iter(statement.params.iter()))
        .map_err(|e| from_rusqlite(entity, "probe", e))
}

fn query(
    conn: &Connection,
    definition: &EntityDefinition,
    statement: &Statement,
) -> Result<Vec<EntityInstance>> {
    let entity = definition.name();
    trace!(entity, sql = statement.sql.as_str(), "executing statement");

    let mut prepared = conn
        .prepare(&statement.sql)
        .map_err(|e| from_rusqlite(entity, "select", e))?;
    let mut rows = prepared
        .query(params_from_iter(statement.params.iter()))
        .map_err(|e| from_rusqlite(entity, "select", e))?;

    let mut found = Vec::new();
    while let Some(row) = rows.next().map_err(|e| from_rusqlite(entity, "select", e))? {
        let mut values = FieldValues::new();
        for (index, field) in definition.fields().iter().enumerate() {
            let raw = row
                .get_ref(index)
                .map_err(|e| from_rusqlite(entity, "select", e))?;
            values.insert(field.name.clone(), statement::decode(entity, field, raw)?);
        }
        found.push(EntityInstance::new(entity, values));
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::{DefaultGenerator, ErrorKind, FieldDef, RelationshipDeclaration, SchemaRegistry};

    fn gateway() -> SqliteGateway {
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
                    .field(FieldDef::text("vin", 17).nullable().unique())
                    .field(FieldDef::text("gearShiftId", 13).nullable()),
            )
            .unwrap()
            .declare_relationship("MediumCar", RelationshipDeclaration::belongs_to("gearShift", "GearShift"))
            .unwrap();
        let gateway = SqliteGateway::in_memory(registry.freeze()).unwrap();
        gateway.sync_schema().unwrap();
        gateway
    }

    fn values<const N: usize>(pairs: [(&str, Value); N]) -> FieldValues {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_insert_and_find_round_trip() {
        let gateway = gateway();
        gateway
            .insert("GearShift", values([("name", Value::from("manual"))]))
            .unwrap();
        let car = gateway
            .insert(
                "MediumCar",
                values([("name", Value::from("SimpleCar1")), ("gearShiftId", Value::from("manual"))]),
            )
            .unwrap();
        assert!(car.get("id").as_uuid().is_some());

        let found = gateway
            .find_one("MediumCar", &Predicate::eq("id", car.get("id").clone()))
            .unwrap()
            .unwrap();
        assert_eq!(found, car);
    }

    #[test]
    fn test_duplicate_primary_key() {
        let gateway = gateway();
        gateway
            .insert("GearShift", values([("name", Value::from("manual"))]))
            .unwrap();
        let err = gateway
            .insert("GearShift", values([("name", Value::from("manual"))]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    }

    #[test]
    fn test_unique_field_checked_on_update() {
        let gateway = gateway();
        gateway
            .insert("MediumCar", values([("name", Value::from("a")), ("vin", Value::from("V1"))]))
            .unwrap();
        let b = gateway
            .insert("MediumCar", values([("name", Value::from("b")), ("vin", Value::from("V2"))]))
            .unwrap();

        let err = gateway
            .update(&b, values([("vin", Value::from("V1"))]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);

        // Keeping its own value is fine
        let same = gateway.update(&b, values([("vin", Value::from("V2"))])).unwrap();
        assert_eq!(same.get("vin"), &Value::from("V2"));
    }

    #[test]
    fn test_dangling_reference_rejected() {
        let gateway = gateway();
        let err = gateway
            .insert(
                "MediumCar",
                values([("name", Value::from("x")), ("gearShiftId", Value::from("hover"))]),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
        assert!(gateway.find_many("MediumCar", &Predicate::all()).unwrap().is_empty());
    }

    #[test]
    fn test_delete_restricted_while_referenced() {
        let gateway = gateway();
        let manual = gateway
            .insert("GearShift", values([("name", Value::from("manual"))]))
            .unwrap();
        let car = gateway
            .insert(
                "MediumCar",
                values([("name", Value::from("c")), ("gearShiftId", Value::from("manual"))]),
            )
            .unwrap();

        let err = gateway.delete(&manual).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);

        gateway.delete(&car).unwrap();
        gateway.delete(&manual).unwrap();
        assert_eq!(gateway.delete(&manual).unwrap_err().kind(), ErrorKind::RecordNotFound);
    }

    #[test]
    fn test_update_missing_row() {
        let gateway = gateway();
        let ghost = EntityInstance::new("GearShift", values([("name", Value::from("ghost"))]));
        let err = gateway.update(&ghost, FieldValues::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RecordNotFound);
    }

    #[test]
    fn test_operations_after_drop_all_fail_until_resync() {
        let gateway = gateway();
        gateway.drop_all().unwrap();
        let err = gateway.find_many("GearShift", &Predicate::all()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);

        gateway.sync_schema().unwrap();
        assert!(gateway.find_many("GearShift", &Predicate::all()).unwrap().is_empty());
    }
}
