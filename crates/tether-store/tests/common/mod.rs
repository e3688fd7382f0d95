// Shared helpers for tether-store integration tests

#![allow(dead_code)]

use std::cell::Cell;
use std::path::PathBuf;

use tether_core::{
    EntityInstance, FieldValues, Gateway, Predicate, Result, Schema, Value,
};
use tether_store::seed::{build_schema, import_seed, parse_seed_file};
use tether_store::SqliteGateway;

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// In-memory gateway loaded with a fixture seed
pub fn seeded_gateway(fixture: &str) -> SqliteGateway {
    let seed = parse_seed_file(&fixtures_dir().join(fixture)).unwrap();
    let gateway = SqliteGateway::in_memory(build_schema(&seed).unwrap()).unwrap();
    import_seed(&seed, &gateway).unwrap();
    gateway
}

pub fn values<const N: usize>(pairs: [(&str, Value); N]) -> FieldValues {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

pub fn names(instances: &[EntityInstance]) -> Vec<String> {
    let mut names: Vec<String> = instances
        .iter()
        .map(|i| i.get("name").to_string())
        .collect();
    names.sort();
    names
}

/// Gateway wrapper counting read round trips
pub struct CountingGateway<'a> {
    inner: &'a dyn Gateway,
    reads: Cell<usize>,
}

impl<'a> CountingGateway<'a> {
    pub fn new(inner: &'a dyn Gateway) -> Self {
        Self {
            inner,
            reads: Cell::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    fn count(&self) {
        self.reads.set(self.reads.get() + 1);
    }
}

impl Gateway for CountingGateway<'_> {
    fn schema(&self) -> &Schema {
        self.inner.schema()
    }

    fn insert(&self, entity: &str, values: FieldValues) -> Result<EntityInstance> {
        self.inner.insert(entity, values)
    }

    fn find_one(&self, entity: &str, predicate: &Predicate) -> Result<Option<EntityInstance>> {
        self.count();
        self.inner.find_one(entity, predicate)
    }

    fn find_many(&self, entity: &str, predicate: &Predicate) -> Result<Vec<EntityInstance>> {
        self.count();
        self.inner.find_many(entity, predicate)
    }

    fn update(&self, instance: &EntityInstance, changes: FieldValues) -> Result<EntityInstance> {
        self.inner.update(instance, changes)
    }

    fn delete(&self, instance: &EntityInstance) -> Result<()> {
        self.inner.delete(instance)
    }

    fn sync_schema(&self) -> Result<()> {
        self.inner.sync_schema()
    }

    fn drop_all(&self) -> Result<()> {
        self.inner.drop_all()
    }
}
