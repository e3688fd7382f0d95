use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use super::value::{KeyValue, Value};

/// Field name to value
pub type FieldValues = BTreeMap<String, Value>;

/// State of one relationship slot on an instance
///
/// `Unresolved` means "not loaded"; `None` and an empty `Many` mean
/// "loaded, and nothing matched". The two must never be conflated.
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    Unresolved,
    One(Box<EntityInstance>),
    Many(Vec<EntityInstance>),
    None,
}

static UNRESOLVED: Related = Related::Unresolved;
static NULL: Value = Value::Null;

impl Related {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Related::Unresolved)
    }

    pub fn as_one(&self) -> Option<&EntityInstance> {
        match self {
            Related::One(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn as_many(&self) -> Option<&[EntityInstance]> {
        match self {
            Related::Many(instances) => Some(instances),
            _ => None,
        }
    }

    /// Resolved instances in this slot (empty when unresolved or none)
    pub fn instances(&self) -> &[EntityInstance] {
        match self {
            Related::One(instance) => std::slice::from_ref(&**instance),
            Related::Many(instances) => instances,
            Related::Unresolved | Related::None => &[],
        }
    }

    pub(crate) fn instances_mut(&mut self) -> &mut [EntityInstance] {
        match self {
            Related::One(instance) => std::slice::from_mut(&mut **instance),
            Related::Many(instances) => instances,
            Related::Unresolved | Related::None => &mut [],
        }
    }
}

/// A runtime record of an entity
///
/// Instances are caches of durable state: they do not track the backend
/// and go stale unless reloaded through the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityInstance {
    entity: String,
    values: FieldValues,
    relations: BTreeMap<String, Related>,
}

impl EntityInstance {
    /// Create an instance with every relationship unresolved
    pub fn new(entity: impl Into<String>, values: FieldValues) -> Self {
        Self {
            entity: entity.into(),
            values,
            relations: BTreeMap::new(),
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Value of a field; `Null` when the field is not present
    pub fn get(&self, field: &str) -> &Value {
        self.values.get(field).unwrap_or(&NULL)
    }

    /// Key projection of a field's value
    pub fn key_of(&self, field: &str) -> Option<KeyValue> {
        self.get(field).key()
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    /// Slot for a relationship; `Unresolved` unless a load attached it
    pub fn relation(&self, name: &str) -> &Related {
        self.relations.get(name).unwrap_or(&UNRESOLVED)
    }

    pub fn is_resolved(&self, name: &str) -> bool {
        self.relation(name).is_resolved()
    }

    /// Names of the relationships resolved on this instance
    pub fn resolved_relations(&self) -> impl Iterator<Item = &str> {
        self.relations.keys().map(String::as_str)
    }

    pub(crate) fn set_relation(&mut self, name: &str, related: Related) {
        if related.is_resolved() {
            self.relations.insert(name.to_string(), related);
        } else {
            self.relations.remove(name);
        }
    }

    pub(crate) fn relation_mut(&mut self, name: &str) -> Option<&mut Related> {
        self.relations.get_mut(name)
    }
}

impl Serialize for EntityInstance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + self.relations.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        for (name, related) in &self.relations {
            map.serialize_entry(name, related)?;
        }
        map.end()
    }
}

impl Serialize for Related {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Related::One(instance) => instance.serialize(serializer),
            Related::Many(instances) => {
                let mut seq = serializer.serialize_seq(Some(instances.len()))?;
                for instance in instances {
                    seq.serialize_element(instance)?;
                }
                seq.end()
            }
            Related::Unresolved | Related::None => serializer.serialize_none(),
        }
    }
}
