//! Relationship Resolver
//!
//! Resolves one relationship of one instance by querying the target entity
//! for rows whose foreign key equals the instance's source key.

use tracing::debug;

use crate::errors::{Result, TetherError};
use crate::gateway::Gateway;
use crate::model::{Cardinality, EntityInstance, KeyValue, Related, Relationship};
use crate::predicate::Predicate;

pub struct Resolver<'g> {
    gateway: &'g dyn Gateway,
}

impl<'g> Resolver<'g> {
    pub fn new(gateway: &'g dyn Gateway) -> Self {
        Self { gateway }
    }

    /// Resolve `relationship` on `root`
    ///
    /// A null source key resolves to the empty value of the relationship's
    /// cardinality without touching the backend. The returned instances have
    /// no relationships resolved.
    ///
    /// # Errors
    ///
    /// `UnknownEntity`, `UnknownRelationship`, `MultipleMatches` when a
    /// single-valued relationship matches more than one row, or any gateway
    /// error.
    pub fn resolve(&self, root: &EntityInstance, relationship: &str) -> Result<Related> {
        let rel = self.gateway.schema().relationship(root.entity(), relationship)?;
        let Some(key) = source_key_value(root, rel) else {
            log_resolution(rel, 0, false);
            return Ok(rel.empty());
        };
        let matches = self.fetch(rel, &key)?;
        log_resolution(rel, matches.len(), true);
        collapse(rel, matches)
    }

    /// Target rows whose foreign key equals `key`
    pub(crate) fn fetch(&self, rel: &Relationship, key: &KeyValue) -> Result<Vec<EntityInstance>> {
        self.gateway
            .find_many(&rel.target, &Predicate::eq(rel.foreign_key.as_str(), key.clone()))
    }
}

/// Source key of `rel` on `instance`, `None` when null or absent
pub(crate) fn source_key_value(instance: &EntityInstance, rel: &Relationship) -> Option<KeyValue> {
    instance.key_of(&rel.source_key)
}

/// Shape matched rows according to the relationship's cardinality
pub(crate) fn collapse(rel: &Relationship, mut matches: Vec<EntityInstance>) -> Result<Related> {
    match rel.cardinality() {
        Cardinality::Many => Ok(Related::Many(matches)),
        Cardinality::One => match matches.len() {
            0 => Ok(Related::None),
            1 => Ok(matches.pop().map_or(Related::None, |m| Related::One(Box::new(m)))),
            count => Err(TetherError::MultipleMatches {
                entity: rel.owner.clone(),
                relationship: rel.name.clone(),
                count,
            }),
        },
    }
}

pub(crate) fn log_resolution(rel: &Relationship, match_count: usize, queried: bool) {
    debug!(
        entity = rel.owner.as_str(),
        relationship = rel.name.as_str(),
        match_count,
        queried,
        "resolved relationship"
    );
}
