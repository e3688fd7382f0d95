//! Dotted relationship paths such as `cars.driver`

use std::fmt;
use std::str::FromStr;

use crate::errors::{Result, TetherError};
use crate::model::Relationship;
use crate::registry::Schema;

/// Sequence of relationship names walked from a root entity
///
/// `cars.driver` on `GearShift` means: the `cars` relationship of each gear
/// shift, then the `driver` relationship of each car found.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationPath {
    segments: Vec<String>,
}

impl RelationPath {
    /// Parse a dotted path
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` for an empty path or an empty segment.
    pub fn parse(path: &str) -> Result<Self> {
        let path = path.trim();
        if path.is_empty() {
            return Err(invalid(path, "path is empty"));
        }
        let segments: Vec<String> = path.split('.').map(|s| s.trim().to_string()).collect();
        if segments.iter().any(String::is_empty) {
            return Err(invalid(path, "path contains an empty segment"));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Walk the path from `root`, returning the relationship at each step
    ///
    /// # Errors
    ///
    /// Returns `UnknownEntity` for an unknown root, or `UnknownRelationship`
    /// for the first segment that is not a relationship of the entity reached.
    pub fn validate<'s>(&self, schema: &'s Schema, root: &str) -> Result<Vec<&'s Relationship>> {
        let mut entity = schema.resolve(root)?.name();
        let mut steps = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            let rel = schema.relationship(entity, segment)?;
            entity = rel.target.as_str();
            steps.push(rel);
        }
        Ok(steps)
    }
}

fn invalid(path: &str, reason: &str) -> TetherError {
    TetherError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

impl FromStr for RelationPath {
    type Err = TetherError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for RelationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}
