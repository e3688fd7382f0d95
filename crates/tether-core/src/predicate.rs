//! Field predicates used by `find_one`, `find_many` and `load`

use crate::errors::Result;
use crate::model::{EntityDefinition, EntityInstance, Value};

/// Conjunctive filter over the fields of one entity
///
/// `Eq` with a `Null` value means "field is null", the same as `IsNull`.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every record
    All,
    Eq(String, Value),
    IsNull(String),
    /// Field equals any of the values; an empty list matches nothing
    In(String, Vec<Value>),
    And(Vec<Predicate>),
}

impl Predicate {
    pub fn all() -> Self {
        Predicate::All
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Eq(field.into(), value.into())
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Predicate::IsNull(field.into())
    }

    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Predicate::In(field.into(), values)
    }

    /// Conjunction; `All` operands are dropped
    pub fn and(self, other: Predicate) -> Self {
        match (self, other) {
            (Predicate::All, p) | (p, Predicate::All) => p,
            (Predicate::And(mut left), Predicate::And(right)) => {
                left.extend(right);
                Predicate::And(left)
            }
            (Predicate::And(mut left), p) => {
                left.push(p);
                Predicate::And(left)
            }
            (p, q) => Predicate::And(vec![p, q]),
        }
    }

    /// Check that every referenced field exists on `definition`
    ///
    /// # Errors
    ///
    /// Returns `UnknownField` for the first field that does not exist.
    pub fn validate(&self, definition: &EntityDefinition) -> Result<()> {
        match self {
            Predicate::All => Ok(()),
            Predicate::Eq(field, _) | Predicate::IsNull(field) | Predicate::In(field, _) => {
                definition.require_field(field).map(|_| ())
            }
            Predicate::And(parts) => parts.iter().try_for_each(|p| p.validate(definition)),
        }
    }

    /// Evaluate against an in-memory instance
    ///
    /// Comparison is on coerced values: a text literal matches a uuid field
    /// holding the same UUID.
    pub fn matches(&self, instance: &EntityInstance) -> bool {
        match self {
            Predicate::All => true,
            Predicate::IsNull(field) => instance.get(field).is_null(),
            Predicate::Eq(field, value) => value_matches(instance.get(field), value),
            Predicate::In(field, values) => {
                let actual = instance.get(field);
                values.iter().any(|v| !v.is_null() && value_matches(actual, v))
            }
            Predicate::And(parts) => parts.iter().all(|p| p.matches(instance)),
        }
    }
}

fn value_matches(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (_, Value::Null) => actual.is_null(),
        (Value::Uuid(a), Value::Text(t)) => a.to_string().eq_ignore_ascii_case(t),
        (Value::Real(a), Value::Integer(i)) => *a == *i as f64,
        _ => actual == expected,
    }
}
