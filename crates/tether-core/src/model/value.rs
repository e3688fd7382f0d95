use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Declared column type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Text, with an optional length used only when rendering DDL
    Text { max_len: Option<u32> },
    Integer,
    Real,
    Boolean,
    Uuid,
}

impl FieldType {
    /// Text with a declared maximum length
    pub fn text(max_len: u32) -> Self {
        FieldType::Text {
            max_len: Some(max_len),
        }
    }

    /// Short lowercase name of the type kind
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldType::Text { .. } => "text",
            FieldType::Integer => "integer",
            FieldType::Real => "real",
            FieldType::Boolean => "boolean",
            FieldType::Uuid => "uuid",
        }
    }

    /// Whether values of this type can be used to match related rows
    pub fn is_key_type(&self) -> bool {
        !matches!(self, FieldType::Real)
    }

    /// Same kind of type; text length does not matter
    pub fn is_compatible_with(&self, other: &FieldType) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Convert a value into this type's canonical representation
    ///
    /// `Null` passes through (nullability is checked by the entity definition).
    /// Integers widen into real fields and hyphenated strings parse into uuid
    /// fields. Returns `None` when the value cannot be represented.
    pub fn coerce(&self, value: Value) -> Option<Value> {
        match (self, value) {
            (_, Value::Null) => Some(Value::Null),
            (FieldType::Text { .. }, v @ Value::Text(_)) => Some(v),
            (FieldType::Integer, v @ Value::Integer(_)) => Some(v),
            (FieldType::Real, v @ Value::Real(_)) => Some(v),
            (FieldType::Real, Value::Integer(i)) => Some(Value::Real(i as f64)),
            (FieldType::Boolean, v @ Value::Boolean(_)) => Some(v),
            (FieldType::Uuid, v @ Value::Uuid(_)) => Some(v),
            (FieldType::Uuid, Value::Text(s)) => Uuid::parse_str(&s).ok().map(Value::Uuid),
            _ => None,
        }
    }

    /// Parse a literal typed on a command line or in a filter string
    ///
    /// `null` always parses to `Value::Null`.
    pub fn parse_literal(&self, literal: &str) -> Option<Value> {
        if literal == "null" {
            return Some(Value::Null);
        }
        match self {
            FieldType::Text { .. } => Some(Value::Text(literal.to_string())),
            FieldType::Integer => literal.parse().ok().map(Value::Integer),
            FieldType::Real => literal.parse().ok().map(Value::Real),
            FieldType::Boolean => literal.parse().ok().map(Value::Boolean),
            FieldType::Uuid => Uuid::parse_str(literal).ok().map(Value::Uuid),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Text { max_len: Some(n) } => write!(f, "text({})", n),
            other => write!(f, "{}", other.kind_name()),
        }
    }
}

/// A single field value of an entity instance
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Uuid(Uuid),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Value::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    /// Comparable key projection; `None` for null and real values
    pub fn key(&self) -> Option<KeyValue> {
        match self {
            Value::Null | Value::Real(_) => None,
            Value::Boolean(b) => Some(KeyValue::Boolean(*b)),
            Value::Integer(i) => Some(KeyValue::Integer(*i)),
            Value::Uuid(u) => Some(KeyValue::Uuid(*u)),
            Value::Text(s) => Some(KeyValue::Text(s.clone())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Uuid(u) => write!(f, "{}", u),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Value::Real(r)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Uuid(u)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<KeyValue> for Value {
    fn from(key: KeyValue) -> Self {
        match key {
            KeyValue::Boolean(b) => Value::Boolean(b),
            KeyValue::Integer(i) => Value::Integer(i),
            KeyValue::Uuid(u) => Value::Uuid(u),
            KeyValue::Text(s) => Value::Text(s),
        }
    }
}

/// Hashable, totally ordered key value
///
/// Relationship matching compares source and foreign keys through this
/// type, so any key-typed field can take part in a join, not only primary keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyValue {
    Boolean(bool),
    Integer(i64),
    Uuid(Uuid),
    Text(String),
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Boolean(b) => write!(f, "{}", b),
            KeyValue::Integer(i) => write!(f, "{}", i),
            KeyValue::Uuid(u) => write!(f, "{}", u),
            KeyValue::Text(s) => write!(f, "{}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_length_does_not_affect_compatibility() {
        assert!(FieldType::text(13).is_compatible_with(&FieldType::text(120)));
        assert!(FieldType::text(13).is_compatible_with(&FieldType::Text { max_len: None }));
        assert!(!FieldType::text(13).is_compatible_with(&FieldType::Uuid));
    }

    #[test]
    fn test_real_is_not_a_key_type() {
        assert!(!FieldType::Real.is_key_type());
        assert!(FieldType::Uuid.is_key_type());
        assert_eq!(Value::Real(1.5).key(), None);
        assert_eq!(Value::Null.key(), None);
    }

    #[test]
    fn test_coerce_uuid_from_text() {
        let id = Uuid::new_v4();
        let coerced = FieldType::Uuid.coerce(Value::Text(id.to_string()));
        assert_eq!(coerced, Some(Value::Uuid(id)));
        assert_eq!(FieldType::Uuid.coerce(Value::from("not-a-uuid")), None);
    }

    #[test]
    fn test_coerce_rejects_mismatched_kinds() {
        assert_eq!(FieldType::Integer.coerce(Value::from("7")), None);
        assert_eq!(FieldType::text(5).coerce(Value::Integer(7)), None);
        assert_eq!(FieldType::Real.coerce(Value::Integer(2)), Some(Value::Real(2.0)));
        assert_eq!(FieldType::Boolean.coerce(Value::Null), Some(Value::Null));
    }

    #[test]
    fn test_text_length_is_not_enforced() {
        // 14 characters into a text(13) field
        let coerced = FieldType::text(13).coerce(Value::from("semi-automatic"));
        assert_eq!(coerced, Some(Value::from("semi-automatic")));
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(FieldType::Integer.parse_literal("42"), Some(Value::Integer(42)));
        assert_eq!(FieldType::Boolean.parse_literal("true"), Some(Value::Boolean(true)));
        assert_eq!(FieldType::Integer.parse_literal("x"), None);
        assert_eq!(FieldType::text(10).parse_literal("null"), Some(Value::Null));
    }

    #[test]
    fn test_key_round_trip_into_value() {
        let key = Value::from("manual").key().unwrap();
        assert_eq!(Value::from(key), Value::from("manual"));
    }

    #[test]
    fn test_value_serializes_untagged() {
        let json = serde_json::to_string(&vec![
            Value::Null,
            Value::Integer(3),
            Value::from("automatic"),
            Value::Boolean(false),
        ])
        .unwrap();
        assert_eq!(json, r#"[null,3,"automatic",false]"#);
    }
}
