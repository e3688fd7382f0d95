//! SQL statement rendering
//!
//! Every statement is SQL text plus positional parameters. Identifiers are
//! always double-quoted and values are always bound, never interpolated.

use rusqlite::types::{Value as SqlValue, ValueRef};
use tether_core::{EntityDefinition, FieldDef, FieldType, FieldValues, Predicate, Value};
use uuid::Uuid;

use crate::errors::{decode_error, Result};

/// SQL text with its bound parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    fn new(sql: String, params: Vec<SqlValue>) -> Self {
        Self { sql, params }
    }
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Declared SQL type of a column
pub fn column_type(field_type: &FieldType) -> String {
    match field_type {
        FieldType::Text { max_len: Some(n) } => format!("VARCHAR({})", n),
        FieldType::Text { max_len: None } => "TEXT".to_string(),
        FieldType::Integer => "INTEGER".to_string(),
        FieldType::Real => "REAL".to_string(),
        FieldType::Boolean => "BOOLEAN".to_string(),
        FieldType::Uuid => "UUID".to_string(),
    }
}

fn column_definition(definition: &EntityDefinition, field: &FieldDef) -> String {
    let is_pk = field.name == definition.primary_key_name();
    // An INTEGER PRIMARY KEY aliases rowid and would break insertion order
    let sql_type = match field.field_type {
        FieldType::Integer if is_pk => "INT".to_string(),
        ref other => column_type(other),
    };
    let mut column = format!("{} {}", quote_ident(&field.name), sql_type);
    if is_pk {
        column.push_str(" NOT NULL PRIMARY KEY");
    } else {
        if !field.nullable {
            column.push_str(" NOT NULL");
        }
        if field.unique {
            column.push_str(" UNIQUE");
        }
    }
    column
}

/// `CREATE TABLE IF NOT EXISTS` for one entity
///
/// The text is deterministic for a given definition; its checksum is what
/// the schema ledger records.
pub fn create_table(definition: &EntityDefinition) -> Statement {
    let columns: Vec<String> = definition
        .fields()
        .iter()
        .map(|f| column_definition(definition, f))
        .collect();
    Statement::new(
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_ident(definition.name()),
            columns.join(", ")
        ),
        Vec::new(),
    )
}

pub fn drop_table(entity: &str) -> Statement {
    Statement::new(format!("DROP TABLE IF EXISTS {}", quote_ident(entity)), Vec::new())
}

pub fn insert(definition: &EntityDefinition, row: &FieldValues) -> Statement {
    let fields = definition.fields();
    let columns: Vec<String> = fields.iter().map(|f| quote_ident(&f.name)).collect();
    let placeholders = vec!["?"; fields.len()].join(", ");
    let params = fields
        .iter()
        .map(|f| to_sql_value(row.get(&f.name).unwrap_or(&Value::Null)))
        .collect();
    Statement::new(
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(definition.name()),
            columns.join(", "),
            placeholders
        ),
        params,
    )
}

/// Select every column of matching rows in insertion order
pub fn select(definition: &EntityDefinition, predicate: &Predicate) -> Statement {
    let columns: Vec<String> = definition
        .fields()
        .iter()
        .map(|f| quote_ident(&f.name))
        .collect();
    let mut params = Vec::new();
    let condition = render_predicate(definition, predicate, &mut params);
    Statement::new(
        format!(
            "SELECT {} FROM {} WHERE {} ORDER BY rowid",
            columns.join(", "),
            quote_ident(definition.name()),
            condition
        ),
        params,
    )
}

pub fn select_limit(definition: &EntityDefinition, predicate: &Predicate, limit: usize) -> Statement {
    let mut statement = select(definition, predicate);
    statement.sql.push_str(&format!(" LIMIT {}", limit));
    statement
}

/// Rewrite every non-key column of the row identified by its primary key
pub fn update(definition: &EntityDefinition, row: &FieldValues) -> Statement {
    let pk = definition.primary_key_name();
    let mut assignments = Vec::new();
    let mut params = Vec::new();
    for field in definition.fields().iter().filter(|f| f.name != pk) {
        assignments.push(format!("{} = ?", quote_ident(&field.name)));
        params.push(to_sql_value(row.get(&field.name).unwrap_or(&Value::Null)));
    }
    params.push(to_sql_value(row.get(pk).unwrap_or(&Value::Null)));
    let sql = if assignments.is_empty() {
        // Only a primary key: nothing to rewrite, still confirm the row
        format!(
            "UPDATE {} SET {pk} = {pk} WHERE {pk} = ?",
            quote_ident(definition.name()),
            pk = quote_ident(pk)
        )
    } else {
        format!(
            "UPDATE {} SET {} WHERE {} = ?",
            quote_ident(definition.name()),
            assignments.join(", "),
            quote_ident(pk)
        )
    };
    Statement::new(sql, params)
}

pub fn delete(definition: &EntityDefinition, key: &Value) -> Statement {
    Statement::new(
        format!(
            "DELETE FROM {} WHERE {} = ?",
            quote_ident(definition.name()),
            quote_ident(definition.primary_key_name())
        ),
        vec![to_sql_value(key)],
    )
}

/// Any row with `field = value`
pub fn exists(entity: &str, field: &str, value: &Value) -> Statement {
    Statement::new(
        format!(
            "SELECT 1 FROM {} WHERE {} = ? LIMIT 1",
            quote_ident(entity),
            quote_ident(field)
        ),
        vec![to_sql_value(value)],
    )
}

/// Any row other than the one keyed `pk_value` with `field = value`
pub fn exists_other(
    definition: &EntityDefinition,
    field: &str,
    value: &Value,
    pk_value: &Value,
) -> Statement {
    Statement::new(
        format!(
            "SELECT 1 FROM {} WHERE {} = ? AND {} <> ? LIMIT 1",
            quote_ident(definition.name()),
            quote_ident(field),
            quote_ident(definition.primary_key_name())
        ),
        vec![to_sql_value(value), to_sql_value(pk_value)],
    )
}

/// Render a predicate as a WHERE condition, appending its parameters
///
/// Literals are coerced to the field's type first; a literal that cannot be
/// represented in the field matches nothing.
pub fn render_predicate(
    definition: &EntityDefinition,
    predicate: &Predicate,
    params: &mut Vec<SqlValue>,
) -> String {
    match predicate {
        Predicate::All => "1".to_string(),
        Predicate::IsNull(field) => format!("{} IS NULL", quote_ident(field)),
        Predicate::Eq(field, value) => match coerce(definition, field, value) {
            Some(Value::Null) => format!("{} IS NULL", quote_ident(field)),
            Some(value) => {
                params.push(to_sql_value(&value));
                format!("{} = ?", quote_ident(field))
            }
            None => "0".to_string(),
        },
        Predicate::In(field, values) => {
            let coerced: Vec<Value> = values
                .iter()
                .filter_map(|v| coerce(definition, field, v))
                .filter(|v| !v.is_null())
                .collect();
            if coerced.is_empty() {
                return "0".to_string();
            }
            let placeholders = vec!["?"; coerced.len()].join(", ");
            params.extend(coerced.iter().map(to_sql_value));
            format!("{} IN ({})", quote_ident(field), placeholders)
        }
        Predicate::And(parts) if parts.is_empty() => "1".to_string(),
        Predicate::And(parts) => parts
            .iter()
            .map(|p| format!("({})", render_predicate(definition, p, params)))
            .collect::<Vec<_>>()
            .join(" AND "),
    }
}

fn coerce(definition: &EntityDefinition, field: &str, value: &Value) -> Option<Value> {
    let field_type = definition.get_field(field)?.field_type;
    field_type.coerce(value.clone())
}

pub fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Boolean(b) => SqlValue::Integer(i64::from(*b)),
        Value::Integer(i) => SqlValue::Integer(*i),
        Value::Real(r) => SqlValue::Real(*r),
        Value::Uuid(u) => SqlValue::Text(u.hyphenated().to_string()),
        Value::Text(s) => SqlValue::Text(s.clone()),
    }
}

/// Decode a stored column into the field's value type
///
/// # Errors
///
/// `Persistence` if the stored value cannot represent the field type.
pub fn decode(entity: &str, field: &FieldDef, raw: ValueRef<'_>) -> Result<Value> {
    let value = match (field.field_type, raw) {
        (_, ValueRef::Null) => Value::Null,
        (FieldType::Text { .. }, ValueRef::Text(bytes)) => Value::Text(utf8(entity, field, bytes)?),
        (FieldType::Uuid, ValueRef::Text(bytes)) => {
            let text = utf8(entity, field, bytes)?;
            Value::Uuid(
                Uuid::parse_str(&text).map_err(|e| decode_error(entity, &field.name, e.to_string()))?,
            )
        }
        (FieldType::Integer, ValueRef::Integer(i)) => Value::Integer(i),
        (FieldType::Real, ValueRef::Real(r)) => Value::Real(r),
        (FieldType::Real, ValueRef::Integer(i)) => Value::Real(i as f64),
        (FieldType::Boolean, ValueRef::Integer(i)) => Value::Boolean(i != 0),
        (field_type, other) => {
            return Err(decode_error(
                entity,
                &field.name,
                format!("stored {:?} is not a {}", other.data_type(), field_type),
            ))
        }
    };
    Ok(value)
}

fn utf8(entity: &str, field: &FieldDef, bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| decode_error(entity, &field.name, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::DefaultGenerator;

    fn medium_car() -> EntityDefinition {
        EntityDefinition::new("MediumCar")
            .field(FieldDef::uuid("id").default_to(DefaultGenerator::UuidV4))
            .field(FieldDef::text("name", 120))
            .field(FieldDef::text("gearShiftId", 13).nullable())
            .field(FieldDef::text("vin", 17).nullable().unique())
    }

    #[test]
    fn test_create_table_ddl() {
        let ddl = create_table(&medium_car());
        assert_eq!(
            ddl.sql,
            "CREATE TABLE IF NOT EXISTS \"MediumCar\" (\"id\" UUID NOT NULL PRIMARY KEY, \
             \"name\" VARCHAR(120) NOT NULL, \"gearShiftId\" VARCHAR(13), \"vin\" VARCHAR(17) UNIQUE)"
        );
        assert!(ddl.params.is_empty());
    }

    #[test]
    fn test_integer_primary_key_is_not_a_rowid_alias() {
        let ddl = create_table(
            &EntityDefinition::new("Counter")
                .field(FieldDef::integer("id"))
                .field(FieldDef::integer("hits")),
        );
        assert_eq!(
            ddl.sql,
            "CREATE TABLE IF NOT EXISTS \"Counter\" (\"id\" INT NOT NULL PRIMARY KEY, \"hits\" INTEGER NOT NULL)"
        );
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_select_binds_values() {
        let statement = select(&medium_car(), &Predicate::eq("gearShiftId", "manual"));
        assert!(statement.sql.ends_with("WHERE \"gearShiftId\" = ? ORDER BY rowid"));
        assert_eq!(statement.params, vec![SqlValue::Text("manual".to_string())]);
    }

    #[test]
    fn test_render_null_and_empty_in() {
        let def = medium_car();
        let mut params = Vec::new();
        let sql = render_predicate(
            &def,
            &Predicate::eq("gearShiftId", Value::Null).and(Predicate::is_in("name", vec![])),
            &mut params,
        );
        assert_eq!(sql, "(\"gearShiftId\" IS NULL) AND (0)");
        assert!(params.is_empty());
    }

    #[test]
    fn test_render_coerces_uuid_literals() {
        let id = Uuid::new_v4();
        let mut params = Vec::new();
        let sql = render_predicate(
            &medium_car(),
            &Predicate::eq("id", id.to_string().to_uppercase()),
            &mut params,
        );
        assert_eq!(sql, "\"id\" = ?");
        assert_eq!(params, vec![SqlValue::Text(id.hyphenated().to_string())]);
    }

    #[test]
    fn test_render_unrepresentable_literal_matches_nothing() {
        let mut params = Vec::new();
        let sql = render_predicate(&medium_car(), &Predicate::eq("id", "not-a-uuid"), &mut params);
        assert_eq!(sql, "0");
    }

    #[test]
    fn test_update_skips_primary_key_column() {
        let def = medium_car();
        let id = Uuid::new_v4();
        let row = FieldValues::from([
            ("id".to_string(), Value::Uuid(id)),
            ("name".to_string(), Value::from("SuperCar1")),
        ]);
        let statement = update(&def, &row);
        assert!(statement.sql.starts_with("UPDATE \"MediumCar\" SET \"name\" = ?"));
        assert!(statement.sql.ends_with("WHERE \"id\" = ?"));
        assert_eq!(statement.params.len(), 4);
        assert_eq!(statement.params[3], SqlValue::Text(id.to_string()));
    }

    #[test]
    fn test_decode_round_trips_field_types() {
        let def = medium_car();
        let id = Uuid::new_v4();
        let text = id.to_string();
        let decoded = decode("MediumCar", def.get_field("id").unwrap(), ValueRef::Text(text.as_bytes()))
            .unwrap();
        assert_eq!(decoded, Value::Uuid(id));

        let flag = FieldDef::new("active", FieldType::Boolean);
        assert_eq!(decode("X", &flag, ValueRef::Integer(1)).unwrap(), Value::Boolean(true));
        assert!(decode("X", &flag, ValueRef::Text(b"yes")).is_err());
    }
}
