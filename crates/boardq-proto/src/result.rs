//! Result rows returned by a query engine.

use crate::error::Error;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// A decoded entity: its identity and its stored fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRow {
    /// Engine-assigned identity.
    pub id: i64,
    /// Field values, including the identity field.
    pub fields: Vec<(String, Value)>,
}

impl EntityRow {
    /// Create a row from an id and its fields.
    pub fn new(id: i64, fields: Vec<(String, Value)>) -> Self {
        Self { id, fields }
    }

    /// Look up a field value by name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == field).map(|(_, v)| v)
    }

    /// Look up a field value, failing if the row does not carry it.
    pub fn require(&self, field: &str) -> Result<&Value, Error> {
        self.get(field).ok_or_else(|| Error::MissingField(field.to_string()))
    }

    /// Required string field.
    pub fn string(&self, field: &str) -> Result<String, Error> {
        match self.require(field)? {
            Value::String(s) => Ok(s.clone()),
            other => Err(Error::unexpected(field, "string", other)),
        }
    }

    /// Nullable string field.
    pub fn optional_string(&self, field: &str) -> Result<Option<String>, Error> {
        match self.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(Error::unexpected(field, "string", other)),
        }
    }

    /// Required integer field.
    pub fn int(&self, field: &str) -> Result<i64, Error> {
        let value = self.require(field)?;
        value
            .as_i64()
            .ok_or_else(|| Error::unexpected(field, "int64", value))
    }
}

/// One row of a query result, shaped by the query's projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProjectedRow {
    /// A whole entity.
    Entity(EntityRow),
    /// A single value (field projection or count).
    Value(Value),
}

impl ProjectedRow {
    /// Borrow the entity, if this row carries one.
    pub fn as_entity(&self) -> Option<&EntityRow> {
        match self {
            ProjectedRow::Entity(row) => Some(row),
            ProjectedRow::Value(_) => None,
        }
    }

    /// Borrow the value, if this row carries one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            ProjectedRow::Value(value) => Some(value),
            ProjectedRow::Entity(_) => None,
        }
    }
}

/// Rows returned for one submitted query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RowSet {
    /// Rows after ordering and pagination.
    pub rows: Vec<ProjectedRow>,
    /// Number of matching rows before pagination.
    pub total: u64,
}

impl RowSet {
    /// Create a row set.
    pub fn new(rows: Vec<ProjectedRow>, total: u64) -> Self {
        Self { rows, total }
    }

    /// Number of returned rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if no rows were returned.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_row() -> EntityRow {
        EntityRow::new(
            7,
            vec![
                ("name".to_string(), Value::String("user1".into())),
                ("nickname".to_string(), Value::Null),
            ],
        )
    }

    #[test]
    fn test_field_accessors() {
        let row = user_row();
        assert_eq!(row.string("name").unwrap(), "user1");
        assert_eq!(row.optional_string("nickname").unwrap(), None);
        assert_eq!(row.optional_string("missing").unwrap(), None);
        assert!(matches!(row.string("missing"), Err(Error::MissingField(f)) if f == "missing"));
        assert!(matches!(
            row.int("name"),
            Err(Error::UnexpectedType { expected: "int64", .. })
        ));
    }

    #[test]
    fn test_projected_row_accessors() {
        let entity = ProjectedRow::Entity(user_row());
        assert_eq!(entity.as_entity().map(|r| r.id), Some(7));
        assert!(entity.as_value().is_none());

        let value = ProjectedRow::Value(Value::Int64(5));
        assert_eq!(value.as_value(), Some(&Value::Int64(5)));
    }
}
