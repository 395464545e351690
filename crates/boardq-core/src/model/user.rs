//! The `User` entity.

use super::Entity;
use boardq_proto::{EntityRow, Value};

/// A user. The name is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: Option<i64>,
    name: Option<String>,
}

impl User {
    /// Create a transient named user.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }

    /// Create a transient user without a name.
    pub fn unnamed() -> Self {
        Self { id: None, name: None }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl Entity for User {
    const NAME: &'static str = "User";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn to_fields(&self) -> Vec<(String, Value)> {
        vec![("name".to_string(), self.name.clone().into())]
    }

    fn from_row(row: &EntityRow) -> Result<Self, boardq_proto::Error> {
        Ok(Self {
            id: Some(row.id),
            name: row.optional_string("name")?,
        })
    }
}
