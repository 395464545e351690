//! Entity definitions.

use super::field::FieldDef;
use super::types::{FieldType, ScalarType};
use serde::{Deserialize, Serialize};

/// An entity definition and the storage location its rows live in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    /// Entity name (unique within schema).
    pub name: String,
    /// Name of the sled tree holding this entity's rows.
    pub tree: String,
    /// Name of the identity field. Always an engine-assigned int64.
    pub identity_field: String,
    /// Field definitions, identity included.
    pub fields: Vec<FieldDef>,
}

impl EntityDef {
    /// Create a new entity definition with an `id` identity field.
    ///
    /// The storage tree defaults to the lowercased entity name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            tree: name.to_lowercase(),
            name,
            identity_field: "id".to_string(),
            fields: vec![FieldDef::new("id", FieldType::scalar(ScalarType::Int64))],
        }
    }

    /// Store rows in a differently named tree.
    pub fn with_tree(mut self, tree: impl Into<String>) -> Self {
        self.tree = tree.into();
        self
    }

    /// Add a field to the entity.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields stored in a record, i.e. everything but the identity.
    pub fn data_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.name != self.identity_field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_builder() {
        let entity = EntityDef::new("User")
            .with_field(FieldDef::new("name", FieldType::optional(ScalarType::String)));

        assert_eq!(entity.name, "User");
        assert_eq!(entity.tree, "user");
        assert_eq!(entity.identity_field, "id");
        assert_eq!(entity.fields.len(), 2);
        assert_eq!(entity.data_fields().count(), 1);
    }

    #[test]
    fn test_get_field() {
        let entity = EntityDef::new("Board")
            .with_tree("boards")
            .with_field(FieldDef::new("title", FieldType::scalar(ScalarType::String)));

        assert_eq!(entity.tree, "boards");
        assert!(entity.get_field("id").is_some());
        assert!(entity.get_field("title").unwrap().is_required());
        assert!(entity.get_field("nonexistent").is_none());
    }
}
