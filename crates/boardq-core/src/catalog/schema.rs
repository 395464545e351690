//! Schema bundle - the mapping configuration shared by builder and engine.

use super::{Cardinality, EntityDef, RelationDef};
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Entity and relation definitions for one object graph.
///
/// Built once at startup and shared by reference with the storage engine
/// and the query planner. It never changes after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaBundle {
    /// Schema version.
    pub version: u64,
    /// Entity definitions keyed by name.
    pub entities: HashMap<String, EntityDef>,
    /// Relation definitions.
    pub relations: Vec<RelationDef>,
}

impl SchemaBundle {
    /// Create an empty schema bundle.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            entities: HashMap::new(),
            relations: Vec::new(),
        }
    }

    /// Add an entity to the schema.
    pub fn with_entity(mut self, entity: EntityDef) -> Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    /// Add a relation to the schema.
    pub fn with_relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    /// Get an entity by name.
    pub fn get_entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.get(name)
    }

    /// Get the relation `name` owned by `entity`.
    pub fn get_relation(&self, entity: &str, name: &str) -> Option<&RelationDef> {
        self.relations
            .iter()
            .find(|r| r.from_entity == entity && r.name == name)
    }

    /// Get all relations owned by an entity.
    pub fn relations_from(&self, entity: &str) -> Vec<&RelationDef> {
        self.relations
            .iter()
            .filter(|r| r.from_entity == entity)
            .collect()
    }

    /// Get the many-to-one relations whose target is `entity`, i.e. every
    /// foreign key that can reference a row of `entity`.
    pub fn references_to(&self, entity: &str) -> Vec<&RelationDef> {
        self.relations
            .iter()
            .filter(|r| r.to_entity == entity && r.cardinality == Cardinality::ManyToOne)
            .collect()
    }

    /// List all entity names, sorted.
    pub fn entity_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entities.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Check that every relation joins fields that exist.
    pub fn validate(&self) -> Result<(), Error> {
        for relation in &self.relations {
            let from = self
                .get_entity(&relation.from_entity)
                .ok_or_else(|| Error::UnknownEntity(relation.from_entity.clone()))?;
            let to = self
                .get_entity(&relation.to_entity)
                .ok_or_else(|| Error::UnknownEntity(relation.to_entity.clone()))?;

            if from.get_field(&relation.from_field).is_none() {
                return Err(Error::UnknownField {
                    entity: from.name.clone(),
                    field: relation.from_field.clone(),
                });
            }
            if to.get_field(&relation.to_field).is_none() {
                return Err(Error::UnknownField {
                    entity: to.name.clone(),
                    field: relation.to_field.clone(),
                });
            }
        }

        let mut trees: Vec<&str> = self.entities.values().map(|e| e.tree.as_str()).collect();
        trees.sort_unstable();
        if let Some(pair) = trees.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(Error::InvalidData(format!(
                "storage tree '{}' is mapped by more than one entity",
                pair[0]
            )));
        }

        Ok(())
    }
}
