//! Relation definitions between entities.

use serde::{Deserialize, Serialize};

/// Cardinality of a relation, seen from its owning entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    /// Many owners point at one target (foreign key on the owner).
    ManyToOne,
    /// One owner is pointed at by many targets (foreign key on the target).
    OneToMany,
}

/// Behavior when the target of a many-to-one relation is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeleteBehavior {
    /// Delete the referencing entities.
    Cascade,
    /// Prevent deletion while referencing entities exist.
    Restrict,
    /// Set the foreign key to null on referencing entities.
    SetNull,
}

/// A named, navigable relation owned by one entity.
///
/// Joining follows `owner.from_field == target.to_field`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDef {
    /// Relation name, unique per owning entity (`user`, `comments`).
    pub name: String,
    /// Entity the relation is navigated from.
    pub from_entity: String,
    /// Field on the owning entity.
    pub from_field: String,
    /// Entity the relation leads to.
    pub to_entity: String,
    /// Field on the target entity.
    pub to_field: String,
    /// Relation cardinality.
    pub cardinality: Cardinality,
    /// Delete behavior, meaningful on many-to-one relations.
    pub on_delete: DeleteBehavior,
}

impl RelationDef {
    /// Create a many-to-one relation through a foreign key on `from_entity`
    /// referencing the identity of `to_entity`.
    pub fn many_to_one(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        from_field: impl Into<String>,
        to_entity: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            from_entity: from_entity.into(),
            from_field: from_field.into(),
            to_entity: to_entity.into(),
            to_field: "id".to_string(),
            cardinality: Cardinality::ManyToOne,
            on_delete: DeleteBehavior::Restrict,
        }
    }

    /// Create a one-to-many relation through a foreign key on `to_entity`
    /// referencing the identity of `from_entity`.
    pub fn one_to_many(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        to_entity: impl Into<String>,
        to_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            from_entity: from_entity.into(),
            from_field: "id".to_string(),
            to_entity: to_entity.into(),
            to_field: to_field.into(),
            cardinality: Cardinality::OneToMany,
            on_delete: DeleteBehavior::Restrict,
        }
    }

    /// Set delete behavior.
    pub fn with_on_delete(mut self, on_delete: DeleteBehavior) -> Self {
        self.on_delete = on_delete;
        self
    }

    /// Check if joining along this relation may repeat owner rows.
    pub fn fans_out(&self) -> bool {
        self.cardinality == Cardinality::OneToMany
    }
}
