//! Mapping catalog for boardq.
//!
//! The catalog describes entities, the storage tree each one lives in, their
//! fields and the relations between them.

mod entity;
mod field;
mod relation;
mod schema;
mod types;

pub use entity::EntityDef;
pub use field::FieldDef;
pub use relation::{Cardinality, DeleteBehavior, RelationDef};
pub use schema::SchemaBundle;
pub use types::{FieldType, ScalarType};
