//! boardq core - catalog, storage engine, and typed queries.
//!
//! This crate maps the User/Board/Comment object graph onto sled and lets
//! callers build validated, typed queries over it.

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod catalog;
pub mod error;
pub mod model;
pub mod query;
pub mod storage;

pub use catalog::{
    Cardinality, DeleteBehavior, EntityDef, FieldDef, FieldType, RelationDef, ScalarType,
    SchemaBundle,
};
pub use error::Error;
pub use model::{Board, BoardPath, Comment, CommentPath, Entity, EntityPath, User, UserPath};
pub use query::{Query, QueryEngine, QueryError, Selection, TypedQuery, ValidationError};
pub use storage::{DeleteOutcome, StorageConfig, StorageEngine};

/// Re-export protocol types.
pub use boardq_proto as proto;
