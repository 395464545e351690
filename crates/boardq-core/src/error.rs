//! Core error types.

use thiserror::Error;

/// Storage and engine errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Row decoding error.
    #[error("protocol error: {0}")]
    Protocol(#[from] boardq_proto::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Key decoding error.
    #[error("invalid key format")]
    InvalidKey,

    /// Record not found.
    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: i64 },

    /// The entity already carries an engine-assigned identity.
    #[error("{entity} is already persisted with id {id}")]
    AlreadyPersisted { entity: String, id: i64 },

    /// A required field or reference is missing.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Entity not present in the schema.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    /// Field not present on the entity.
    #[error("unknown field: {entity}.{field}")]
    UnknownField { entity: String, field: String },

    /// Value of the wrong type for a field or operator.
    #[error("type mismatch on {field}: expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    /// Invalid data format.
    #[error("invalid data: {0}")]
    InvalidData(String),
}
