//! Query construction and fetch errors.

use crate::error::Error;
use thiserror::Error;

/// A structural problem found while building a query.
///
/// Builders report these as-is; nothing is clamped or corrected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("offset must not be negative, got {0}")]
    NegativeOffset(i64),

    #[error("limit must not be negative, got {0}")]
    NegativeLimit(i64),

    #[error("query has no source entity")]
    MissingSource,

    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    #[error("alias '{0}' is already in use")]
    DuplicateAlias(String),

    #[error("alias '{0}' is not in scope")]
    UnknownAlias(String),

    #[error("entity {entity} has no relation '{relation}'")]
    UnknownRelation { entity: String, relation: String },

    #[error("relation {entity}.{relation} is not one-to-many and has no size")]
    NotOneToMany { entity: String, relation: String },

    #[error("relation '{relation}' leads to {expected}, not {found}")]
    JoinTargetMismatch {
        relation: String,
        expected: String,
        found: String,
    },

    #[error("{entity} (alias '{alias}') has no field '{field}'")]
    UnknownField {
        alias: String,
        entity: String,
        field: String,
    },

    #[error("type mismatch on {field}: expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },
}

/// Errors returned by query building and fetching.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The query is malformed.
    #[error("invalid query: {0}")]
    Validation(#[from] ValidationError),

    /// Equality against a null literal, which never matches under SQL rules.
    #[error("comparison of {field} with null is ambiguous, use is_null() or is_not_null()")]
    AmbiguousNullPredicate { field: String },

    /// `fetch_one` found more than one row.
    #[error("expected at most one result, found {count}")]
    NonUniqueResult { count: usize },

    /// The engine failed to run the query or its rows could not be decoded.
    #[error("query execution failed: {0}")]
    Execution(#[from] Error),
}
