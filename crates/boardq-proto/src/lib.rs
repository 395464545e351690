//! boardq query description types.
//!
//! This crate defines the data a caller hands to a query engine and the rows
//! it gets back. Nothing here performs I/O.
//!
//! # Modules
//!
//! - [`value`] - Runtime values for predicate literals, stored fields and results
//! - [`query`] - Predicates, order keys, joins, projections and [`QueryDescription`]
//! - [`result`] - Rows returned by an engine
//! - [`error`] - Row decoding errors

pub mod error;
pub mod query;
pub mod result;
pub mod value;

pub use error::Error;

// Re-export commonly used types at crate root
pub use query::{
    FieldRef, JoinSpec, NullOrdering, OrderDirection, OrderKey, OrderSpec, Pagination,
    Predicate, Projection, QueryDescription, Source,
};
pub use result::{EntityRow, ProjectedRow, RowSet};
pub use value::Value;
