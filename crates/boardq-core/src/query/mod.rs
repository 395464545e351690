//! Query construction and execution.
//!
//! A [`Query`] accumulates a projection, source, joins, predicates, order
//! and pagination; `build` validates it against the catalog and yields a
//! [`TypedQuery`]. Fetching submits its description to a [`QueryEngine`]
//! and enforces the requested result cardinality.

mod builder;
mod error;
mod executor;
mod fetch;
mod filter;
mod join;
mod planner;
mod sort;

pub use builder::{Query, QueryBuilder, Selection, TypedQuery};
pub use error::{QueryError, ValidationError};
pub use executor::{QueryEngine, QueryExecutor};
pub use filter::{like_match, FilterEvaluator};
pub use join::{HashJoinExecutor, JoinedRow};
pub use planner::{QueryDraft, QueryPlanner};
pub use sort::{sort_rows, RelationSizes};
