//! Storage layer built on sled.
//!
//! Rows are rkyv-encoded [`Record`]s, one sled tree per entity, keyed by the
//! entity id.

mod config;
mod engine;
pub mod key;
mod record;

pub use config::StorageConfig;
pub use engine::{DeleteOutcome, StorageEngine};
pub use record::{Record, StoredField};
