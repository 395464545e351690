//! Row decoding errors.

use crate::value::Value;
use thiserror::Error;

/// Errors raised while reading typed values out of result rows.
#[derive(Debug, Error)]
pub enum Error {
    /// The row does not carry the requested field.
    #[error("missing field: {0}")]
    MissingField(String),

    /// The field holds a value of another type.
    #[error("field {field}: expected {expected}, found {found}")]
    UnexpectedType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The row has a different shape than the projection requires.
    #[error("unexpected row shape: expected {0}")]
    UnexpectedShape(&'static str),
}

impl Error {
    pub(crate) fn unexpected(field: &str, expected: &'static str, found: &Value) -> Self {
        Error::UnexpectedType {
            field: field.to_string(),
            expected,
            found: found.type_name(),
        }
    }
}
