//! The `Board` entity.

use super::{Entity, User};
use boardq_proto::{EntityRow, Value};

/// A board, owned by the user who wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    id: Option<i64>,
    title: String,
    content: String,
    user_id: Option<i64>,
}

impl Board {
    /// Create a transient board written by `user`.
    ///
    /// The user must be persisted before the board is, or persisting fails.
    pub fn new(title: impl Into<String>, content: impl Into<String>, user: &User) -> Self {
        Self {
            id: None,
            title: title.into(),
            content: content.into(),
            user_id: user.id(),
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Identity of the owning user.
    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }
}

impl Entity for Board {
    const NAME: &'static str = "Board";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn to_fields(&self) -> Vec<(String, Value)> {
        vec![
            ("title".to_string(), Value::from(self.title.as_str())),
            ("content".to_string(), Value::from(self.content.as_str())),
            ("user_id".to_string(), self.user_id.into()),
        ]
    }

    fn from_row(row: &EntityRow) -> Result<Self, boardq_proto::Error> {
        Ok(Self {
            id: Some(row.id),
            title: row.string("title")?,
            content: row.string("content")?,
            user_id: Some(row.int("user_id")?),
        })
    }
}
