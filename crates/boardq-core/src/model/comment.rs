//! The `Comment` entity.

use super::{Board, Entity, User};
use boardq_proto::{EntityRow, Value};

/// A comment on a board. It lives only as long as its board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    id: Option<i64>,
    content: String,
    user_id: Option<i64>,
    board_id: Option<i64>,
}

impl Comment {
    /// Create a transient comment by `user` on `board`.
    pub fn new(content: impl Into<String>, user: &User, board: &Board) -> Self {
        Self {
            id: None,
            content: content.into(),
            user_id: user.id(),
            board_id: board.id(),
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }

    pub fn board_id(&self) -> Option<i64> {
        self.board_id
    }
}

impl Entity for Comment {
    const NAME: &'static str = "Comment";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn to_fields(&self) -> Vec<(String, Value)> {
        vec![
            ("content".to_string(), Value::from(self.content.as_str())),
            ("user_id".to_string(), self.user_id.into()),
            ("board_id".to_string(), self.board_id.into()),
        ]
    }

    fn from_row(row: &EntityRow) -> Result<Self, boardq_proto::Error> {
        Ok(Self {
            id: Some(row.id),
            content: row.string("content")?,
            user_id: Some(row.int("user_id")?),
            board_id: Some(row.int("board_id")?),
        })
    }
}
