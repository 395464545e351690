//! The User/Board/Comment object graph.
//!
//! Entities are plain values. They get an identity only when handed to
//! [`StorageEngine::persist`](crate::storage::StorageEngine::persist), which
//! returns the persisted copy.

mod board;
mod comment;
pub mod path;
mod user;

pub use board::Board;
pub use comment::Comment;
pub use path::{
    BoardPath, CommentPath, EntityPath, NumberPath, RelationPath, SizePath, StringPath, UserPath,
};
pub use user::User;

use crate::catalog::{
    DeleteBehavior, EntityDef, FieldDef, FieldType, RelationDef, ScalarType, SchemaBundle,
};
use boardq_proto::{EntityRow, Value};

/// Schema version of the bundled mapping.
pub const SCHEMA_VERSION: u64 = 1;

/// A mapped entity type.
pub trait Entity: Sized {
    /// Entity name in the catalog.
    const NAME: &'static str;

    /// Engine-assigned identity, `None` while transient.
    fn id(&self) -> Option<i64>;

    /// Stored field values, identity excluded.
    fn to_fields(&self) -> Vec<(String, Value)>;

    /// Rebuild the entity from a decoded row.
    fn from_row(row: &EntityRow) -> Result<Self, boardq_proto::Error>;
}

/// Mapping configuration for User, Board and Comment.
///
/// Boards and comments must reference persisted rows. Deleting a board
/// removes its comments. Users cannot be deleted while referenced.
pub fn schema() -> SchemaBundle {
    let user = EntityDef::new(User::NAME)
        .with_field(FieldDef::new("name", FieldType::optional(ScalarType::String)));

    let board = EntityDef::new(Board::NAME)
        .with_field(FieldDef::new("title", FieldType::scalar(ScalarType::String)))
        .with_field(FieldDef::new("content", FieldType::scalar(ScalarType::String)))
        .with_field(FieldDef::new("user_id", FieldType::scalar(ScalarType::Int64)));

    let comment = EntityDef::new(Comment::NAME)
        .with_field(FieldDef::new("content", FieldType::scalar(ScalarType::String)))
        .with_field(FieldDef::new("user_id", FieldType::scalar(ScalarType::Int64)))
        .with_field(FieldDef::new("board_id", FieldType::scalar(ScalarType::Int64)));

    SchemaBundle::new(SCHEMA_VERSION)
        .with_entity(user)
        .with_entity(board)
        .with_entity(comment)
        .with_relation(RelationDef::many_to_one("user", Board::NAME, "user_id", User::NAME))
        .with_relation(RelationDef::one_to_many(
            "comments",
            Board::NAME,
            Comment::NAME,
            "board_id",
        ))
        .with_relation(RelationDef::many_to_one("user", Comment::NAME, "user_id", User::NAME))
        .with_relation(
            RelationDef::many_to_one("board", Comment::NAME, "board_id", Board::NAME)
                .with_on_delete(DeleteBehavior::Cascade),
        )
        .with_relation(RelationDef::one_to_many("boards", User::NAME, Board::NAME, "user_id"))
        .with_relation(RelationDef::one_to_many(
            "comments",
            User::NAME,
            Comment::NAME,
            "user_id",
        ))
}
