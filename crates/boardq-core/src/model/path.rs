//! Typed field paths.
//!
//! A path value names one occurrence of an entity in a query (its alias)
//! and exposes that entity's fields with operators fitting their type.
//! `UserPath::default()` is the `user` alias; `UserPath::new("author")`
//! gives a second occurrence its own name.

use super::{Board, Comment, Entity, User};
use crate::query::Selection;
use boardq_proto::{FieldRef, OrderKey, OrderSpec, Predicate, Value};
use std::marker::PhantomData;

/// An aliased entity occurrence usable as a query source or join target.
pub trait EntityPath {
    /// Entity bound to the alias.
    type Entity: Entity;

    /// Alias of this occurrence.
    fn alias(&self) -> &str;

    /// Selection returning whole entities of this occurrence.
    fn entity(&self) -> Selection<Self::Entity> {
        Selection::entity(self.alias())
    }
}

/// A string-typed field of an aliased entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringPath {
    field: FieldRef,
}

impl StringPath {
    pub fn new(alias: &str, field: &str) -> Self {
        Self {
            field: FieldRef::new(alias, field),
        }
    }

    /// The field reference this path denotes.
    pub fn field_ref(&self) -> &FieldRef {
        &self.field
    }

    /// `field = value`. A null literal is rejected when the query is built.
    pub fn eq(&self, value: impl Into<Value>) -> Predicate {
        Predicate::eq(self.field.clone(), value)
    }

    /// `field <> value`. A null literal is rejected when the query is built.
    pub fn ne(&self, value: impl Into<Value>) -> Predicate {
        Predicate::ne(self.field.clone(), value)
    }

    pub fn starts_with(&self, prefix: impl Into<String>) -> Predicate {
        Predicate::starts_with(self.field.clone(), prefix)
    }

    pub fn ends_with(&self, suffix: impl Into<String>) -> Predicate {
        Predicate::ends_with(self.field.clone(), suffix)
    }

    /// SQL LIKE: `%` matches any run of characters, `_` exactly one, `\`
    /// escapes the next character.
    pub fn like(&self, pattern: impl Into<String>) -> Predicate {
        Predicate::like(self.field.clone(), pattern)
    }

    pub fn is_null(&self) -> Predicate {
        Predicate::is_null(self.field.clone())
    }

    pub fn is_not_null(&self) -> Predicate {
        Predicate::is_not_null(self.field.clone())
    }

    pub fn asc(&self) -> OrderSpec {
        OrderSpec::asc(self.field.clone())
    }

    pub fn desc(&self) -> OrderSpec {
        OrderSpec::desc(self.field.clone())
    }

    /// Selection returning this field's values.
    pub fn field(&self) -> Selection<Option<String>> {
        Selection::string_field(self.field.clone())
    }
}

/// An integer-typed field of an aliased entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberPath {
    field: FieldRef,
}

impl NumberPath {
    pub fn new(alias: &str, field: &str) -> Self {
        Self {
            field: FieldRef::new(alias, field),
        }
    }

    pub fn field_ref(&self) -> &FieldRef {
        &self.field
    }

    pub fn eq(&self, value: impl Into<Value>) -> Predicate {
        Predicate::eq(self.field.clone(), value)
    }

    pub fn ne(&self, value: impl Into<Value>) -> Predicate {
        Predicate::ne(self.field.clone(), value)
    }

    pub fn is_null(&self) -> Predicate {
        Predicate::is_null(self.field.clone())
    }

    pub fn is_not_null(&self) -> Predicate {
        Predicate::is_not_null(self.field.clone())
    }

    pub fn asc(&self) -> OrderSpec {
        OrderSpec::asc(self.field.clone())
    }

    pub fn desc(&self) -> OrderSpec {
        OrderSpec::desc(self.field.clone())
    }

    pub fn field(&self) -> Selection<Option<i64>> {
        Selection::int_field(self.field.clone())
    }
}

/// A named relation navigated from an aliased entity, leading to `P`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationPath<P> {
    from_alias: String,
    relation: &'static str,
    _target: PhantomData<fn() -> P>,
}

impl<P: EntityPath> RelationPath<P> {
    pub fn new(from_alias: &str, relation: &'static str) -> Self {
        Self {
            from_alias: from_alias.to_string(),
            relation,
            _target: PhantomData,
        }
    }

    /// Alias the relation is navigated from.
    pub fn from_alias(&self) -> &str {
        &self.from_alias
    }

    /// Relation name on the joined-from entity.
    pub fn relation(&self) -> &str {
        self.relation
    }

    /// Number of related rows, usable as an order key. Only one-to-many
    /// relations pass validation.
    pub fn size(&self) -> SizePath {
        SizePath {
            key: OrderKey::relation_size(self.from_alias.as_str(), self.relation),
        }
    }
}

/// The size of a relation from an aliased entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizePath {
    key: OrderKey,
}

impl SizePath {
    pub fn asc(&self) -> OrderSpec {
        OrderSpec::asc(self.key.clone())
    }

    pub fn desc(&self) -> OrderSpec {
        OrderSpec::desc(self.key.clone())
    }
}

/// Paths over an aliased [`User`].
#[derive(Debug, Clone)]
pub struct UserPath {
    alias: String,
    pub id: NumberPath,
    pub name: StringPath,
    pub boards: RelationPath<BoardPath>,
    pub comments: RelationPath<CommentPath>,
}

impl UserPath {
    pub fn new(alias: &str) -> Self {
        Self {
            alias: alias.to_string(),
            id: NumberPath::new(alias, "id"),
            name: StringPath::new(alias, "name"),
            boards: RelationPath::new(alias, "boards"),
            comments: RelationPath::new(alias, "comments"),
        }
    }
}

impl Default for UserPath {
    fn default() -> Self {
        Self::new("user")
    }
}

impl EntityPath for UserPath {
    type Entity = User;

    fn alias(&self) -> &str {
        &self.alias
    }
}

/// Paths over an aliased [`Board`].
#[derive(Debug, Clone)]
pub struct BoardPath {
    alias: String,
    pub id: NumberPath,
    pub title: StringPath,
    pub content: StringPath,
    pub user_id: NumberPath,
    pub user: RelationPath<UserPath>,
    pub comments: RelationPath<CommentPath>,
}

impl BoardPath {
    pub fn new(alias: &str) -> Self {
        Self {
            alias: alias.to_string(),
            id: NumberPath::new(alias, "id"),
            title: StringPath::new(alias, "title"),
            content: StringPath::new(alias, "content"),
            user_id: NumberPath::new(alias, "user_id"),
            user: RelationPath::new(alias, "user"),
            comments: RelationPath::new(alias, "comments"),
        }
    }
}

impl Default for BoardPath {
    fn default() -> Self {
        Self::new("board")
    }
}

impl EntityPath for BoardPath {
    type Entity = Board;

    fn alias(&self) -> &str {
        &self.alias
    }
}

/// Paths over an aliased [`Comment`].
#[derive(Debug, Clone)]
pub struct CommentPath {
    alias: String,
    pub id: NumberPath,
    pub content: StringPath,
    pub user_id: NumberPath,
    pub board_id: NumberPath,
    pub user: RelationPath<UserPath>,
    pub board: RelationPath<BoardPath>,
}

impl CommentPath {
    pub fn new(alias: &str) -> Self {
        Self {
            alias: alias.to_string(),
            id: NumberPath::new(alias, "id"),
            content: StringPath::new(alias, "content"),
            user_id: NumberPath::new(alias, "user_id"),
            board_id: NumberPath::new(alias, "board_id"),
            user: RelationPath::new(alias, "user"),
            board: RelationPath::new(alias, "board"),
        }
    }
}

impl Default for CommentPath {
    fn default() -> Self {
        Self::new("comment")
    }
}

impl EntityPath for CommentPath {
    type Entity = Comment;

    fn alias(&self) -> &str {
        &self.alias
    }
}
