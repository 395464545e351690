//! Typed query builder.
//!
//! ```ignore
//! let user = UserPath::default();
//! let query = Query::select_from(&user)
//!     .filter(user.name.starts_with("user"))
//!     .order_by(user.name.desc())
//!     .limit(2)
//!     .build(&schema)?;
//! let users: Vec<User> = query.fetch(&engine)?;
//! ```

use super::error::QueryError;
use super::planner::{QueryDraft, QueryPlanner};
use crate::catalog::SchemaBundle;
use crate::model::{Entity, EntityPath, RelationPath};
use boardq_proto::{
    Error as DecodeError, FieldRef, JoinSpec, OrderSpec, Predicate, ProjectedRow, Projection,
    QueryDescription, Source, Value,
};
use std::fmt;

/// Decodes one projected row into the output type.
pub(crate) type Decoder<T> = fn(ProjectedRow) -> Result<T, DecodeError>;

/// What a query returns, paired with how to decode it.
pub struct Selection<T> {
    projection: Projection,
    decode: Decoder<T>,
}

impl<T> Selection<T> {
    /// The projection this selection asks for.
    pub fn projection(&self) -> &Projection {
        &self.projection
    }
}

impl<T> Clone for Selection<T> {
    fn clone(&self) -> Self {
        Self {
            projection: self.projection.clone(),
            decode: self.decode,
        }
    }
}

impl<T> fmt::Debug for Selection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("projection", &self.projection)
            .finish()
    }
}

impl<E: Entity> Selection<E> {
    /// Whole entities bound to `alias`.
    pub fn entity(alias: impl Into<String>) -> Self {
        Self {
            projection: Projection::Entity {
                alias: alias.into(),
            },
            decode: decode_entity::<E>,
        }
    }
}

impl Selection<Option<String>> {
    /// Values of a string field.
    pub fn string_field(field: FieldRef) -> Self {
        Self {
            projection: Projection::Field(field),
            decode: decode_string,
        }
    }
}

impl Selection<Option<i64>> {
    /// Values of an integer field.
    pub fn int_field(field: FieldRef) -> Self {
        Self {
            projection: Projection::Field(field),
            decode: decode_int,
        }
    }
}

impl Selection<i64> {
    /// The number of matching rows.
    pub fn count() -> Self {
        Self {
            projection: Projection::Count,
            decode: decode_count,
        }
    }
}

fn decode_entity<E: Entity>(row: ProjectedRow) -> Result<E, DecodeError> {
    match row {
        ProjectedRow::Entity(row) => E::from_row(&row),
        ProjectedRow::Value(_) => Err(DecodeError::UnexpectedShape("entity")),
    }
}

fn decode_string(row: ProjectedRow) -> Result<Option<String>, DecodeError> {
    match row {
        ProjectedRow::Value(Value::Null) => Ok(None),
        ProjectedRow::Value(Value::String(s)) => Ok(Some(s)),
        _ => Err(DecodeError::UnexpectedShape("string value")),
    }
}

fn decode_int(row: ProjectedRow) -> Result<Option<i64>, DecodeError> {
    match row {
        ProjectedRow::Value(Value::Null) => Ok(None),
        ProjectedRow::Value(value) => value
            .as_i64()
            .map(Some)
            .ok_or(DecodeError::UnexpectedShape("integer value")),
        ProjectedRow::Entity(_) => Err(DecodeError::UnexpectedShape("integer value")),
    }
}

fn decode_count(row: ProjectedRow) -> Result<i64, DecodeError> {
    match row {
        ProjectedRow::Value(value) => value.as_i64().ok_or(DecodeError::UnexpectedShape("count")),
        ProjectedRow::Entity(_) => Err(DecodeError::UnexpectedShape("count")),
    }
}

/// Entry point for building queries.
pub struct Query;

impl Query {
    /// Start a query returning `selection`.
    pub fn select<T>(selection: Selection<T>) -> QueryBuilder<T> {
        QueryBuilder {
            draft: QueryDraft::new(selection.projection),
            decode: selection.decode,
        }
    }

    /// Start a query returning the entities of `path`, with `path` as source.
    pub fn select_from<P: EntityPath>(path: &P) -> QueryBuilder<P::Entity> {
        Self::select(path.entity()).from(path)
    }
}

/// Accumulates a query. Nothing is checked until [`QueryBuilder::build`].
pub struct QueryBuilder<T> {
    draft: QueryDraft,
    decode: Decoder<T>,
}

impl<T> QueryBuilder<T> {
    /// Set the root entity occurrence.
    pub fn from<P: EntityPath>(mut self, path: &P) -> Self {
        self.draft.source = Some(Source {
            entity: P::Entity::NAME.to_string(),
            alias: path.alias().to_string(),
        });
        self
    }

    /// Inner join along `relation`, binding the related entity to `target`.
    pub fn join<P: EntityPath>(mut self, relation: &RelationPath<P>, target: &P) -> Self {
        self.draft.joins.push(JoinSpec {
            from_alias: relation.from_alias().to_string(),
            relation: relation.relation().to_string(),
            alias: target.alias().to_string(),
            entity: P::Entity::NAME.to_string(),
        });
        self
    }

    /// Add a predicate. Repeated calls are conjoined.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.draft.filter = Some(match self.draft.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Append an order directive.
    pub fn order_by(mut self, spec: OrderSpec) -> Self {
        self.draft.order_by.push(spec);
        self
    }

    /// Skip `offset` rows after ordering. Negative values fail at build.
    pub fn offset(mut self, offset: i64) -> Self {
        self.draft.offset = Some(offset);
        self
    }

    /// Return at most `limit` rows. Negative values fail at build.
    pub fn limit(mut self, limit: i64) -> Self {
        self.draft.limit = Some(limit);
        self
    }

    /// Validate against `schema` and freeze the query.
    pub fn build(self, schema: &SchemaBundle) -> Result<TypedQuery<T>, QueryError> {
        let description = QueryPlanner::new(schema).plan(self.draft)?;
        Ok(TypedQuery {
            description,
            decode: self.decode,
        })
    }
}

/// A validated query with a known output type.
pub struct TypedQuery<T> {
    pub(crate) description: QueryDescription,
    pub(crate) decode: Decoder<T>,
}

impl<T> TypedQuery<T> {
    /// The frozen description handed to engines.
    pub fn description(&self) -> &QueryDescription {
        &self.description
    }
}

impl<T> Clone for TypedQuery<T> {
    fn clone(&self) -> Self {
        Self {
            description: self.description.clone(),
            decode: self.decode,
        }
    }
}

impl<T> fmt::Debug for TypedQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedQuery")
            .field("description", &self.description)
            .finish()
    }
}
