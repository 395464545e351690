//! Query description types.
//!
//! A [`QueryDescription`] is the frozen, engine-facing form of a query: a
//! projection, a root source, inner joins, an optional predicate tree, an
//! order list and pagination bounds. It holds no counters, timestamps or
//! handles, so two descriptions built from the same inputs compare equal.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A reference to a field of an aliased entity (`user.name`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    /// Alias of the entity occurrence in the query.
    pub alias: String,
    /// Field name on that entity.
    pub field: String,
}

impl FieldRef {
    /// Create a field reference.
    pub fn new(alias: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            field: field.into(),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.alias, self.field)
    }
}

/// Boolean filter expression evaluated per row.
///
/// Predicates are plain values. Combinators take their operands by value and
/// return a new tree; nothing is mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// Field equals value.
    Eq { field: FieldRef, value: Value },
    /// Field does not equal value.
    Ne { field: FieldRef, value: Value },
    /// String field starts with a prefix.
    StartsWith { field: FieldRef, prefix: String },
    /// String field ends with a suffix.
    EndsWith { field: FieldRef, suffix: String },
    /// String field matches a LIKE pattern.
    Like { field: FieldRef, pattern: String },
    /// Field is null.
    IsNull { field: FieldRef },
    /// Field is not null.
    IsNotNull { field: FieldRef },
    /// All operands must hold.
    And(Vec<Predicate>),
    /// At least one operand must hold.
    Or(Vec<Predicate>),
    /// Operand must not hold.
    Not(Box<Predicate>),
}

impl Predicate {
    /// Create an equality predicate.
    pub fn eq(field: FieldRef, value: impl Into<Value>) -> Self {
        Predicate::Eq {
            field,
            value: value.into(),
        }
    }

    /// Create a not-equal predicate.
    pub fn ne(field: FieldRef, value: impl Into<Value>) -> Self {
        Predicate::Ne {
            field,
            value: value.into(),
        }
    }

    /// Create a prefix predicate.
    pub fn starts_with(field: FieldRef, prefix: impl Into<String>) -> Self {
        Predicate::StartsWith {
            field,
            prefix: prefix.into(),
        }
    }

    /// Create a suffix predicate.
    pub fn ends_with(field: FieldRef, suffix: impl Into<String>) -> Self {
        Predicate::EndsWith {
            field,
            suffix: suffix.into(),
        }
    }

    /// Create a LIKE predicate.
    pub fn like(field: FieldRef, pattern: impl Into<String>) -> Self {
        Predicate::Like {
            field,
            pattern: pattern.into(),
        }
    }

    /// Create an IS NULL predicate.
    pub fn is_null(field: FieldRef) -> Self {
        Predicate::IsNull { field }
    }

    /// Create an IS NOT NULL predicate.
    pub fn is_not_null(field: FieldRef) -> Self {
        Predicate::IsNotNull { field }
    }

    /// Conjunction of `self` and `other`.
    ///
    /// Nested conjunctions are flattened, so `a.and(b).and(c)` is a single
    /// `And` with three operands.
    pub fn and(self, other: Predicate) -> Self {
        let mut operands = match self {
            Predicate::And(ops) => ops,
            single => vec![single],
        };
        match other {
            Predicate::And(ops) => operands.extend(ops),
            single => operands.push(single),
        }
        Predicate::And(operands)
    }

    /// Disjunction of `self` and `other`, flattened like [`Predicate::and`].
    pub fn or(self, other: Predicate) -> Self {
        let mut operands = match self {
            Predicate::Or(ops) => ops,
            single => vec![single],
        };
        match other {
            Predicate::Or(ops) => operands.extend(ops),
            single => operands.push(single),
        }
        Predicate::Or(operands)
    }

    /// Negation of `self`.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// Conjunction of every predicate in `predicates`.
    ///
    /// Returns `None` for an empty input and the predicate itself for a
    /// single one.
    pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Option<Self> {
        predicates.into_iter().reduce(Predicate::and)
    }

    /// All field references in this predicate tree, in visit order.
    pub fn fields(&self) -> Vec<&FieldRef> {
        let mut fields = Vec::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields<'a>(&'a self, fields: &mut Vec<&'a FieldRef>) {
        match self {
            Predicate::Eq { field, .. }
            | Predicate::Ne { field, .. }
            | Predicate::StartsWith { field, .. }
            | Predicate::EndsWith { field, .. }
            | Predicate::Like { field, .. }
            | Predicate::IsNull { field }
            | Predicate::IsNotNull { field } => fields.push(field),
            Predicate::And(ops) | Predicate::Or(ops) => {
                for op in ops {
                    op.collect_fields(fields);
                }
            }
            Predicate::Not(inner) => inner.collect_fields(fields),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

/// Where null values are placed relative to non-null values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NullOrdering {
    /// Nulls sort as the smallest value: first ascending, last descending.
    #[default]
    Default,
    /// Nulls come before every non-null value, whatever the direction.
    First,
    /// Nulls come after every non-null value, whatever the direction.
    Last,
}

/// What an order directive sorts on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKey {
    /// A field of an aliased entity.
    Field(FieldRef),
    /// The number of rows a one-to-many relation leads to from an aliased
    /// entity (`board.comments.size()`). Never null.
    RelationSize { alias: String, relation: String },
}

impl OrderKey {
    /// Create a relation size key.
    pub fn relation_size(alias: impl Into<String>, relation: impl Into<String>) -> Self {
        OrderKey::RelationSize {
            alias: alias.into(),
            relation: relation.into(),
        }
    }
}

impl From<FieldRef> for OrderKey {
    fn from(field: FieldRef) -> Self {
        OrderKey::Field(field)
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKey::Field(field) => write!(f, "{field}"),
            OrderKey::RelationSize { alias, relation } => write!(f, "{alias}.{relation}.size()"),
        }
    }
}

/// A single order directive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderSpec {
    /// Value to order by.
    pub key: OrderKey,
    /// Sort direction for non-null values.
    pub direction: OrderDirection,
    /// Null placement.
    pub nulls: NullOrdering,
}

impl OrderSpec {
    /// Create an ascending order spec.
    pub fn asc(key: impl Into<OrderKey>) -> Self {
        Self {
            key: key.into(),
            direction: OrderDirection::Asc,
            nulls: NullOrdering::Default,
        }
    }

    /// Create a descending order spec.
    pub fn desc(key: impl Into<OrderKey>) -> Self {
        Self {
            key: key.into(),
            direction: OrderDirection::Desc,
            nulls: NullOrdering::Default,
        }
    }

    /// Place nulls before all non-null values.
    pub fn nulls_first(mut self) -> Self {
        self.nulls = NullOrdering::First;
        self
    }

    /// Place nulls after all non-null values.
    pub fn nulls_last(mut self) -> Self {
        self.nulls = NullOrdering::Last;
        self
    }
}

/// Offset/limit pagination bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Pagination {
    /// Number of matching rows to skip after ordering.
    pub offset: u64,
    /// Maximum number of rows to return. `None` means unbounded.
    pub limit: Option<u64>,
}

impl Pagination {
    /// Create pagination with limit and offset.
    pub fn new(offset: u64, limit: Option<u64>) -> Self {
        Self { offset, limit }
    }

    /// Create pagination with just a limit.
    pub fn limit(limit: u64) -> Self {
        Self {
            offset: 0,
            limit: Some(limit),
        }
    }

    /// Check whether these bounds let every row through.
    pub fn is_unbounded(&self) -> bool {
        self.offset == 0 && self.limit.is_none()
    }

    /// Tighten the limit to at most `max`, keeping the offset.
    pub fn capped(self, max: u64) -> Self {
        Self {
            offset: self.offset,
            limit: Some(self.limit.map_or(max, |limit| limit.min(max))),
        }
    }

    /// Apply the bounds to an ordered row vector.
    pub fn apply<T>(&self, rows: &mut Vec<T>) {
        let offset = usize::try_from(self.offset).unwrap_or(usize::MAX);
        if offset >= rows.len() {
            rows.clear();
            return;
        }
        rows.drain(..offset);
        if let Some(limit) = self.limit {
            let limit = usize::try_from(limit).unwrap_or(usize::MAX);
            rows.truncate(limit);
        }
    }
}

/// The root entity occurrence of a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    /// Entity name in the catalog.
    pub entity: String,
    /// Alias used by field references.
    pub alias: String,
}

/// An inner join along a named relation.
///
/// Joining a one-to-many relation yields one row per related row, so the
/// joined-from rows are repeated. Results are not deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinSpec {
    /// Alias the relation is navigated from.
    pub from_alias: String,
    /// Relation name on the joined-from entity.
    pub relation: String,
    /// Alias given to the joined entity.
    pub alias: String,
    /// Entity name of the joined alias.
    pub entity: String,
}

/// The shape of the rows a query returns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Projection {
    /// The whole entity bound to an alias.
    Entity { alias: String },
    /// A single field value.
    Field(FieldRef),
    /// Number of matching rows, as a single row.
    Count,
}

/// A validated, immutable description of a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDescription {
    /// What each result row contains.
    pub projection: Projection,
    /// Root entity occurrence.
    pub source: Source,
    /// Inner joins, applied in order.
    pub joins: Vec<JoinSpec>,
    /// Optional filter. `None` matches every row.
    pub filter: Option<Predicate>,
    /// Order directives, most significant first.
    pub order_by: Vec<OrderSpec>,
    /// Pagination bounds.
    pub pagination: Pagination,
}

impl QueryDescription {
    /// Aliases in scope: the root alias followed by each join alias.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.source.alias.as_str())
            .chain(self.joins.iter().map(|j| j.alias.as_str()))
    }

    /// Entity name bound to `alias`, if it is in scope.
    pub fn entity_of(&self, alias: &str) -> Option<&str> {
        if self.source.alias == alias {
            return Some(&self.source.entity);
        }
        self.joins
            .iter()
            .find(|j| j.alias == alias)
            .map(|j| j.entity.as_str())
    }

    /// Copy of this description with the limit tightened to at most `max`.
    pub fn capped(&self, max: u64) -> Self {
        Self {
            pagination: self.pagination.capped(max),
            ..self.clone()
        }
    }

    /// Copy of this description counting matches, without pagination or order.
    pub fn counting(&self) -> Self {
        Self {
            projection: Projection::Count,
            order_by: Vec::new(),
            pagination: Pagination::default(),
            ..self.clone()
        }
    }
}
