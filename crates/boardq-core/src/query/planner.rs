//! Query planner: validates a draft against the catalog and freezes it.
//!
//! The planner resolves every alias, relation and field a draft mentions
//! and checks operator and literal types. It reads the catalog only; the
//! storage engine is never touched.

use super::error::{QueryError, ValidationError};
use crate::catalog::{Cardinality, FieldDef, ScalarType, SchemaBundle};
use boardq_proto::{
    FieldRef, JoinSpec, OrderKey, OrderSpec, Pagination, Predicate, Projection, QueryDescription,
    Source, Value,
};
use std::collections::HashMap;

/// An unvalidated query as accumulated by a builder.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDraft {
    pub projection: Projection,
    pub source: Option<Source>,
    pub joins: Vec<JoinSpec>,
    pub filter: Option<Predicate>,
    pub order_by: Vec<OrderSpec>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

impl QueryDraft {
    /// Create an empty draft with the given projection.
    pub fn new(projection: Projection) -> Self {
        Self {
            projection,
            source: None,
            joins: Vec::new(),
            filter: None,
            order_by: Vec::new(),
            offset: None,
            limit: None,
        }
    }
}

/// Validates drafts against a schema.
pub struct QueryPlanner<'a> {
    schema: &'a SchemaBundle,
}

impl<'a> QueryPlanner<'a> {
    /// Create a planner over a schema.
    pub fn new(schema: &'a SchemaBundle) -> Self {
        Self { schema }
    }

    /// Validate a draft and produce its description.
    ///
    /// Checks run in a fixed order so the first problem reported is stable:
    /// pagination bounds, source, joins, projection, filter, ordering.
    pub fn plan(&self, mut draft: QueryDraft) -> Result<QueryDescription, QueryError> {
        let offset = match draft.offset {
            Some(offset) if offset < 0 => {
                return Err(ValidationError::NegativeOffset(offset).into());
            }
            Some(offset) => offset as u64,
            None => 0,
        };
        let limit = match draft.limit {
            Some(limit) if limit < 0 => {
                return Err(ValidationError::NegativeLimit(limit).into());
            }
            Some(limit) => Some(limit as u64),
            None => None,
        };

        let source = draft.source.take().ok_or(ValidationError::MissingSource)?;
        if self.schema.get_entity(&source.entity).is_none() {
            return Err(ValidationError::UnknownEntity(source.entity).into());
        }

        self.check_scope(&source, &draft)?;

        Ok(QueryDescription {
            projection: draft.projection,
            source,
            joins: draft.joins,
            filter: draft.filter,
            order_by: draft.order_by,
            pagination: Pagination::new(offset, limit),
        })
    }

    /// Check joins, projection, filter and ordering against the aliases the
    /// source and joins bring into scope.
    fn check_scope(&self, source: &Source, draft: &QueryDraft) -> Result<(), QueryError> {
        let mut scope: HashMap<&str, &str> = HashMap::new();
        scope.insert(&source.alias, &source.entity);

        for join in &draft.joins {
            let from_entity = *scope
                .get(join.from_alias.as_str())
                .ok_or_else(|| ValidationError::UnknownAlias(join.from_alias.clone()))?;
            let relation = self
                .schema
                .get_relation(from_entity, &join.relation)
                .ok_or_else(|| ValidationError::UnknownRelation {
                    entity: from_entity.to_string(),
                    relation: join.relation.clone(),
                })?;
            if relation.to_entity != join.entity {
                return Err(ValidationError::JoinTargetMismatch {
                    relation: join.relation.clone(),
                    expected: relation.to_entity.clone(),
                    found: join.entity.clone(),
                }
                .into());
            }
            if scope.insert(&join.alias, &join.entity).is_some() {
                return Err(ValidationError::DuplicateAlias(join.alias.clone()).into());
            }
        }

        match &draft.projection {
            Projection::Entity { alias } => {
                if !scope.contains_key(alias.as_str()) {
                    return Err(ValidationError::UnknownAlias(alias.clone()).into());
                }
            }
            Projection::Field(field) => {
                self.resolve(&scope, field)?;
            }
            Projection::Count => {}
        }

        if let Some(filter) = &draft.filter {
            self.check_predicate(&scope, filter)?;
        }

        for spec in &draft.order_by {
            match &spec.key {
                OrderKey::Field(field) => {
                    self.resolve(&scope, field)?;
                }
                OrderKey::RelationSize { alias, relation } => {
                    self.resolve_collection(&scope, alias, relation)?;
                }
            }
        }
        Ok(())
    }

    /// Check that `relation` is a one-to-many relation of the alias's entity.
    fn resolve_collection(
        &self,
        scope: &HashMap<&str, &str>,
        alias: &str,
        relation: &str,
    ) -> Result<(), ValidationError> {
        let entity = *scope
            .get(alias)
            .ok_or_else(|| ValidationError::UnknownAlias(alias.to_string()))?;
        let def = self.schema.get_relation(entity, relation).ok_or_else(|| {
            ValidationError::UnknownRelation {
                entity: entity.to_string(),
                relation: relation.to_string(),
            }
        })?;
        if def.cardinality != Cardinality::OneToMany {
            return Err(ValidationError::NotOneToMany {
                entity: entity.to_string(),
                relation: relation.to_string(),
            });
        }
        Ok(())
    }

    /// Resolve a field reference to its definition.
    fn resolve(
        &self,
        scope: &HashMap<&str, &str>,
        field: &FieldRef,
    ) -> Result<&'a FieldDef, ValidationError> {
        let entity = scope
            .get(field.alias.as_str())
            .ok_or_else(|| ValidationError::UnknownAlias(field.alias.clone()))?;
        self.schema
            .get_entity(entity)
            .and_then(|def| def.get_field(&field.field))
            .ok_or_else(|| ValidationError::UnknownField {
                alias: field.alias.clone(),
                entity: entity.to_string(),
                field: field.field.clone(),
            })
    }

    fn check_predicate(
        &self,
        scope: &HashMap<&str, &str>,
        predicate: &Predicate,
    ) -> Result<(), QueryError> {
        match predicate {
            Predicate::Eq { field, value } | Predicate::Ne { field, value } => {
                let def = self.resolve(scope, field)?;
                if value.is_null() {
                    return Err(QueryError::AmbiguousNullPredicate {
                        field: field.to_string(),
                    });
                }
                let scalar = def.field_type.scalar_type();
                if !scalar.accepts(value) {
                    return Err(mismatch(field, scalar, value).into());
                }
            }
            Predicate::StartsWith { field, .. }
            | Predicate::EndsWith { field, .. }
            | Predicate::Like { field, .. } => {
                let scalar = self.resolve(scope, field)?.field_type.scalar_type();
                if scalar != ScalarType::String {
                    return Err(ValidationError::TypeMismatch {
                        field: field.to_string(),
                        expected: ScalarType::String.to_string(),
                        found: scalar.to_string(),
                    }
                    .into());
                }
            }
            Predicate::IsNull { field } | Predicate::IsNotNull { field } => {
                self.resolve(scope, field)?;
            }
            Predicate::And(operands) | Predicate::Or(operands) => {
                for operand in operands {
                    self.check_predicate(scope, operand)?;
                }
            }
            Predicate::Not(inner) => self.check_predicate(scope, inner)?,
        }
        Ok(())
    }
}

fn mismatch(field: &FieldRef, expected: ScalarType, found: &Value) -> ValidationError {
    ValidationError::TypeMismatch {
        field: field.to_string(),
        expected: expected.to_string(),
        found: found.type_name().to_string(),
    }
}
