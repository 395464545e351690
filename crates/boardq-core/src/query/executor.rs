//! Query executor.
//!
//! Runs a frozen [`QueryDescription`] against the storage engine: scan the
//! root entity, hash-join each related entity, filter, count, sort,
//! paginate, then project.

use super::filter::FilterEvaluator;
use super::join::{HashJoinExecutor, JoinedRow};
use super::sort::{sort_rows, RelationSizes};
use crate::error::Error;
use crate::storage::StorageEngine;
use boardq_proto::{OrderKey, ProjectedRow, Projection, QueryDescription, RowSet, Value};
use std::collections::HashMap;
use tracing::debug;

/// Anything that can answer a query description.
pub trait QueryEngine {
    /// Run `query` once and return its rows and total match count.
    fn submit(&self, query: &QueryDescription) -> Result<RowSet, Error>;
}

/// Executes queries against a storage engine.
pub struct QueryExecutor<'a> {
    storage: &'a StorageEngine,
}

impl<'a> QueryExecutor<'a> {
    /// Create a new query executor.
    pub fn new(storage: &'a StorageEngine) -> Self {
        Self { storage }
    }

    /// Execute a query description.
    pub fn execute(&self, query: &QueryDescription) -> Result<RowSet, Error> {
        let schema = self.storage.schema();

        let mut rows = self
            .storage
            .scan(&query.source.entity)?
            .map(|row| row.map(|row| JoinedRow::new(query.source.alias.as_str(), row)))
            .collect::<Result<Vec<_>, Error>>()?;

        for join in &query.joins {
            let from_entity = query.entity_of(&join.from_alias).ok_or_else(|| {
                Error::InvalidData(format!("alias '{}' is not in scope", join.from_alias))
            })?;
            let relation = schema.get_relation(from_entity, &join.relation).ok_or_else(|| {
                Error::InvalidData(format!("{from_entity} has no relation '{}'", join.relation))
            })?;
            let related = self
                .storage
                .scan(&relation.to_entity)?
                .collect::<Result<Vec<_>, Error>>()?;
            rows = HashJoinExecutor::execute(rows, join, relation, related);
        }

        if let Some(filter) = &query.filter {
            let mut matched = Vec::with_capacity(rows.len());
            for row in rows {
                if FilterEvaluator::evaluate(filter, &row)? {
                    matched.push(row);
                }
            }
            rows = matched;
        }

        let total = rows.len() as u64;

        if query.projection == Projection::Count {
            debug!(
                entity = %query.source.entity,
                joins = query.joins.len(),
                matched = total,
                "count query executed"
            );
            return Ok(RowSet::new(
                vec![ProjectedRow::Value(Value::Int64(total as i64))],
                total,
            ));
        }

        let sizes = self.relation_sizes(query)?;
        let mut rows = sort_rows(rows, &query.order_by, &sizes)?;
        query.pagination.apply(&mut rows);

        let projected = rows
            .into_iter()
            .map(|row| project(&query.projection, row))
            .collect::<Result<Vec<_>, Error>>()?;

        debug!(
            entity = %query.source.entity,
            joins = query.joins.len(),
            matched = total,
            returned = projected.len(),
            "query executed"
        );

        Ok(RowSet::new(projected, total))
    }

    /// Count related rows for every relation size the ordering uses.
    fn relation_sizes(&self, query: &QueryDescription) -> Result<RelationSizes, Error> {
        let mut sizes = RelationSizes::new();
        for spec in &query.order_by {
            let OrderKey::RelationSize { alias, relation } = &spec.key else {
                continue;
            };
            let entity = query
                .entity_of(alias)
                .ok_or_else(|| Error::InvalidData(format!("alias '{alias}' is not in scope")))?;
            let def = self
                .storage
                .schema()
                .get_relation(entity, relation)
                .ok_or_else(|| {
                    Error::InvalidData(format!("{entity} has no relation '{relation}'"))
                })?;

            let mut counts = HashMap::new();
            for row in self.storage.scan(&def.to_entity)? {
                if let Some(key) = row?.get(&def.to_field).and_then(Value::as_i64) {
                    *counts.entry(key).or_insert(0) += 1;
                }
            }
            sizes.insert(alias.as_str(), relation.as_str(), def.from_field.as_str(), counts);
        }
        Ok(sizes)
    }
}

fn project(projection: &Projection, row: JoinedRow) -> Result<ProjectedRow, Error> {
    match projection {
        Projection::Entity { alias } => row
            .into_entity(alias)
            .map(ProjectedRow::Entity)
            .ok_or_else(|| Error::InvalidData(format!("alias '{alias}' is not in scope"))),
        Projection::Field(field) => row
            .value(field)
            .cloned()
            .map(ProjectedRow::Value)
            .ok_or_else(|| Error::UnknownField {
                entity: field.alias.clone(),
                field: field.field.clone(),
            }),
        Projection::Count => Err(Error::InvalidData(
            "count projection has no per-row value".to_string(),
        )),
    }
}

impl QueryEngine for StorageEngine {
    fn submit(&self, query: &QueryDescription) -> Result<RowSet, Error> {
        QueryExecutor::new(self).execute(query)
    }
}
