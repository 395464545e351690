//! Result ordering.

use super::join::JoinedRow;
use crate::error::Error;
use boardq_proto::{NullOrdering, OrderDirection, OrderKey, OrderSpec, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Related-row counts backing [`OrderKey::RelationSize`] keys.
///
/// For each `(alias, relation)` pair the executor records how many related
/// rows reference each owner key, and which field of the aliased row holds
/// that key. Owners nothing references have size zero.
#[derive(Debug, Clone, Default)]
pub struct RelationSizes {
    sizes: HashMap<(String, String), RelationCount>,
}

#[derive(Debug, Clone)]
struct RelationCount {
    key_field: String,
    counts: HashMap<i64, i64>,
}

impl RelationSizes {
    /// Create an empty set of counts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the counts of `alias.relation`, keyed by the value of
    /// `key_field` on the aliased row.
    pub fn insert(
        &mut self,
        alias: impl Into<String>,
        relation: impl Into<String>,
        key_field: impl Into<String>,
        counts: HashMap<i64, i64>,
    ) {
        self.sizes.insert(
            (alias.into(), relation.into()),
            RelationCount {
                key_field: key_field.into(),
                counts,
            },
        );
    }

    /// Size of `alias.relation` for one joined row.
    fn size_of(&self, row: &JoinedRow, alias: &str, relation: &str) -> Result<Value, Error> {
        let key = (alias.to_string(), relation.to_string());
        let count = self.sizes.get(&key).ok_or_else(|| {
            Error::InvalidData(format!("no sizes recorded for {alias}.{relation}"))
        })?;
        let owner = row
            .get(alias)
            .ok_or_else(|| Error::InvalidData(format!("alias '{alias}' is not in scope")))?;

        let size = owner
            .get(&count.key_field)
            .and_then(Value::as_i64)
            .and_then(|key| count.counts.get(&key).copied())
            .unwrap_or(0);
        Ok(Value::Int64(size))
    }
}

/// Sort rows by the given directives, most significant first.
///
/// With at least one directive, remaining ties fall back to the root
/// identity ascending, so the result is fully determined. With none, the
/// input order is kept.
pub fn sort_rows(
    rows: Vec<JoinedRow>,
    order_by: &[OrderSpec],
    sizes: &RelationSizes,
) -> Result<Vec<JoinedRow>, Error> {
    if order_by.is_empty() {
        return Ok(rows);
    }

    let mut keyed = Vec::with_capacity(rows.len());
    for row in rows {
        let mut key = Vec::with_capacity(order_by.len());
        for spec in order_by {
            let value = match &spec.key {
                OrderKey::Field(field) => row
                    .value(field)
                    .cloned()
                    .ok_or_else(|| Error::UnknownField {
                        entity: field.alias.clone(),
                        field: field.field.clone(),
                    })?,
                OrderKey::RelationSize { alias, relation } => sizes.size_of(&row, alias, relation)?,
            };
            key.push(value);
        }
        keyed.push((key, row));
    }

    keyed.sort_by(|(a, row_a), (b, row_b)| {
        order_by
            .iter()
            .zip(a.iter().zip(b.iter()))
            .map(|(spec, (a, b))| compare(a, b, spec))
            .find(|ord| ord.is_ne())
            .unwrap_or_else(|| row_a.root().id.cmp(&row_b.root().id))
    });

    Ok(keyed.into_iter().map(|(_, row)| row).collect())
}

/// Compare two values under one directive.
fn compare(a: &Value, b: &Value, spec: &OrderSpec) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => null_placement(spec),
        (false, true) => null_placement(spec).reverse(),
        (false, false) => {
            let ord = a.compare(b).unwrap_or(Ordering::Equal);
            match spec.direction {
                OrderDirection::Asc => ord,
                OrderDirection::Desc => ord.reverse(),
            }
        }
    }
}

/// Where a null goes relative to a non-null value.
fn null_placement(spec: &OrderSpec) -> Ordering {
    match (spec.nulls, spec.direction) {
        (NullOrdering::First, _) => Ordering::Less,
        (NullOrdering::Last, _) => Ordering::Greater,
        (NullOrdering::Default, OrderDirection::Asc) => Ordering::Less,
        (NullOrdering::Default, OrderDirection::Desc) => Ordering::Greater,
    }
}
