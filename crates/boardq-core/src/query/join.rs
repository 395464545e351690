//! Join execution.
//!
//! Joins are inner hash joins: the joined entity is indexed by its join
//! field, then every current row probes that index. Rows with no partner are
//! dropped, rows with several partners are repeated once per partner.

use crate::catalog::RelationDef;
use boardq_proto::{EntityRow, FieldRef, JoinSpec, Value};
use std::collections::HashMap;

/// One result row in flight: an entity per alias in scope, root first.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    slots: Vec<(String, EntityRow)>,
}

impl JoinedRow {
    /// Start a row from a root entity.
    pub fn new(alias: impl Into<String>, row: EntityRow) -> Self {
        Self {
            slots: vec![(alias.into(), row)],
        }
    }

    /// The root entity.
    pub fn root(&self) -> &EntityRow {
        &self.slots[0].1
    }

    /// Entity bound to `alias`.
    pub fn get(&self, alias: &str) -> Option<&EntityRow> {
        self.slots.iter().find(|(a, _)| a == alias).map(|(_, r)| r)
    }

    /// Value of an aliased field.
    pub fn value(&self, field: &FieldRef) -> Option<&Value> {
        self.get(&field.alias)?.get(&field.field)
    }

    /// Extend the row with a joined entity.
    pub fn with(mut self, alias: impl Into<String>, row: EntityRow) -> Self {
        self.slots.push((alias.into(), row));
        self
    }

    /// Take the entity bound to `alias`.
    pub fn into_entity(self, alias: &str) -> Option<EntityRow> {
        self.slots.into_iter().find(|(a, _)| a == alias).map(|(_, r)| r)
    }
}

/// Hash join over entity rows.
pub struct HashJoinExecutor;

impl HashJoinExecutor {
    /// Join `rows` with `related` along `relation`.
    ///
    /// Rows whose join value is null or has no partner are dropped.
    pub fn execute(
        rows: Vec<JoinedRow>,
        join: &JoinSpec,
        relation: &RelationDef,
        related: Vec<EntityRow>,
    ) -> Vec<JoinedRow> {
        // Build phase: index related rows by their side of the join.
        let mut index: HashMap<i64, Vec<EntityRow>> = HashMap::new();
        for row in related {
            if let Some(key) = row.get(&relation.to_field).and_then(Value::as_i64) {
                index.entry(key).or_default().push(row);
            }
        }

        // Probe phase.
        let mut joined = Vec::with_capacity(rows.len());
        for row in rows {
            let key = row
                .get(&join.from_alias)
                .and_then(|r| r.get(&relation.from_field))
                .and_then(Value::as_i64);
            let Some(partners) = key.and_then(|k| index.get(&k)) else {
                continue;
            };
            for partner in partners {
                joined.push(row.clone().with(join.alias.clone(), partner.clone()));
            }
        }
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, name: &str) -> EntityRow {
        EntityRow::new(
            id,
            vec![
                ("id".to_string(), Value::Int64(id)),
                ("name".to_string(), Value::from(name)),
            ],
        )
    }

    fn board(id: i64, user_id: i64) -> EntityRow {
        EntityRow::new(
            id,
            vec![
                ("id".to_string(), Value::Int64(id)),
                ("user_id".to_string(), Value::Int64(user_id)),
            ],
        )
    }

    fn spec(from: &str, relation: &str, alias: &str, entity: &str) -> JoinSpec {
        JoinSpec {
            from_alias: from.into(),
            relation: relation.into(),
            alias: alias.into(),
            entity: entity.into(),
        }
    }

    #[test]
    fn test_many_to_one_join() {
        let boards = vec![
            JoinedRow::new("board", board(10, 1)),
            JoinedRow::new("board", board(11, 2)),
            JoinedRow::new("board", board(12, 9)),
        ];
        let relation = RelationDef::many_to_one("user", "Board", "user_id", "User");

        let joined = HashJoinExecutor::execute(
            boards,
            &spec("board", "user", "user", "User"),
            &relation,
            vec![user(1, "user0"), user(2, "user1")],
        );

        // Board 12 has no user and is dropped.
        assert_eq!(joined.len(), 2);
        let name = FieldRef::new("user", "name");
        assert_eq!(joined[1].value(&name), Some(&Value::from("user1")));
        assert_eq!(joined[1].root().id, 11);
    }

    #[test]
    fn test_one_to_many_join_repeats_root() {
        let users = vec![JoinedRow::new("user", user(1, "user0"))];
        let relation = RelationDef::one_to_many("boards", "User", "Board", "user_id");

        let joined = HashJoinExecutor::execute(
            users,
            &spec("user", "boards", "board", "Board"),
            &relation,
            vec![board(10, 1), board(11, 1), board(12, 2)],
        );

        assert_eq!(joined.len(), 2);
        assert!(joined.iter().all(|row| row.root().id == 1));
        let ids: Vec<i64> = joined.iter().map(|r| r.get("board").unwrap().id).collect();
        assert_eq!(ids, vec![10, 11]);
    }

    #[test]
    fn test_into_entity() {
        let row = JoinedRow::new("board", board(10, 1)).with("user", user(1, "user0"));
        assert_eq!(row.clone().into_entity("user").map(|r| r.id), Some(1));
        assert!(row.into_entity("comment").is_none());
    }
}
