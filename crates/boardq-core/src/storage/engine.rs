//! Storage engine implementation.

use super::key::{decode_id, encode_id};
use super::{Record, StorageConfig};
use crate::catalog::{Cardinality, DeleteBehavior, EntityDef, SchemaBundle};
use crate::error::Error;
use crate::model::Entity;
use boardq_proto::{EntityRow, Value};
use parking_lot::Mutex;
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
    TransactionalTree,
};
use sled::{Db, Transactional, Tree};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Rows touched by a delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Removed rows as `(entity, id)`, the requested row last.
    pub deleted: Vec<(String, i64)>,
    /// Rows whose foreign key was set to null, as `(entity, id)`.
    pub nullified: Vec<(String, i64)>,
}

impl DeleteOutcome {
    /// Number of rows removed, cascades included.
    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }
}

/// A pending foreign key reset.
struct Nullify {
    entity: String,
    id: i64,
    field: String,
}

/// The main storage engine wrapping sled.
///
/// Each entity lives in its own tree, keyed by its big-endian id. The
/// schema decides which trees exist and which references are checked.
///
/// Writes are serialized and each one commits as a single transaction over
/// every entity tree, so a reference check and the row it guards, or a
/// delete and its cascade, are applied together. Reads take no lock.
pub struct StorageEngine {
    /// The underlying sled database.
    db: Db,

    /// Mapping configuration shared with the query layer.
    schema: Arc<SchemaBundle>,

    /// Open trees, in the order transactions see them.
    trees: Vec<Tree>,

    /// Position of each entity's tree in `trees`.
    slots: HashMap<String, usize>,

    /// Held from the first read a write depends on until it commits.
    write_lock: Mutex<()>,
}

impl StorageEngine {
    /// Open or create a storage engine with the given configuration.
    pub fn open(config: StorageConfig, schema: Arc<SchemaBundle>) -> Result<Self, Error> {
        schema.validate()?;

        let db = config.to_sled_config().open()?;
        let mut names: Vec<&String> = schema.entities.keys().collect();
        names.sort();

        let mut trees = Vec::with_capacity(names.len());
        let mut slots = HashMap::with_capacity(names.len());
        for name in names {
            let def = &schema.entities[name];
            slots.insert(name.clone(), trees.len());
            trees.push(db.open_tree(&def.tree)?);
        }

        debug!(
            entities = trees.len(),
            recovered = db.was_recovered(),
            "opened storage engine"
        );

        Ok(Self {
            db,
            schema,
            trees,
            slots,
            write_lock: Mutex::new(()),
        })
    }

    /// The mapping configuration this engine stores.
    pub fn schema(&self) -> &Arc<SchemaBundle> {
        &self.schema
    }

    /// Check if the database was recovered from a previous run.
    pub fn was_recovered(&self) -> bool {
        self.db.was_recovered()
    }

    fn entity_def(&self, entity: &str) -> Result<&EntityDef, Error> {
        self.schema
            .get_entity(entity)
            .ok_or_else(|| Error::UnknownEntity(entity.to_string()))
    }

    fn slot(&self, entity: &str) -> Result<usize, Error> {
        self.slots
            .get(entity)
            .copied()
            .ok_or_else(|| Error::UnknownEntity(entity.to_string()))
    }

    fn tree(&self, entity: &str) -> Result<&Tree, Error> {
        Ok(&self.trees[self.slot(entity)?])
    }

    /// Run `f` as one transaction over every entity tree.
    ///
    /// The closure sees the trees indexed by slot and may be retried, so it
    /// must not have side effects outside the transaction.
    fn transact<A, F>(&self, f: F) -> Result<A, Error>
    where
        F: Fn(&[TransactionalTree]) -> ConflictableTransactionResult<A, Error>,
    {
        let result = self.trees.as_slice().transaction(|txs| f(txs));

        match result {
            Ok(value) => Ok(value),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(Error::Storage(e)),
        }
    }

    /// Persist a transient entity and return it carrying its new identity.
    pub fn persist<E: Entity>(&self, entity: E) -> Result<E, Error> {
        if let Some(id) = entity.id() {
            return Err(Error::AlreadyPersisted {
                entity: E::NAME.to_string(),
                id,
            });
        }

        let row = self.insert_row(E::NAME, entity.to_fields())?;
        Ok(E::from_row(&row)?)
    }

    /// Insert a new row from raw field values and return its identity.
    ///
    /// Fields missing from `fields` are stored as null, which fails for
    /// required fields. Many-to-one references must point at existing rows.
    pub fn insert(&self, entity: &str, fields: Vec<(String, Value)>) -> Result<i64, Error> {
        Ok(self.insert_row(entity, fields)?.id)
    }

    /// Insert a new row and return it as stored, identity included.
    fn insert_row(&self, entity: &str, fields: Vec<(String, Value)>) -> Result<EntityRow, Error> {
        let def = self.entity_def(entity)?;

        for (name, _) in &fields {
            if name == &def.identity_field || def.get_field(name).is_none() {
                return Err(Error::UnknownField {
                    entity: entity.to_string(),
                    field: name.clone(),
                });
            }
        }

        let mut values = Vec::with_capacity(def.fields.len());
        for field in def.data_fields() {
            let value = fields
                .iter()
                .find(|(name, _)| name == &field.name)
                .map(|(_, v)| v.clone())
                .unwrap_or(Value::Null);

            if !field.field_type.accepts(&value) {
                if value.is_null() {
                    return Err(Error::Constraint(format!(
                        "{entity}.{} is required",
                        field.name
                    )));
                }
                return Err(Error::TypeMismatch {
                    field: format!("{entity}.{}", field.name),
                    expected: field.field_type.scalar_type().to_string(),
                    found: value.type_name().to_string(),
                });
            }
            values.push((field.name.clone(), value));
        }

        let mut references = Vec::new();
        for relation in self.schema.relations_from(entity) {
            if relation.cardinality != Cardinality::ManyToOne {
                continue;
            }
            let target = values
                .iter()
                .find(|(name, _)| name == &relation.from_field)
                .and_then(|(_, v)| v.as_i64());
            if let Some(target) = target {
                references.push((relation, self.slot(&relation.to_entity)?, target));
            }
        }

        let slot = self.slot(entity)?;
        let bytes = Record::new(values.clone()).to_bytes()?;

        let _guard = self.write_lock.lock();
        let id = self.db.generate_id()? as i64 + 1;
        let key = encode_id(id);

        self.transact(|txs| {
            for (relation, target_slot, target) in &references {
                if txs[*target_slot].get(encode_id(*target))?.is_none() {
                    return Err(ConflictableTransactionError::Abort(Error::Constraint(
                        format!(
                            "{entity}.{} references missing {} {target}",
                            relation.name, relation.to_entity
                        ),
                    )));
                }
            }
            txs[slot].insert(&key[..], bytes.as_slice())?;
            Ok(())
        })?;

        debug!(entity, id, "persisted entity");

        let mut row = Vec::with_capacity(values.len() + 1);
        row.push((def.identity_field.clone(), Value::Int64(id)));
        row.extend(values);
        Ok(EntityRow::new(id, row))
    }

    /// Check if a row exists.
    pub fn contains(&self, entity: &str, id: i64) -> Result<bool, Error> {
        Ok(self.tree(entity)?.contains_key(encode_id(id))?)
    }

    /// Fetch a single row by identity.
    pub fn get_row(&self, entity: &str, id: i64) -> Result<Option<EntityRow>, Error> {
        let identity = &self.entity_def(entity)?.identity_field;
        match self.tree(entity)?.get(encode_id(id))? {
            Some(bytes) => Ok(Some(decode_row(identity, id, &bytes)?)),
            None => Ok(None),
        }
    }

    /// Fetch a typed entity by identity.
    pub fn get<E: Entity>(&self, id: i64) -> Result<Option<E>, Error> {
        match self.get_row(E::NAME, id)? {
            Some(row) => Ok(Some(E::from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Scan every row of an entity in ascending identity order.
    pub fn scan(
        &self,
        entity: &str,
    ) -> Result<impl Iterator<Item = Result<EntityRow, Error>>, Error> {
        let identity = self.entity_def(entity)?.identity_field.clone();
        let iter = self.tree(entity)?.iter();

        Ok(iter.map(move |item| {
            let (key, bytes) = item?;
            let id = decode_id(&key).ok_or(Error::InvalidKey)?;
            decode_row(&identity, id, &bytes)
        }))
    }

    /// Number of stored rows of an entity.
    pub fn len(&self, entity: &str) -> Result<usize, Error> {
        Ok(self.tree(entity)?.len())
    }

    /// Delete a row, applying the delete behavior of every relation that
    /// references it.
    ///
    /// The whole cascade is planned first and then applied as one
    /// transaction, so a refused or failed delete leaves the store
    /// untouched.
    pub fn delete(&self, entity: &str, id: i64) -> Result<DeleteOutcome, Error> {
        let _guard = self.write_lock.lock();

        if !self.contains(entity, id)? {
            return Err(Error::NotFound {
                entity: entity.to_string(),
                id,
            });
        }

        let mut deleted = Vec::new();
        let mut nullify = Vec::new();
        let mut visited = HashSet::new();
        self.plan_delete(entity, id, &mut deleted, &mut nullify, &mut visited)?;
        nullify.retain(|reset| !visited.contains(&(reset.entity.clone(), reset.id)));

        let mut resets = Vec::with_capacity(nullify.len());
        for reset in &nullify {
            resets.push((self.slot(&reset.entity)?, encode_id(reset.id), reset.field.as_str()));
        }
        let mut removals = Vec::with_capacity(deleted.len());
        for (entity, id) in &deleted {
            removals.push((self.slot(entity)?, encode_id(*id)));
        }

        self.transact(|txs| {
            for (slot, key, field) in &resets {
                set_null(&txs[*slot], key, field)?;
            }
            for (slot, key) in &removals {
                txs[*slot].remove(&key[..])?;
            }
            Ok(())
        })?;

        let outcome = DeleteOutcome {
            deleted,
            nullified: nullify.into_iter().map(|r| (r.entity, r.id)).collect(),
        };

        debug!(
            entity,
            id,
            deleted = outcome.deleted.len(),
            nullified = outcome.nullified.len(),
            "deleted entity"
        );
        Ok(outcome)
    }

    fn plan_delete(
        &self,
        entity: &str,
        id: i64,
        deleted: &mut Vec<(String, i64)>,
        nullify: &mut Vec<Nullify>,
        visited: &mut HashSet<(String, i64)>,
    ) -> Result<(), Error> {
        if !visited.insert((entity.to_string(), id)) {
            return Ok(());
        }

        for relation in self.schema.references_to(entity) {
            let referencing =
                self.referencing_ids(&relation.from_entity, &relation.from_field, id)?;
            if referencing.is_empty() {
                continue;
            }

            match relation.on_delete {
                DeleteBehavior::Restrict => {
                    warn!(
                        entity,
                        id,
                        referenced_by = %relation.from_entity,
                        count = referencing.len(),
                        "delete refused"
                    );
                    return Err(Error::Constraint(format!(
                        "cannot delete {entity} {id}: referenced by {} {} row(s) through '{}'",
                        referencing.len(),
                        relation.from_entity,
                        relation.name
                    )));
                }
                DeleteBehavior::Cascade => {
                    for child in referencing {
                        self.plan_delete(&relation.from_entity, child, deleted, nullify, visited)?;
                    }
                }
                DeleteBehavior::SetNull => {
                    let nullable = self
                        .entity_def(&relation.from_entity)?
                        .get_field(&relation.from_field)
                        .is_some_and(|f| f.field_type.is_nullable());
                    if !nullable {
                        return Err(Error::Constraint(format!(
                            "{}.{} is required and cannot be set to null",
                            relation.from_entity, relation.from_field
                        )));
                    }
                    nullify.extend(referencing.into_iter().map(|child| Nullify {
                        entity: relation.from_entity.clone(),
                        id: child,
                        field: relation.from_field.clone(),
                    }));
                }
            }
        }

        deleted.push((entity.to_string(), id));
        Ok(())
    }

    fn referencing_ids(&self, entity: &str, field: &str, target: i64) -> Result<Vec<i64>, Error> {
        let mut ids = Vec::new();
        for row in self.scan(entity)? {
            let row = row?;
            if row.get(field).and_then(Value::as_i64) == Some(target) {
                ids.push(row.id);
            }
        }
        Ok(ids)
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.db.flush()?;
        Ok(())
    }
}

/// Reset one field of a stored record to null inside a transaction.
fn set_null(
    tx: &TransactionalTree,
    key: &[u8],
    field: &str,
) -> ConflictableTransactionResult<(), Error> {
    let Some(bytes) = tx.get(key)? else {
        return Ok(());
    };

    let mut record = Record::from_bytes(&bytes).map_err(ConflictableTransactionError::Abort)?;
    for stored in record.fields.iter_mut().filter(|f| f.name == field) {
        stored.value = Value::Null;
    }
    let bytes = record.to_bytes().map_err(ConflictableTransactionError::Abort)?;
    tx.insert(key, bytes)?;
    Ok(())
}

fn decode_row(identity: &str, id: i64, bytes: &[u8]) -> Result<EntityRow, Error> {
    let record = Record::from_bytes(bytes)?;
    let mut fields = Vec::with_capacity(record.fields.len() + 1);
    fields.push((identity.to_string(), Value::Int64(id)));
    fields.extend(record.into_fields());
    Ok(EntityRow::new(id, fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldDef, FieldType, RelationDef, ScalarType};
    use crate::model::{self, Board, Comment, User};

    fn open_engine() -> (tempfile::TempDir, StorageEngine) {
        let dir = tempfile::tempdir().unwrap();
        let engine =
            StorageEngine::open(StorageConfig::new(dir.path()), Arc::new(model::schema())).unwrap();
        (dir, engine)
    }

    #[test]
    fn test_persist_assigns_identity() {
        let (_dir, engine) = open_engine();

        let user = engine.persist(User::new("user0")).unwrap();
        let id = user.id().unwrap();
        assert!(id > 0);

        let loaded: User = engine.get(id).unwrap().unwrap();
        assert_eq!(loaded, user);
        assert_eq!(loaded.name(), Some("user0"));

        let other = engine.persist(User::unnamed()).unwrap();
        assert_ne!(other.id(), user.id());
        assert_eq!(other.name(), None);
    }

    #[test]
    fn test_persist_twice_is_rejected() {
        let (_dir, engine) = open_engine();

        let user = engine.persist(User::new("user0")).unwrap();
        let result = engine.persist(user.clone());
        assert!(matches!(result, Err(Error::AlreadyPersisted { id, .. }) if Some(id) == user.id()));
        assert_eq!(engine.len("User").unwrap(), 1);
    }

    #[test]
    fn test_transient_reference_is_rejected() {
        let (_dir, engine) = open_engine();

        let result = engine.persist(Board::new("title", "content", &User::new("nobody")));
        assert!(matches!(result, Err(Error::Constraint(_))));
        assert_eq!(engine.len("Board").unwrap(), 0);
    }

    #[test]
    fn test_dangling_reference_is_rejected() {
        let (_dir, engine) = open_engine();

        let fields = vec![
            ("title".to_string(), Value::from("title")),
            ("content".to_string(), Value::from("content")),
            ("user_id".to_string(), Value::Int64(999)),
        ];
        assert!(matches!(engine.insert("Board", fields), Err(Error::Constraint(_))));
    }

    #[test]
    fn test_insert_validates_fields() {
        let (_dir, engine) = open_engine();

        let unknown = vec![("nickname".to_string(), Value::from("x"))];
        assert!(matches!(
            engine.insert("User", unknown),
            Err(Error::UnknownField { field, .. }) if field == "nickname"
        ));

        let mistyped = vec![("name".to_string(), Value::Int64(1))];
        assert!(matches!(engine.insert("User", mistyped), Err(Error::TypeMismatch { .. })));

        assert!(matches!(
            engine.insert("Tag", Vec::new()),
            Err(Error::UnknownEntity(e)) if e == "Tag"
        ));
    }

    #[test]
    fn test_scan_returns_identity_order() {
        let (_dir, engine) = open_engine();

        let ids: Vec<i64> = (0..4)
            .map(|i| engine.persist(User::new(format!("user{i}"))).unwrap().id().unwrap())
            .collect();

        let scanned: Vec<i64> = engine
            .scan("User")
            .unwrap()
            .map(|row| row.unwrap().id)
            .collect();
        assert_eq!(scanned, ids);
    }

    #[test]
    fn test_delete_board_removes_comments() {
        let (_dir, engine) = open_engine();

        let user = engine.persist(User::new("user0")).unwrap();
        let board = engine.persist(Board::new("title", "content", &user)).unwrap();
        let keep = engine.persist(Board::new("other", "content", &user)).unwrap();
        engine.persist(Comment::new("first", &user, &board)).unwrap();
        engine.persist(Comment::new("second", &user, &board)).unwrap();
        engine.persist(Comment::new("kept", &user, &keep)).unwrap();

        let outcome = engine.delete("Board", board.id().unwrap()).unwrap();
        assert_eq!(outcome.deleted_count(), 3);
        assert_eq!(outcome.deleted.last(), Some(&("Board".to_string(), board.id().unwrap())));
        assert_eq!(engine.len("Comment").unwrap(), 1);
        assert!(engine.get::<Board>(board.id().unwrap()).unwrap().is_none());
    }

    #[test]
    fn test_delete_referenced_user_is_refused() {
        let (_dir, engine) = open_engine();

        let user = engine.persist(User::new("user0")).unwrap();
        engine.persist(Board::new("title", "content", &user)).unwrap();

        let result = engine.delete("User", user.id().unwrap());
        assert!(matches!(result, Err(Error::Constraint(_))));
        assert_eq!(engine.len("User").unwrap(), 1);
        assert_eq!(engine.len("Board").unwrap(), 1);
    }

    #[test]
    fn test_delete_missing_row() {
        let (_dir, engine) = open_engine();
        assert!(matches!(engine.delete("User", 42), Err(Error::NotFound { id: 42, .. })));
    }

    #[test]
    fn test_concurrent_persist_and_delete_leave_no_orphans() {
        let (_dir, engine) = open_engine();

        let user = engine.persist(User::new("user0")).unwrap();
        for round in 0..20 {
            let board = engine
                .persist(Board::new(format!("title{round}"), "content", &user))
                .unwrap();
            for i in 0..5 {
                engine.persist(Comment::new(format!("c{i}"), &user, &board)).unwrap();
            }
            let board_id = board.id().unwrap();

            std::thread::scope(|scope| {
                let writer = scope.spawn(|| {
                    for _ in 0..20 {
                        match engine.persist(Comment::new("late", &user, &board)) {
                            Ok(_) | Err(Error::Constraint(_)) => {}
                            Err(other) => panic!("unexpected error: {other}"),
                        }
                    }
                });
                engine.delete("Board", board_id).unwrap();
                writer.join().unwrap();
            });

            let orphans = engine
                .scan("Comment")
                .unwrap()
                .map(|row| row.unwrap())
                .filter(|row| row.get("board_id") == Some(&Value::Int64(board_id)))
                .count();
            assert_eq!(orphans, 0, "round {round}");
        }
    }

    #[test]
    fn test_set_null_on_delete() {
        let dir = tempfile::tempdir().unwrap();
        let schema = SchemaBundle::new(1)
            .with_entity(
                EntityDef::new("Team")
                    .with_field(FieldDef::new("name", FieldType::scalar(ScalarType::String))),
            )
            .with_entity(
                EntityDef::new("Member")
                    .with_field(FieldDef::new("team_id", FieldType::optional(ScalarType::Int64))),
            )
            .with_relation(
                RelationDef::many_to_one("team", "Member", "team_id", "Team")
                    .with_on_delete(DeleteBehavior::SetNull),
            );
        let engine = StorageEngine::open(StorageConfig::new(dir.path()), Arc::new(schema)).unwrap();

        let team = engine
            .insert("Team", vec![("name".to_string(), Value::from("core"))])
            .unwrap();
        let member = engine
            .insert("Member", vec![("team_id".to_string(), Value::Int64(team))])
            .unwrap();

        let outcome = engine.delete("Team", team).unwrap();
        assert_eq!(outcome.nullified, vec![("Member".to_string(), member)]);

        let row = engine.get_row("Member", member).unwrap().unwrap();
        assert_eq!(row.get("team_id"), Some(&Value::Null));
    }
}
