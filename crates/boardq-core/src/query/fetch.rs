//! Result cardinality enforcement.
//!
//! Every fetch submits exactly one description to the engine and shapes the
//! rows it gets back. Engine failures and undecodable rows surface as
//! [`QueryError::Execution`].

use super::builder::TypedQuery;
use super::error::QueryError;
use super::executor::QueryEngine;
use crate::error::Error;
use boardq_proto::RowSet;

impl<T> TypedQuery<T> {
    /// All rows in query order. No rows is not an error.
    pub fn fetch<E: QueryEngine + ?Sized>(&self, engine: &E) -> Result<Vec<T>, QueryError> {
        let rows = engine.submit(&self.description)?;
        self.decode_all(rows)
    }

    /// The first row, if any.
    ///
    /// The limit is tightened to one on top of the query's own offset and
    /// limit, so at most one row is read.
    pub fn fetch_first<E: QueryEngine + ?Sized>(
        &self,
        engine: &E,
    ) -> Result<Option<T>, QueryError> {
        let rows = engine.submit(&self.description.capped(1))?;
        Ok(self.decode_all(rows)?.into_iter().next())
    }

    /// The only row, if any.
    ///
    /// Fails with [`QueryError::NonUniqueResult`] when the query, after its
    /// own pagination, returns more than one row.
    pub fn fetch_one<E: QueryEngine + ?Sized>(&self, engine: &E) -> Result<Option<T>, QueryError> {
        let rows = engine.submit(&self.description)?;
        if rows.len() > 1 {
            return Err(QueryError::NonUniqueResult { count: rows.len() });
        }
        Ok(self.decode_all(rows)?.into_iter().next())
    }

    /// Number of matching rows, ignoring pagination.
    pub fn fetch_count<E: QueryEngine + ?Sized>(&self, engine: &E) -> Result<u64, QueryError> {
        Ok(engine.submit(&self.description.counting())?.total)
    }

    fn decode_all(&self, rows: RowSet) -> Result<Vec<T>, QueryError> {
        rows.rows
            .into_iter()
            .map(|row| (self.decode)(row).map_err(|e| QueryError::Execution(Error::Protocol(e))))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{self, User, UserPath};
    use crate::query::{Query, Selection};
    use boardq_proto::{EntityRow, ProjectedRow, QueryDescription, Value};
    use std::cell::RefCell;

    /// Replays canned rows and records what it was asked.
    struct Recording {
        rows: Vec<ProjectedRow>,
        seen: RefCell<Vec<QueryDescription>>,
    }

    impl Recording {
        fn users(names: &[&str]) -> Self {
            let rows = names
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    ProjectedRow::Entity(EntityRow::new(
                        i as i64 + 1,
                        vec![("name".to_string(), Value::from(*name))],
                    ))
                })
                .collect();
            Self {
                rows,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl QueryEngine for Recording {
        fn submit(&self, query: &QueryDescription) -> Result<RowSet, Error> {
            self.seen.borrow_mut().push(query.clone());
            let total = self.rows.len() as u64;
            let mut rows = self.rows.clone();
            query.pagination.apply(&mut rows);
            Ok(RowSet::new(rows, total))
        }
    }

    struct Failing;

    impl QueryEngine for Failing {
        fn submit(&self, _query: &QueryDescription) -> Result<RowSet, Error> {
            Err(Error::InvalidData("disk on fire".into()))
        }
    }

    fn all_users() -> TypedQuery<User> {
        let user = UserPath::default();
        Query::select_from(&user).build(&model::schema()).unwrap()
    }

    #[test]
    fn test_fetch_first_caps_limit() {
        let engine = Recording::users(&["user0", "user1"]);
        let first = all_users().fetch_first(&engine).unwrap();

        assert_eq!(first.and_then(|u| u.name().map(String::from)), Some("user0".into()));
        let seen = engine.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].pagination.limit, Some(1));
    }

    #[test]
    fn test_fetch_one_cardinality() {
        let none = Recording::users(&[]);
        assert!(all_users().fetch_one(&none).unwrap().is_none());

        let single = Recording::users(&["user0"]);
        assert!(all_users().fetch_one(&single).unwrap().is_some());

        let many = Recording::users(&["user0", "user1", "user2"]);
        assert!(matches!(
            all_users().fetch_one(&many),
            Err(QueryError::NonUniqueResult { count: 3 })
        ));
    }

    #[test]
    fn test_fetch_count_drops_pagination() {
        let engine = Recording::users(&["user0", "user1", "user2"]);
        let user = UserPath::default();
        let query = Query::select_from(&user)
            .order_by(user.name.asc())
            .offset(1)
            .limit(1)
            .build(&model::schema())
            .unwrap();

        assert_eq!(query.fetch_count(&engine).unwrap(), 3);
        let seen = engine.seen.borrow();
        assert!(seen[0].pagination.is_unbounded());
        assert!(seen[0].order_by.is_empty());
    }

    #[test]
    fn test_engine_failure_is_execution_error() {
        assert!(matches!(
            all_users().fetch(&Failing),
            Err(QueryError::Execution(Error::InvalidData(_)))
        ));
    }

    #[test]
    fn test_decode_failure_is_execution_error() {
        let engine = Recording::users(&["user0"]);
        let user = UserPath::default();
        let count = Query::select(Selection::count())
            .from(&user)
            .build(&model::schema())
            .unwrap();

        // The canned engine answers with entity rows, which a count cannot decode.
        assert!(matches!(
            count.fetch(&engine),
            Err(QueryError::Execution(Error::Protocol(_)))
        ));
    }
}
