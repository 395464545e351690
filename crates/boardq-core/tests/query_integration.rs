//! Integration tests for typed queries against the sled storage engine.

use boardq_core::model::{self, Board, BoardPath, Comment, CommentPath, User, UserPath};
use boardq_core::query::{Query, QueryError, Selection, ValidationError};
use boardq_core::storage::{StorageConfig, StorageEngine};
use boardq_core::{Error, SchemaBundle};
use std::sync::Arc;

struct TestContext {
    storage: StorageEngine,
    schema: Arc<SchemaBundle>,
    users: Vec<User>,
    boards: Vec<Board>,
    _storage_dir: tempfile::TempDir,
}

impl TestContext {
    fn new() -> Self {
        let storage_dir = tempfile::tempdir().unwrap();
        let schema = Arc::new(model::schema());
        let storage =
            StorageEngine::open(StorageConfig::new(storage_dir.path()), schema.clone()).unwrap();

        Self {
            storage,
            schema,
            users: Vec::new(),
            boards: Vec::new(),
            _storage_dir: storage_dir,
        }
    }

    /// Five users `user0..user4`, two boards each, one comment on each
    /// user's first board.
    fn seeded() -> Self {
        let mut ctx = Self::new();
        for i in 0..5 {
            let user = ctx.storage.persist(User::new(format!("user{i}"))).unwrap();
            for j in 0..2 {
                let board = ctx
                    .storage
                    .persist(Board::new(format!("title{i}{j}"), format!("content{i}{j}"), &user))
                    .unwrap();
                if j == 0 {
                    ctx.storage
                        .persist(Comment::new(format!("comment{i}"), &user, &board))
                        .unwrap();
                }
                ctx.boards.push(board);
            }
            ctx.users.push(user);
        }
        ctx
    }
}

fn names(users: &[User]) -> Vec<Option<&str>> {
    users.iter().map(|u| u.name()).collect()
}

#[test]
fn test_fetch_one_by_name() {
    let ctx = TestContext::seeded();
    let user = UserPath::default();

    let query = Query::select_from(&user)
        .filter(user.name.eq("user1"))
        .build(&ctx.schema)
        .unwrap();
    let found = query.fetch_one(&ctx.storage).unwrap().unwrap();

    assert_eq!(found, ctx.users[1]);
    assert_eq!(found.name(), Some("user1"));
}

#[test]
fn test_prefix_and_suffix() {
    let ctx = TestContext::seeded();
    let user = UserPath::default();

    let query = Query::select_from(&user)
        .filter(user.name.starts_with("user").and(user.name.ends_with("3")))
        .build(&ctx.schema)
        .unwrap();
    let users = query.fetch(&ctx.storage).unwrap();

    assert_eq!(names(&users), vec![Some("user3")]);
}

#[test]
fn test_fetch_all_and_count() {
    let ctx = TestContext::seeded();
    let user = UserPath::default();

    let query = Query::select_from(&user).build(&ctx.schema).unwrap();
    assert_eq!(query.fetch(&ctx.storage).unwrap().len(), 5);
    assert_eq!(query.fetch_count(&ctx.storage).unwrap(), 5);

    let count = Query::select(Selection::count())
        .from(&user)
        .build(&ctx.schema)
        .unwrap();
    assert_eq!(count.fetch_one(&ctx.storage).unwrap(), Some(5));
}

#[test]
fn test_fetch_one_cardinality() {
    let ctx = TestContext::seeded();
    let user = UserPath::default();

    let missing = Query::select_from(&user)
        .filter(user.name.eq("notuser"))
        .build(&ctx.schema)
        .unwrap();
    assert_eq!(missing.fetch_one(&ctx.storage).unwrap(), None);

    let everyone = Query::select_from(&user).build(&ctx.schema).unwrap();
    assert!(matches!(
        everyone.fetch_one(&ctx.storage),
        Err(QueryError::NonUniqueResult { count: 5 })
    ));
}

#[test]
fn test_fetch_first() {
    let ctx = TestContext::seeded();
    let user = UserPath::default();

    let query = Query::select_from(&user)
        .order_by(user.name.desc())
        .build(&ctx.schema)
        .unwrap();
    let first = query.fetch_first(&ctx.storage).unwrap().unwrap();
    assert_eq!(first.name(), Some("user4"));

    let none = Query::select_from(&user)
        .filter(user.name.starts_with("admin"))
        .build(&ctx.schema)
        .unwrap();
    assert_eq!(none.fetch_first(&ctx.storage).unwrap(), None);
}

#[test]
fn test_paging_descending() {
    let ctx = TestContext::seeded();
    let user = UserPath::default();

    let query = Query::select_from(&user)
        .order_by(user.name.desc())
        .offset(2)
        .limit(2)
        .build(&ctx.schema)
        .unwrap();

    let page = query.fetch(&ctx.storage).unwrap();
    assert_eq!(names(&page), vec![Some("user2"), Some("user1")]);
    assert_eq!(query.fetch_count(&ctx.storage).unwrap(), 5);

    let past_end = Query::select_from(&user)
        .order_by(user.name.desc())
        .offset(10)
        .build(&ctx.schema)
        .unwrap();
    assert!(past_end.fetch(&ctx.storage).unwrap().is_empty());
    assert_eq!(past_end.fetch_first(&ctx.storage).unwrap(), None);
}

#[test]
fn test_null_ordering() {
    let ctx = TestContext::seeded();
    let anonymous = ctx.storage.persist(User::unnamed()).unwrap();
    let user = UserPath::default();

    let fetch = |spec| {
        Query::select_from(&user)
            .order_by(spec)
            .build(&ctx.schema)
            .unwrap()
            .fetch(&ctx.storage)
            .unwrap()
    };

    let asc_last = fetch(user.name.asc().nulls_last());
    assert_eq!(asc_last.last(), Some(&anonymous));
    assert_eq!(asc_last[0].name(), Some("user0"));

    let desc_last = fetch(user.name.desc().nulls_last());
    assert_eq!(desc_last.last(), Some(&anonymous));
    assert_eq!(desc_last[0].name(), Some("user4"));

    let asc_default = fetch(user.name.asc());
    assert_eq!(asc_default.first(), Some(&anonymous));

    let desc_first = fetch(user.name.desc().nulls_first());
    assert_eq!(desc_first.first(), Some(&anonymous));
}

#[test]
fn test_order_by_comment_count() {
    let ctx = TestContext::seeded();
    ctx.storage
        .persist(Comment::new("again", &ctx.users[3], &ctx.boards[6]))
        .unwrap();
    let board = BoardPath::default();

    let query = Query::select_from(&board)
        .order_by(board.comments.size().desc())
        .build(&ctx.schema)
        .unwrap();
    let boards = query.fetch(&ctx.storage).unwrap();
    let titles: Vec<&str> = boards.iter().map(|b| b.title()).collect();

    assert_eq!(titles[0], "title30");
    assert_eq!(&titles[1..5], ["title00", "title10", "title20", "title40"]);
    assert!(titles[5..].iter().all(|t| t.ends_with('1')));

    let fewest = Query::select_from(&board)
        .order_by(board.comments.size().asc())
        .order_by(board.title.desc())
        .build(&ctx.schema)
        .unwrap();
    assert_eq!(fewest.fetch_first(&ctx.storage).unwrap().unwrap().title(), "title41");

    let single_valued = Query::select_from(&board)
        .order_by(board.user.size().desc())
        .build(&ctx.schema);
    assert!(matches!(
        single_valued,
        Err(QueryError::Validation(ValidationError::NotOneToMany { relation, .. }))
            if relation == "user"
    ));
}

#[test]
fn test_join_board_to_user() {
    let ctx = TestContext::seeded();
    let board = BoardPath::default();
    let user = UserPath::default();

    let query = Query::select_from(&board)
        .join(&board.user, &user)
        .filter(user.name.eq("user1"))
        .order_by(board.title.asc())
        .build(&ctx.schema)
        .unwrap();
    let boards = query.fetch(&ctx.storage).unwrap();

    assert_eq!(boards.len(), 2);
    assert!(boards.iter().all(|b| b.user_id() == ctx.users[1].id()));
    let titles: Vec<&str> = boards.iter().map(|b| b.title()).collect();
    assert_eq!(titles, vec!["title10", "title11"]);
}

#[test]
fn test_one_to_many_join_repeats_root() {
    let ctx = TestContext::seeded();
    let user = UserPath::default();
    let board = BoardPath::default();

    let query = Query::select_from(&user)
        .join(&user.boards, &board)
        .filter(user.name.eq("user1"))
        .build(&ctx.schema)
        .unwrap();

    let users = query.fetch(&ctx.storage).unwrap();
    assert_eq!(users, vec![ctx.users[1].clone(), ctx.users[1].clone()]);
    assert!(matches!(
        query.fetch_one(&ctx.storage),
        Err(QueryError::NonUniqueResult { count: 2 })
    ));
}

#[test]
fn test_join_chain() {
    let ctx = TestContext::seeded();
    let comment = CommentPath::default();
    let board = BoardPath::default();
    let user = UserPath::default();

    let query = Query::select_from(&comment)
        .join(&comment.board, &board)
        .join(&board.user, &user)
        .filter(user.name.eq("user2"))
        .build(&ctx.schema)
        .unwrap();

    let comments = query.fetch(&ctx.storage).unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].content(), "comment2");
    assert_eq!(comments[0].board_id(), ctx.boards[4].id());
}

#[test]
fn test_field_projection() {
    let ctx = TestContext::seeded();
    ctx.storage.persist(User::unnamed()).unwrap();
    let user = UserPath::default();

    let query = Query::select(user.name.field())
        .from(&user)
        .order_by(user.name.asc().nulls_last())
        .build(&ctx.schema)
        .unwrap();

    let names = query.fetch(&ctx.storage).unwrap();
    assert_eq!(names.len(), 6);
    assert_eq!(names[0].as_deref(), Some("user0"));
    assert_eq!(names[5], None);

    let board = BoardPath::default();
    let owners = Query::select(user.id.field())
        .from(&board)
        .join(&board.user, &user)
        .filter(board.title.eq("title30"))
        .build(&ctx.schema)
        .unwrap();
    assert_eq!(owners.fetch_one(&ctx.storage).unwrap(), Some(ctx.users[3].id()));
}

#[test]
fn test_like_and_or() {
    let ctx = TestContext::seeded();
    let user = UserPath::default();

    let like = Query::select_from(&user)
        .filter(user.name.like("user_"))
        .build(&ctx.schema)
        .unwrap();
    assert_eq!(like.fetch_count(&ctx.storage).unwrap(), 5);

    let either = Query::select_from(&user)
        .filter(user.name.eq("user1").or(user.name.eq("user2")))
        .order_by(user.name.asc())
        .build(&ctx.schema)
        .unwrap();
    assert_eq!(
        names(&either.fetch(&ctx.storage).unwrap()),
        vec![Some("user1"), Some("user2")]
    );

    let negated = Query::select_from(&user)
        .filter(user.name.eq("user1").not())
        .build(&ctx.schema)
        .unwrap();
    assert_eq!(negated.fetch_count(&ctx.storage).unwrap(), 4);
}

#[test]
fn test_build_errors() {
    let ctx = TestContext::new();
    let user = UserPath::default();

    let negative = Query::select_from(&user).offset(-1).build(&ctx.schema);
    assert!(matches!(
        negative,
        Err(QueryError::Validation(ValidationError::NegativeOffset(-1)))
    ));

    let null_literal = Query::select_from(&user)
        .filter(user.name.eq(None::<String>))
        .build(&ctx.schema);
    assert!(matches!(
        null_literal,
        Err(QueryError::AmbiguousNullPredicate { .. })
    ));

    let board = BoardPath::default();
    let out_of_scope = Query::select_from(&user)
        .filter(board.title.eq("title00"))
        .build(&ctx.schema);
    assert!(matches!(
        out_of_scope,
        Err(QueryError::Validation(ValidationError::UnknownAlias(alias))) if alias == "board"
    ));
}

#[test]
fn test_empty_store() {
    let ctx = TestContext::new();
    let user = UserPath::default();

    let query = Query::select_from(&user).build(&ctx.schema).unwrap();
    assert!(query.fetch(&ctx.storage).unwrap().is_empty());
    assert_eq!(query.fetch_one(&ctx.storage).unwrap(), None);
    assert_eq!(query.fetch_count(&ctx.storage).unwrap(), 0);
}

#[test]
fn test_delete_board_removes_its_comments() {
    let ctx = TestContext::seeded();
    let comment = CommentPath::default();
    let comments = Query::select_from(&comment).build(&ctx.schema).unwrap();
    assert_eq!(comments.fetch_count(&ctx.storage).unwrap(), 5);

    let board_id = ctx.boards[0].id().unwrap();
    let outcome = ctx.storage.delete("Board", board_id).unwrap();
    assert_eq!(outcome.deleted_count(), 2);

    assert_eq!(comments.fetch_count(&ctx.storage).unwrap(), 4);
    let orphans = Query::select_from(&comment)
        .filter(comment.board_id.eq(board_id))
        .build(&ctx.schema)
        .unwrap();
    assert_eq!(orphans.fetch_one(&ctx.storage).unwrap(), None);
}

#[test]
fn test_delete_referenced_user_is_refused() {
    let ctx = TestContext::seeded();

    let result = ctx.storage.delete("User", ctx.users[0].id().unwrap());
    assert!(matches!(result, Err(Error::Constraint(_))));

    let loaded: Option<User> = ctx.storage.get(ctx.users[0].id().unwrap()).unwrap();
    assert_eq!(loaded.as_ref(), Some(&ctx.users[0]));
}

#[test]
fn test_data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let schema = Arc::new(model::schema());

    {
        let storage = StorageEngine::open(StorageConfig::new(dir.path()), schema.clone()).unwrap();
        storage.persist(User::new("user0")).unwrap();
        storage.flush().unwrap();
    }

    let storage = StorageEngine::open(StorageConfig::new(dir.path()), schema.clone()).unwrap();
    let user = UserPath::default();
    let query = Query::select_from(&user).build(&schema).unwrap();
    let users = query.fetch(&storage).unwrap();
    assert_eq!(names(&users), vec![Some("user0")]);
}
