//! Sample object graph.

use boardq_core::model::{Board, Comment, Entity, User};
use boardq_core::storage::StorageEngine;
use boardq_core::Error;
use tracing::info;

/// Counts of seeded entities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub boards: usize,
    pub comments: usize,
}

/// Seed `users` users named `user0..`, each with `boards_per_user` boards and
/// a comment on their first board.
///
/// A store that already holds users is left alone.
pub fn seed(
    storage: &StorageEngine,
    users: usize,
    boards_per_user: usize,
) -> Result<SeedSummary, Error> {
    let existing = storage.len(User::NAME)?;
    if existing > 0 {
        info!(users = existing, "store already seeded");
        return Ok(SeedSummary::default());
    }

    let mut summary = SeedSummary::default();
    for i in 0..users {
        let user = storage.persist(User::new(format!("user{i}")))?;
        summary.users += 1;

        for j in 0..boards_per_user {
            let board = storage.persist(Board::new(
                format!("title{i}{j}"),
                format!("content{i}{j}"),
                &user,
            ))?;
            summary.boards += 1;

            if j == 0 {
                storage.persist(Comment::new(format!("comment{i}"), &user, &board))?;
                summary.comments += 1;
            }
        }
    }

    // One user without a name, to show null ordering.
    storage.persist(User::unnamed())?;
    summary.users += 1;

    storage.flush()?;
    info!(
        users = summary.users,
        boards = summary.boards,
        comments = summary.comments,
        "seeded store"
    );
    Ok(summary)
}
