//! boardq - seed a store and run typed queries against it.

mod config;
mod seed;

use std::fmt::Debug;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use boardq_core::model::{self, BoardPath, UserPath};
use boardq_core::query::{Query, QueryError, Selection, TypedQuery};
use boardq_core::storage::StorageEngine;
use boardq_core::SchemaBundle;

use config::{Args, CliConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "boardq=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Args::parse().into_config();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        data_path = %config.storage.path.display(),
        temporary = config.storage.temporary,
        "starting boardq"
    );

    let schema = Arc::new(model::schema());
    let storage = StorageEngine::open(config.storage.clone(), schema.clone())?;
    tracing::info!(
        schema_version = schema.version,
        recovered = storage.was_recovered(),
        "store opened"
    );

    seed::seed(&storage, config.users, config.boards_per_user)?;
    run_queries(&storage, &schema, &config)?;

    storage.flush()?;
    Ok(())
}

fn run_queries(
    storage: &StorageEngine,
    schema: &SchemaBundle,
    config: &CliConfig,
) -> Result<(), QueryError> {
    let user = UserPath::default();
    let board = BoardPath::default();

    let user1 = Query::select_from(&user)
        .filter(user.name.eq("user1"))
        .build(schema)?;
    explain(config, "user named user1", &user1);
    println!("user named user1: {:?}", user1.fetch_one(storage)?);

    let ends_in_3 = Query::select_from(&user)
        .filter(user.name.starts_with("user").and(user.name.ends_with("3")))
        .build(schema)?;
    explain(config, "users like user%3", &ends_in_3);
    print_all("users like user%3", ends_in_3.fetch(storage)?);

    let count = Query::select(Selection::count()).from(&user).build(schema)?;
    explain(config, "user count", &count);
    println!("user count: {:?}", count.fetch_one(storage)?);

    let page = Query::select(user.name.field())
        .from(&user)
        .order_by(user.name.desc())
        .offset(2)
        .limit(2)
        .build(schema)?;
    explain(config, "names, descending, offset 2 limit 2", &page);
    println!(
        "names, descending, offset 2 limit 2: {:?} of {}",
        page.fetch(storage)?,
        page.fetch_count(storage)?
    );

    let last = Query::select(user.name.field())
        .from(&user)
        .order_by(user.name.asc().nulls_last())
        .build(schema)?;
    explain(config, "names, nulls last", &last);
    println!("names, nulls last: {:?}", last.fetch(storage)?);

    let boards = Query::select_from(&board)
        .join(&board.user, &user)
        .filter(user.name.eq("user1"))
        .order_by(board.title.asc())
        .build(schema)?;
    explain(config, "boards of user1", &boards);
    print_all("boards of user1", boards.fetch(storage)?);

    let first = Query::select_from(&board)
        .order_by(board.title.desc())
        .build(schema)?;
    explain(config, "last board by title", &first);
    println!("last board by title: {:?}", first.fetch_first(storage)?);

    // Unfiltered fetch_one over several users is refused.
    let everyone = Query::select_from(&user).build(schema)?;
    match everyone.fetch_one(storage) {
        Err(err @ QueryError::NonUniqueResult { .. }) => println!("any single user: {err}"),
        other => println!("any single user: {:?}", other?),
    }

    Ok(())
}

fn explain<T>(config: &CliConfig, label: &str, query: &TypedQuery<T>) {
    if !config.explain {
        return;
    }
    match serde_json::to_string_pretty(query.description()) {
        Ok(json) => println!("-- {label}\n{json}"),
        Err(err) => tracing::warn!(error = %err, "failed to render query description"),
    }
}

fn print_all<T: Debug>(label: &str, rows: Vec<T>) {
    println!("{label}: {} row(s)", rows.len());
    for row in rows {
        println!("  {row:?}");
    }
}
