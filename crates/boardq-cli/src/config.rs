//! CLI configuration.

use boardq_core::storage::StorageConfig;
use clap::Parser;
use std::path::PathBuf;

/// Default data directory.
pub const DEFAULT_DATA_PATH: &str = "./boardq_data";

/// Default number of seeded users.
pub const DEFAULT_USERS: usize = 5;

/// Default number of boards seeded per user.
pub const DEFAULT_BOARDS_PER_USER: usize = 2;

/// Resolved run configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Storage engine configuration.
    pub storage: StorageConfig,

    /// Users to seed into an empty store.
    pub users: usize,

    /// Boards to seed per user.
    pub boards_per_user: usize,

    /// Print each query description as JSON before running it.
    pub explain: bool,
}

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "boardq")]
#[command(
    version,
    about = "Seed a boardq store and run typed queries against it",
    long_about = None
)]
pub struct Args {
    /// Path to the database storage directory.
    #[arg(short, long, default_value = DEFAULT_DATA_PATH)]
    pub data_path: PathBuf,

    /// Use a temporary store that is removed on exit.
    #[arg(long, conflicts_with = "data_path")]
    pub temporary: bool,

    /// Page cache size in megabytes.
    #[arg(long, default_value_t = 64)]
    pub cache_mb: u64,

    /// Flush interval in milliseconds. Set to 0 to flush only on exit.
    #[arg(long, default_value_t = 1000)]
    pub flush_every_ms: u64,

    /// Compress stored pages.
    #[arg(long)]
    pub compression: bool,

    /// Number of users to seed.
    #[arg(long, default_value_t = DEFAULT_USERS)]
    pub users: usize,

    /// Number of boards to seed per user.
    #[arg(long, default_value_t = DEFAULT_BOARDS_PER_USER)]
    pub boards_per_user: usize,

    /// Print query descriptions as JSON.
    #[arg(long)]
    pub explain: bool,
}

impl Args {
    /// Convert command-line arguments to a run configuration.
    pub fn into_config(self) -> CliConfig {
        let storage = if self.temporary {
            StorageConfig::temporary()
        } else {
            StorageConfig::new(self.data_path)
        };

        let flush_every_ms = if self.flush_every_ms == 0 {
            None
        } else {
            Some(self.flush_every_ms)
        };

        CliConfig {
            storage: storage
                .with_cache_capacity(self.cache_mb * 1024 * 1024)
                .with_flush_every_ms(flush_every_ms)
                .with_compression(self.compression),
            users: self.users,
            boards_per_user: self.boards_per_user,
            explain: self.explain,
        }
    }
}
