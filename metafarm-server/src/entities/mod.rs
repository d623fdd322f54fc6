//! Database abstraction layer.
//!
//! [`AnalysisStore`] defines the interface for persisting analysis records.
//! The default implementation is [`SqliteStore`]. To swap to another
//! database, implement [`AnalysisStore`] for your new type and change the
//! concrete type in [`crate::state::AppState`].
//!
//! The store trait's methods return `impl Future + Send`, so the trait itself
//! does not go through `async-trait`.

pub mod analysis;
pub mod dao;

pub use analysis::AnalysisStore;
pub use dao::{AnalysisRecord, AnalysisStatus};

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

/// SQLite-backed analysis store.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the SQLite database at `url` and run pending migrations.
    ///
    /// `url` should be a sqlx-compatible SQLite URL, e.g. `"sqlite://metafarm.db"`
    /// or `"sqlite::memory:"`.
    ///
    /// Every in-memory connection is its own database, so an in-memory pool
    /// is pinned to a single connection that is never reaped.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let pool_options = if is_in_memory(url) {
            SqlitePoolOptions::new()
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = pool_options.connect_with(options).await?;
        // Path is resolved relative to CARGO_MANIFEST_DIR at compile time.
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Fresh in-memory store.
    #[cfg(test)]
    pub async fn in_memory() -> Self {
        Self::connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite store")
    }
}

#[cfg(test)]
impl SqliteStore {
    /// Close the pool so every later query fails.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn detects_in_memory_urls() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite://:memory:"));
        assert!(is_in_memory("sqlite:file:metafarm?mode=memory&cache=shared"));
        assert!(!is_in_memory("sqlite://metafarm.db"));
    }
}
