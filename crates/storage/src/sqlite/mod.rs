use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;
use tracing::{info, warn};

use crate::repository::Storage;

mod assessment_repo;
mod learning_repo;
mod mapping;
mod migrate;
mod question_repo;
mod retry;
mod schema_repo;
mod student_repo;

pub use retry::{Recovery, classify};

/// Pool tuning for the `SQLite` adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub busy_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

/// `SQLite` backend. Cheap to clone; clones share one swappable pool so a
/// reconnect made by any handle is seen by all of them.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: Arc<RwLock<SqlitePool>>,
    url: Arc<str>,
    options: StoreOptions,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

async fn open_pool(url: &str, options: StoreOptions) -> Result<SqlitePool, sqlx::Error> {
    let busy_ms = i64::try_from(options.busy_timeout.as_millis()).unwrap_or(i64::MAX);
    SqlitePoolOptions::new()
        .max_connections(options.max_connections)
        .acquire_timeout(options.acquire_timeout)
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON;")
                    .execute(&mut *conn)
                    .await?;
                sqlx::query("PRAGMA journal_mode = WAL;")
                    .execute(&mut *conn)
                    .await?;
                sqlx::query(&format!("PRAGMA busy_timeout = {busy_ms};"))
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        })
        .connect(url)
        .await
}

impl SqliteRepository {
    /// Connect to `SQLite` using the given URL and default pool options.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established or if
    /// the per-connection pragmas fail.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        Self::connect_with(database_url, StoreOptions::default()).await
    }

    /// Connect with explicit pool options.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established.
    pub async fn connect_with(
        database_url: &str,
        options: StoreOptions,
    ) -> Result<Self, SqliteInitError> {
        let pool = open_pool(database_url, options).await?;
        Ok(Self {
            pool: Arc::new(RwLock::new(pool)),
            url: Arc::from(database_url),
            options,
        })
    }

    /// Handle to the current pool.
    #[must_use]
    pub fn pool(&self) -> SqlitePool {
        self.pool.read().clone()
    }

    /// Create tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool()).await
    }

    /// Replace the pool with a freshly opened one and close the old one.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the new pool cannot connect.
    pub async fn reconnect(&self) -> Result<(), SqliteInitError> {
        let fresh = open_pool(&self.url, self.options).await?;
        let stale = std::mem::replace(&mut *self.pool.write(), fresh);
        stale.close().await;
        info!("sqlite pool rebuilt");
        Ok(())
    }

    /// Close every pooled connection. Later operations fail with
    /// `PoolClosed` until the retry policy reconnects.
    pub async fn close(&self) {
        self.pool().close().await;
        warn!("sqlite pool closed");
    }
}

impl Storage {
    /// Build a `Storage` backed by `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str, options: StoreOptions) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect_with(database_url, options).await?;
        repo.migrate().await?;
        Ok(Self::from_repository(repo))
    }
}
