use std::future::Future;

use sqlx::SqlitePool;
use tracing::warn;

use super::{SqliteRepository, migrate};
use crate::repository::StorageError;

/// What the adapter does before retrying a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Re-run migrations, then retry once.
    Migrate,
    /// Rebuild the pool, then retry once.
    Reconnect,
    /// Propagate immediately.
    None,
}

/// Classify a driver error into the recovery the retry policy applies.
#[must_use]
pub fn classify(err: &sqlx::Error) -> Recovery {
    match err {
        sqlx::Error::Database(db) if db.message().contains("no such table") => Recovery::Migrate,
        sqlx::Error::Io(_) | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => {
            Recovery::Reconnect
        }
        _ => Recovery::None,
    }
}

pub(crate) fn db_err(err: sqlx::Error) -> StorageError {
    match &err {
        sqlx::Error::RowNotFound => StorageError::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => StorageError::NotFound,
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StorageError::Unavailable(err.to_string()),
        _ => StorageError::Query(err.to_string()),
    }
}

impl SqliteRepository {
    /// Run `op` against the current pool, recovering and retrying exactly
    /// once when the failure is classified as recoverable.
    pub(crate) async fn run<T, F, Fut>(&self, op: &'static str, f: F) -> Result<T, StorageError>
    where
        F: Fn(SqlitePool) -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        let err = match f(self.pool()).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let recovery = classify(&err);
        if recovery == Recovery::None {
            return Err(db_err(err));
        }

        warn!(op, ?recovery, error = %err, "store operation failed; retrying once");
        self.recover(recovery).await?;
        f(self.pool()).await.map_err(db_err)
    }

    async fn recover(&self, recovery: Recovery) -> Result<(), StorageError> {
        match recovery {
            Recovery::Migrate => migrate::ensure_schema(&self.pool())
                .await
                .map_err(|e| StorageError::Unavailable(e.to_string())),
            Recovery::Reconnect => self
                .reconnect()
                .await
                .map_err(|e| StorageError::Unavailable(e.to_string())),
            Recovery::None => Ok(()),
        }
    }
}
