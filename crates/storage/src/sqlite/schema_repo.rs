use async_trait::async_trait;

use super::SqliteRepository;
use super::migrate;
use super::retry::db_err;
use crate::repository::{SchemaRepository, SchemaStatus, StorageError};

#[async_trait]
impl SchemaRepository for SqliteRepository {
    async fn schema_status(&self) -> Result<SchemaStatus, StorageError> {
        let present = migrate::existing_tables(&self.pool())
            .await
            .map_err(db_err)?;
        let has = |name: &str| present.iter().any(|t| t == name);
        Ok(SchemaStatus {
            students: has("students"),
            learning_sessions: has("learning_sessions"),
            assessment_sessions: has("assessment_sessions"),
            active_sessions: has("active_sessions"),
        })
    }

    async fn ensure_schema(&self) -> Result<(), StorageError> {
        migrate::ensure_schema(&self.pool())
            .await
            .map_err(|e| StorageError::Query(e.to_string()))
    }
}
