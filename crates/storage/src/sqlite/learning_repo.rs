use async_trait::async_trait;
use tactile_core::model::{LearningSession, LearningSessionId, NewLearningSession};

use super::SqliteRepository;
use super::mapping::{limit_to_i64, map_learning_row};
use crate::repository::{LearningSessionFilter, LearningSessionRepository, StorageError};

fn list_sql(filter: &LearningSessionFilter) -> String {
    let mut sql = String::from(
        "SELECT id, student_id, shape, explanation, timestamp FROM learning_sessions WHERE 1 = 1",
    );
    let mut bind_index = 1;
    if filter.student_id.is_some() {
        sql.push_str(&format!(" AND student_id = ?{bind_index}"));
        bind_index += 1;
    }
    if filter.shape.is_some() {
        sql.push_str(&format!(" AND shape = ?{bind_index}"));
        bind_index += 1;
    }
    if filter.since.is_some() {
        sql.push_str(&format!(" AND timestamp >= ?{bind_index}"));
        bind_index += 1;
    }
    sql.push_str(&format!(" ORDER BY timestamp DESC, id DESC LIMIT ?{bind_index}"));
    sql
}

#[async_trait]
impl LearningSessionRepository for SqliteRepository {
    async fn append_session(
        &self,
        session: &NewLearningSession,
    ) -> Result<LearningSession, StorageError> {
        let result = self
            .run("append_session", |pool| async move {
                sqlx::query(
                    r"
                    INSERT INTO learning_sessions (student_id, shape, explanation, timestamp)
                    VALUES (?1, ?2, ?3, ?4)
                    ",
                )
                .bind(session.student_id.as_str())
                .bind(session.shape.as_str())
                .bind(session.explanation.as_str())
                .bind(session.timestamp)
                .execute(&pool)
                .await
            })
            .await?;
        let id = LearningSessionId::new(result.last_insert_rowid());
        Ok(session.clone().into_session(id))
    }

    async fn list_sessions(
        &self,
        filter: &LearningSessionFilter,
    ) -> Result<Vec<LearningSession>, StorageError> {
        let sql = list_sql(filter);
        let sql = sql.as_str();
        let rows = self
            .run("list_sessions", |pool| async move {
                let mut query = sqlx::query(sql);
                if let Some(id) = &filter.student_id {
                    query = query.bind(id.as_str());
                }
                if let Some(shape) = filter.shape {
                    query = query.bind(shape.as_str());
                }
                if let Some(since) = filter.since {
                    query = query.bind(since);
                }
                query
                    .bind(limit_to_i64(filter.limit))
                    .fetch_all(&pool)
                    .await
            })
            .await?;
        rows.iter().map(map_learning_row).collect()
    }
}
