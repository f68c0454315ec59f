use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use tactile_core::model::{AssessmentSession, AssessmentSessionId, AssessmentStatus, StudentId};

use super::SqliteRepository;
use super::mapping::{map_marker_row, ser};
use crate::repository::{ActiveAssessment, AssessmentSessionRepository, StorageError};

#[async_trait]
impl AssessmentSessionRepository for SqliteRepository {
    async fn start_session(
        &self,
        student_id: &StudentId,
        started_at: DateTime<Utc>,
    ) -> Result<AssessmentSession, StorageError> {
        let id = student_id.as_str();
        // The partial unique index rejects a second active marker.
        let result = self
            .run("start_session", |pool| async move {
                sqlx::query(
                    r"
                    INSERT INTO active_sessions (student_id, status, started_at)
                    VALUES (?1, ?2, ?3)
                    ",
                )
                .bind(id)
                .bind(AssessmentStatus::Active.as_str())
                .bind(started_at)
                .execute(&pool)
                .await
            })
            .await?;
        Ok(AssessmentSession {
            id: AssessmentSessionId::new(result.last_insert_rowid()),
            student_id: student_id.clone(),
            status: AssessmentStatus::Active,
            started_at,
            ended_at: None,
        })
    }

    async fn active_session(
        &self,
        student_id: &StudentId,
    ) -> Result<Option<AssessmentSession>, StorageError> {
        let id = student_id.as_str();
        let row = self
            .run("active_session", |pool| async move {
                sqlx::query(
                    r"
                    SELECT id, student_id, status, started_at, ended_at
                    FROM active_sessions
                    WHERE student_id = ?1 AND status = 'active'
                    ",
                )
                .bind(id)
                .fetch_optional(&pool)
                .await
            })
            .await?;
        row.as_ref().map(map_marker_row).transpose()
    }

    async fn finish_session(
        &self,
        student_id: &StudentId,
        status: AssessmentStatus,
        ended_at: DateTime<Utc>,
    ) -> Result<AssessmentSession, StorageError> {
        let id = student_id.as_str();
        let row = self
            .run("finish_session", |pool| async move {
                sqlx::query(
                    r"
                    UPDATE active_sessions
                    SET status = ?2, ended_at = ?3
                    WHERE student_id = ?1 AND status = 'active'
                    RETURNING id, student_id, status, started_at, ended_at
                    ",
                )
                .bind(id)
                .bind(status.as_str())
                .bind(ended_at)
                .fetch_optional(&pool)
                .await
            })
            .await?;
        row.as_ref()
            .map(map_marker_row)
            .transpose()?
            .ok_or(StorageError::NotFound)
    }

    async fn latest_completed(
        &self,
        student_id: &StudentId,
    ) -> Result<Option<AssessmentSession>, StorageError> {
        let id = student_id.as_str();
        let row = self
            .run("latest_completed", |pool| async move {
                sqlx::query(
                    r"
                    SELECT id, student_id, status, started_at, ended_at
                    FROM active_sessions
                    WHERE student_id = ?1 AND status = 'completed'
                    ORDER BY ended_at DESC, id DESC
                    LIMIT 1
                    ",
                )
                .bind(id)
                .fetch_optional(&pool)
                .await
            })
            .await?;
        row.as_ref().map(map_marker_row).transpose()
    }

    async fn latest_active(&self) -> Result<Option<ActiveAssessment>, StorageError> {
        let row = self
            .run("latest_active", |pool| async move {
                sqlx::query(
                    r"
                    SELECT a.id, a.student_id, a.status, a.started_at, a.ended_at,
                           s.first_name, s.last_name
                    FROM active_sessions a
                    JOIN students s ON s.student_id = a.student_id
                    WHERE a.status = 'active'
                    ORDER BY a.started_at DESC, a.id DESC
                    LIMIT 1
                    ",
                )
                .fetch_optional(&pool)
                .await
            })
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(ActiveAssessment {
            session: map_marker_row(&row)?,
            first_name: row.try_get("first_name").map_err(ser)?,
            last_name: row.try_get("last_name").map_err(ser)?,
        }))
    }
}
