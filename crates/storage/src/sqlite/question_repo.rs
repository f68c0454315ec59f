use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use tactile_core::model::{
    AssessmentQuestion, AssessmentSessionId, CORRECT_ASSESSMENT, NewAssessmentQuestion,
    QuestionId, StudentId, is_correct,
};
use tactile_core::stats::ScoreTally;

use super::SqliteRepository;
use super::mapping::{i64_to_u32, limit_to_i64, map_question_row, ser, student_id};
use crate::repository::{
    AssessmentQuestionRepository, DailyTally, QuestionFilter, StorageError, fold_daily_tallies,
};

#[async_trait]
impl AssessmentQuestionRepository for SqliteRepository {
    async fn append_question(
        &self,
        question: &NewAssessmentQuestion,
    ) -> Result<AssessmentQuestion, StorageError> {
        let result = self
            .run("append_question", |pool| async move {
                sqlx::query(
                    r"
                    INSERT INTO assessment_sessions (
                        student_id, session_id, question, answer, assessment, timestamp
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ",
                )
                .bind(question.student_id.as_str())
                .bind(question.session_id.map(|id| id.value()))
                .bind(question.question.as_str())
                .bind(question.answer.as_str())
                .bind(question.assessment.as_str())
                .bind(question.timestamp)
                .execute(&pool)
                .await
            })
            .await?;
        let id = QuestionId::new(result.last_insert_rowid());
        Ok(question.clone().into_question(id))
    }

    async fn list_questions(
        &self,
        filter: &QuestionFilter,
    ) -> Result<Vec<AssessmentQuestion>, StorageError> {
        let mut sql = String::from(
            r"
            SELECT id, student_id, session_id, question, answer, assessment, timestamp
            FROM assessment_sessions
            WHERE student_id = ?1
            ",
        );
        let mut bind_index = 2;
        if filter.window.is_some() {
            sql.push_str(&format!(
                " AND timestamp >= ?{} AND timestamp < ?{}",
                bind_index,
                bind_index + 1
            ));
            bind_index += 2;
        }
        if filter.unattached_only {
            sql.push_str(" AND session_id IS NULL");
        }
        sql.push_str(&format!(" ORDER BY timestamp DESC, id DESC LIMIT ?{bind_index}"));

        let sql = sql.as_str();
        let rows = self
            .run("list_questions", |pool| async move {
                let mut query = sqlx::query(sql).bind(filter.student_id.as_str());
                if let Some(window) = filter.window {
                    query = query.bind(window.start).bind(window.end);
                }
                query
                    .bind(limit_to_i64(filter.limit))
                    .fetch_all(&pool)
                    .await
            })
            .await?;
        rows.iter().map(map_question_row).collect()
    }

    async fn daily_tallies(
        &self,
        student: Option<&StudentId>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<DailyTally>, StorageError> {
        let student = student.map(StudentId::as_str);
        let rows = self
            .run("daily_tallies", |pool| async move {
                sqlx::query(
                    r"
                    SELECT student_id, assessment, timestamp
                    FROM assessment_sessions
                    WHERE (?1 IS NULL OR student_id = ?1)
                      AND (?2 IS NULL OR timestamp >= ?2)
                    ",
                )
                .bind(student)
                .bind(since)
                .fetch_all(&pool)
                .await
            })
            .await?;

        let mut triples = Vec::with_capacity(rows.len());
        for row in &rows {
            let assessment: String = row.try_get("assessment").map_err(ser)?;
            let at: DateTime<Utc> = row.try_get("timestamp").map_err(ser)?;
            triples.push((student_id(row)?, at, is_correct(&assessment)));
        }
        Ok(fold_daily_tallies(triples))
    }

    async fn session_tally(
        &self,
        session_id: AssessmentSessionId,
    ) -> Result<ScoreTally, StorageError> {
        let row = self
            .run("session_tally", |pool| async move {
                sqlx::query(
                    r"
                    SELECT
                        COUNT(*) AS asked,
                        COALESCE(SUM(CASE WHEN assessment = ?2 THEN 1 ELSE 0 END), 0) AS correct
                    FROM assessment_sessions
                    WHERE session_id = ?1
                    ",
                )
                .bind(session_id.value())
                .bind(CORRECT_ASSESSMENT)
                .fetch_one(&pool)
                .await
            })
            .await?;
        Ok(ScoreTally::new(
            i64_to_u32("asked", row.try_get("asked").map_err(ser)?)?,
            i64_to_u32("correct", row.try_get("correct").map_err(ser)?)?,
        ))
    }
}
