use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tactile_core::model::{CORRECT_ASSESSMENT, Student, StudentId, StudentPatch};

use super::SqliteRepository;
use super::mapping::{STUDENT_COLUMNS, map_activity_row, map_student_row};
use crate::repository::{StorageError, StudentActivity, StudentRepository};

#[async_trait]
impl StudentRepository for SqliteRepository {
    async fn insert_student(&self, student: &Student) -> Result<(), StorageError> {
        let id = student.id().as_str();
        let p = student.profile();
        let created_at = student.created_at();
        let updated_at = student.updated_at();
        self.run("insert_student", |pool| async move {
            sqlx::query(
                r"
                INSERT INTO students (
                    student_id, first_name, last_name, date_of_birth, email, phone,
                    emergency_contact, emergency_phone, medical_notes, learning_goals,
                    created_at, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                ",
            )
            .bind(id)
            .bind(p.first_name.as_str())
            .bind(p.last_name.as_str())
            .bind(p.date_of_birth)
            .bind(p.email.as_deref())
            .bind(p.phone.as_deref())
            .bind(p.emergency_contact.as_deref())
            .bind(p.emergency_phone.as_deref())
            .bind(p.medical_notes.as_deref())
            .bind(p.learning_goals.as_deref())
            .bind(created_at)
            .bind(updated_at)
            .execute(&pool)
            .await
        })
        .await?;
        Ok(())
    }

    async fn get_student(&self, id: &StudentId) -> Result<Option<Student>, StorageError> {
        let sql = format!("SELECT {STUDENT_COLUMNS} FROM students WHERE student_id = ?1");
        let (sql, id) = (sql.as_str(), id.as_str());
        let row = self
            .run("get_student", |pool| async move {
                sqlx::query(sql).bind(id).fetch_optional(&pool).await
            })
            .await?;
        row.as_ref().map(map_student_row).transpose()
    }

    async fn update_student(
        &self,
        id: &StudentId,
        patch: &StudentPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Student, StorageError> {
        let sql = format!(
            r"
            UPDATE students SET
                first_name = COALESCE(?2, first_name),
                last_name = COALESCE(?3, last_name),
                date_of_birth = COALESCE(?4, date_of_birth),
                email = COALESCE(?5, email),
                phone = COALESCE(?6, phone),
                emergency_contact = COALESCE(?7, emergency_contact),
                emergency_phone = COALESCE(?8, emergency_phone),
                medical_notes = COALESCE(?9, medical_notes),
                learning_goals = COALESCE(?10, learning_goals),
                updated_at = ?11
            WHERE student_id = ?1
            RETURNING {STUDENT_COLUMNS}
            "
        );
        let (sql, id) = (sql.as_str(), id.as_str());
        let row = self
            .run("update_student", |pool| async move {
                sqlx::query(sql)
                    .bind(id)
                    .bind(patch.first_name.as_deref())
                    .bind(patch.last_name.as_deref())
                    .bind(patch.date_of_birth)
                    .bind(patch.email.as_deref())
                    .bind(patch.phone.as_deref())
                    .bind(patch.emergency_contact.as_deref())
                    .bind(patch.emergency_phone.as_deref())
                    .bind(patch.medical_notes.as_deref())
                    .bind(patch.learning_goals.as_deref())
                    .bind(updated_at)
                    .fetch_optional(&pool)
                    .await
            })
            .await?;
        row.as_ref()
            .map(map_student_row)
            .transpose()?
            .ok_or(StorageError::NotFound)
    }

    async fn delete_student(&self, id: &StudentId) -> Result<(), StorageError> {
        let id = id.as_str();
        let result = self
            .run("delete_student", |pool| async move {
                sqlx::query("DELETE FROM students WHERE student_id = ?1")
                    .bind(id)
                    .execute(&pool)
                    .await
            })
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn list_student_activity(&self) -> Result<Vec<StudentActivity>, StorageError> {
        let rows = self
            .run("list_student_activity", |pool| async move {
                sqlx::query(
                    r"
                    SELECT
                        s.student_id, s.first_name, s.last_name, s.date_of_birth, s.email,
                        s.phone, s.emergency_contact, s.emergency_phone, s.medical_notes,
                        s.learning_goals, s.created_at, s.updated_at,
                        (SELECT COUNT(*) FROM learning_sessions l
                            WHERE l.student_id = s.student_id) AS total_sessions,
                        (SELECT MAX(l.timestamp) FROM learning_sessions l
                            WHERE l.student_id = s.student_id) AS last_session_at,
                        (SELECT COUNT(*) FROM assessment_sessions a
                            WHERE a.student_id = s.student_id) AS questions_asked,
                        (SELECT COUNT(*) FROM assessment_sessions a
                            WHERE a.student_id = s.student_id
                              AND a.assessment = ?1) AS correct_answers
                    FROM students s
                    ORDER BY s.created_at DESC, s.id DESC
                    ",
                )
                .bind(CORRECT_ASSESSMENT)
                .fetch_all(&pool)
                .await
            })
            .await?;
        rows.iter().map(map_activity_row).collect()
    }
}
