use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tactile_core::model::{
    AssessmentQuestion, AssessmentSession, AssessmentSessionId, AssessmentStatus,
    LearningSession, LearningSessionId, QuestionId, Shape, Student, StudentId, StudentProfile,
};
use tactile_core::stats::ScoreTally;

use crate::repository::{StorageError, StudentActivity};

pub(crate) const STUDENT_COLUMNS: &str = "student_id, first_name, last_name, date_of_birth, \
     email, phone, emergency_contact, emergency_phone, medical_notes, learning_goals, \
     created_at, updated_at";

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn limit_to_i64(limit: Option<u32>) -> i64 {
    // SQLite treats a negative LIMIT as "no limit".
    limit.map_or(-1, i64::from)
}

pub(crate) fn student_id(row: &SqliteRow) -> Result<StudentId, StorageError> {
    let raw: String = row.try_get("student_id").map_err(ser)?;
    StudentId::parse(raw).map_err(ser)
}

pub(crate) fn map_student_row(row: &SqliteRow) -> Result<Student, StorageError> {
    let profile = StudentProfile {
        first_name: row.try_get("first_name").map_err(ser)?,
        last_name: row.try_get("last_name").map_err(ser)?,
        date_of_birth: row.try_get("date_of_birth").map_err(ser)?,
        email: row.try_get("email").map_err(ser)?,
        phone: row.try_get("phone").map_err(ser)?,
        emergency_contact: row.try_get("emergency_contact").map_err(ser)?,
        emergency_phone: row.try_get("emergency_phone").map_err(ser)?,
        medical_notes: row.try_get("medical_notes").map_err(ser)?,
        learning_goals: row.try_get("learning_goals").map_err(ser)?,
    };
    Ok(Student::from_persisted(
        student_id(row)?,
        profile,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
    ))
}

pub(crate) fn map_activity_row(row: &SqliteRow) -> Result<StudentActivity, StorageError> {
    let last_session_at: Option<DateTime<Utc>> = row.try_get("last_session_at").map_err(ser)?;
    Ok(StudentActivity {
        student: map_student_row(row)?,
        total_sessions: i64_to_u32(
            "total_sessions",
            row.try_get::<i64, _>("total_sessions").map_err(ser)?,
        )?,
        last_session_at,
        tally: ScoreTally::new(
            i64_to_u32(
                "questions_asked",
                row.try_get::<i64, _>("questions_asked").map_err(ser)?,
            )?,
            i64_to_u32(
                "correct_answers",
                row.try_get::<i64, _>("correct_answers").map_err(ser)?,
            )?,
        ),
    })
}

pub(crate) fn map_learning_row(row: &SqliteRow) -> Result<LearningSession, StorageError> {
    let shape: String = row.try_get("shape").map_err(ser)?;
    Ok(LearningSession {
        id: LearningSessionId::new(row.try_get("id").map_err(ser)?),
        student_id: student_id(row)?,
        shape: shape.parse::<Shape>().map_err(ser)?,
        explanation: row.try_get("explanation").map_err(ser)?,
        timestamp: row.try_get("timestamp").map_err(ser)?,
    })
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<AssessmentQuestion, StorageError> {
    Ok(AssessmentQuestion {
        id: QuestionId::new(row.try_get("id").map_err(ser)?),
        student_id: student_id(row)?,
        session_id: row
            .try_get::<Option<i64>, _>("session_id")
            .map_err(ser)?
            .map(AssessmentSessionId::new),
        question: row.try_get("question").map_err(ser)?,
        answer: row.try_get("answer").map_err(ser)?,
        assessment: row.try_get("assessment").map_err(ser)?,
        timestamp: row.try_get("timestamp").map_err(ser)?,
    })
}

pub(crate) fn map_marker_row(row: &SqliteRow) -> Result<AssessmentSession, StorageError> {
    let status: String = row.try_get("status").map_err(ser)?;
    Ok(AssessmentSession {
        id: AssessmentSessionId::new(row.try_get("id").map_err(ser)?),
        student_id: student_id(row)?,
        status: status.parse::<AssessmentStatus>().map_err(ser)?,
        started_at: row.try_get("started_at").map_err(ser)?,
        ended_at: row.try_get("ended_at").map_err(ser)?,
    })
}
