//! Wire shapes: camelCase requests in, snake_case envelopes out.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use services::{CurrentAssessment, SessionQuery};
use storage::repository::SchemaStatus;
use tactile_core::model::{
    LearningSession, LearningSessionId, Shape, StudentId, StudentPatch, StudentProfile,
};

use crate::error::ApiError;

//
// ─── ENVELOPES ─────────────────────────────────────────────────────────────────
//

/// `{"success": true, "data": …}`, with `total` for lists.
#[derive(Debug, Serialize)]
pub struct Success<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
}

impl<T> Success<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            total: None,
        }
    }
}

impl<T> Success<Vec<T>> {
    pub fn list(data: Vec<T>) -> Self {
        Self {
            success: true,
            total: Some(data.len()),
            data,
        }
    }
}

/// `{"success": false, "error": …}`
#[derive(Debug, Serialize)]
pub struct Failure {
    pub success: bool,
    pub error: String,
}

impl Failure {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

//
// ─── REQUESTS ──────────────────────────────────────────────────────────────────
//

/// Profile fields shared by registration and partial update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub medical_notes: Option<String>,
    pub learning_goals: Option<String>,
}

impl StudentFields {
    fn parsed_date_of_birth(&self) -> Result<Option<NaiveDate>, ApiError> {
        let Some(raw) = self.date_of_birth.as_deref().map(str::trim) else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(None);
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("invalid dateOfBirth: {raw:?}")))
    }

    /// Fields that were sent; absent ones stay untouched.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::BadRequest` for a malformed date of birth.
    pub fn into_patch(self) -> Result<StudentPatch, ApiError> {
        let date_of_birth = self.parsed_date_of_birth()?;
        Ok(StudentPatch {
            first_name: self.first_name,
            last_name: self.last_name,
            date_of_birth,
            email: self.email,
            phone: self.phone,
            emergency_contact: self.emergency_contact,
            emergency_phone: self.emergency_phone,
            medical_notes: self.medical_notes,
            learning_goals: self.learning_goals,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStudentRequest {
    pub student_id: Option<String>,
    #[serde(flatten)]
    pub fields: StudentFields,
}

impl RegisterStudentRequest {
    /// Split into the raw id and an unvalidated profile. Missing names are
    /// passed on blank so the domain reports which one is absent.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::BadRequest` for a malformed date of birth.
    pub fn into_parts(self) -> Result<(String, StudentProfile), ApiError> {
        let date_of_birth = self.fields.parsed_date_of_birth()?;
        let f = self.fields;
        let profile = StudentProfile {
            first_name: f.first_name.unwrap_or_default(),
            last_name: f.last_name.unwrap_or_default(),
            date_of_birth,
            email: f.email,
            phone: f.phone,
            emergency_contact: f.emergency_contact,
            emergency_phone: f.emergency_phone,
            medical_notes: f.medical_notes,
            learning_goals: f.learning_goals,
        };
        Ok((self.student_id.unwrap_or_default(), profile))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSessionRequest {
    pub student_id: Option<String>,
    pub shape: Option<String>,
    pub explanation: Option<String>,
}

/// Body of the assessment transitions.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRef {
    pub student_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordQuestionRequest {
    pub student_id: Option<String>,
    pub question: Option<String>,
    pub answer: Option<String>,
    pub assessment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentListQuery {
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionListQuery {
    pub student_id: Option<String>,
    pub shape: Option<String>,
    pub limit: Option<u32>,
}

impl From<SessionListQuery> for SessionQuery {
    fn from(q: SessionListQuery) -> Self {
        Self {
            student_id: q.student_id,
            shape: q.shape,
            limit: q.limit,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionListQuery {
    pub student_id: Option<String>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    pub period: Option<String>,
}

//
// ─── RESPONSES ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LearningSessionView {
    pub id: LearningSessionId,
    pub student_id: StudentId,
    pub shape: Shape,
    pub explanation: String,
    pub timestamp: DateTime<Utc>,
}

impl From<LearningSession> for LearningSessionView {
    fn from(s: LearningSession) -> Self {
        Self {
            id: s.id,
            student_id: s.student_id,
            shape: s.shape,
            explanation: s.explanation,
            timestamp: s.timestamp,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedStudent {
    pub student_id: String,
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentStudent {
    pub current_student: Option<CurrentAssessment>,
}

/// Presence of each table plus an overall readiness flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchemaView {
    pub students: bool,
    pub learning_sessions: bool,
    pub assessment_sessions: bool,
    pub active_sessions: bool,
    pub ready: bool,
}

impl From<SchemaStatus> for SchemaView {
    fn from(s: SchemaStatus) -> Self {
        Self {
            students: s.students,
            learning_sessions: s.learning_sessions,
            assessment_sessions: s.assessment_sessions,
            active_sessions: s.active_sessions,
            ready: s.is_complete(),
        }
    }
}
