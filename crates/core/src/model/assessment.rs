use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{AssessmentSessionId, QuestionId, StudentId};

/// Outcome label the scoring feed writes for a correct answer.
pub const CORRECT_ASSESSMENT: &str = "Correct";

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssessmentQuestionError {
    #[error("question cannot be empty")]
    EmptyQuestion,

    #[error("assessment outcome cannot be empty")]
    EmptyAssessment,

    #[error("invalid assessment session status: {0}")]
    InvalidStatus(String),
}

//
// ─── QUESTIONS ─────────────────────────────────────────────────────────────────
//

/// A single scored question/answer pair from an assessment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentQuestion {
    pub id: QuestionId,
    pub student_id: StudentId,
    pub session_id: Option<AssessmentSessionId>,
    pub question: String,
    pub answer: String,
    pub assessment: String,
    pub timestamp: DateTime<Utc>,
}

impl AssessmentQuestion {
    #[must_use]
    pub fn is_correct(&self) -> bool {
        is_correct(&self.assessment)
    }
}

/// Whether a stored outcome label counts as a correct answer.
#[must_use]
pub fn is_correct(assessment: &str) -> bool {
    assessment == CORRECT_ASSESSMENT
}

/// A validated question row that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAssessmentQuestion {
    pub student_id: StudentId,
    pub session_id: Option<AssessmentSessionId>,
    pub question: String,
    pub answer: String,
    pub assessment: String,
    pub timestamp: DateTime<Utc>,
}

impl NewAssessmentQuestion {
    /// The answer may be empty (a student can stay silent); the question and
    /// outcome may not.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentQuestionError` for a blank question or outcome.
    pub fn new(
        student_id: StudentId,
        question: impl Into<String>,
        answer: impl Into<String>,
        assessment: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, AssessmentQuestionError> {
        let question = question.into();
        if question.trim().is_empty() {
            return Err(AssessmentQuestionError::EmptyQuestion);
        }
        let assessment = assessment.into().trim().to_owned();
        if assessment.is_empty() {
            return Err(AssessmentQuestionError::EmptyAssessment);
        }
        Ok(Self {
            student_id,
            session_id: None,
            question,
            answer: answer.into(),
            assessment,
            timestamp,
        })
    }

    #[must_use]
    pub fn in_session(mut self, session_id: Option<AssessmentSessionId>) -> Self {
        self.session_id = session_id;
        self
    }

    #[must_use]
    pub fn into_question(self, id: QuestionId) -> AssessmentQuestion {
        AssessmentQuestion {
            id,
            student_id: self.student_id,
            session_id: self.session_id,
            question: self.question,
            answer: self.answer,
            assessment: self.assessment,
            timestamp: self.timestamp,
        }
    }
}

//
// ─── SESSION MARKERS ───────────────────────────────────────────────────────────
//

/// Lifecycle state of an assessment session marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentStatus {
    Active,
    Completed,
    Cancelled,
}

impl AssessmentStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Terminal states close an active marker.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl fmt::Display for AssessmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssessmentStatus {
    type Err = AssessmentQuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(AssessmentQuestionError::InvalidStatus(other.to_owned())),
        }
    }
}

/// Marker recording that an assessment ran (or is running) for a student.
///
/// A student has at most one marker in `Active` status at any time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentSession {
    pub id: AssessmentSessionId,
    pub student_id: StudentId,
    pub status: AssessmentStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl AssessmentSession {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == AssessmentStatus::Active
    }
}
