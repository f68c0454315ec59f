use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{LearningSessionId, StudentId};
use crate::model::shape::Shape;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LearningSessionError {
    #[error("explanation cannot be empty")]
    EmptyExplanation,
}

/// One explanation given to a student on the tactile board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearningSession {
    pub id: LearningSessionId,
    pub student_id: StudentId,
    pub shape: Shape,
    pub explanation: String,
    pub timestamp: DateTime<Utc>,
}

/// A validated learning session that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLearningSession {
    pub student_id: StudentId,
    pub shape: Shape,
    pub explanation: String,
    pub timestamp: DateTime<Utc>,
}

impl NewLearningSession {
    /// # Errors
    ///
    /// Returns `LearningSessionError::EmptyExplanation` for a blank explanation.
    pub fn new(
        student_id: StudentId,
        shape: Shape,
        explanation: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, LearningSessionError> {
        let explanation = explanation.into();
        if explanation.trim().is_empty() {
            return Err(LearningSessionError::EmptyExplanation);
        }
        Ok(Self {
            student_id,
            shape,
            explanation,
            timestamp,
        })
    }

    #[must_use]
    pub fn into_session(self, id: LearningSessionId) -> LearningSession {
        LearningSession {
            id,
            student_id: self.student_id,
            shape: self.shape,
            explanation: self.explanation,
            timestamp: self.timestamp,
        }
    }
}
