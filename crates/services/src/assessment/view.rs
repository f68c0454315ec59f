use chrono::{DateTime, Utc};
use serde::Serialize;

use storage::repository::ActiveAssessment;
use tactile_core::model::{
    AssessmentQuestion, AssessmentSession, AssessmentSessionId, AssessmentStatus, QuestionId,
    StudentId,
};
use tactile_core::stats::ScoreTally;

/// Presentation-agnostic projection of an assessment session marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssessmentSessionView {
    pub session_id: AssessmentSessionId,
    pub student_id: StudentId,
    pub status: AssessmentStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl From<AssessmentSession> for AssessmentSessionView {
    fn from(session: AssessmentSession) -> Self {
        Self {
            session_id: session.id,
            student_id: session.student_id,
            status: session.status,
            started_at: session.started_at,
            ended_at: session.ended_at,
        }
    }
}

/// Everything the board needs before deciding whether to offer an assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssessmentStatusView {
    pub student_id: StudentId,
    pub assessed_today: bool,
    pub learned_today: bool,
    pub current_session: Option<AssessmentSessionView>,
    pub last_assessment: Option<DateTime<Utc>>,
    pub last_learning: Option<DateTime<Utc>>,
}

/// A closed assessment with the answers recorded while it ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedAssessment {
    #[serde(flatten)]
    pub session: AssessmentSessionView,
    pub questions_asked: u32,
    pub correct_answers: u32,
    pub accuracy: u8,
}

impl CompletedAssessment {
    #[must_use]
    pub fn new(session: AssessmentSession, tally: ScoreTally) -> Self {
        Self {
            session: session.into(),
            questions_asked: tally.asked,
            correct_answers: tally.correct,
            accuracy: tally.accuracy(),
        }
    }
}

/// The assessment currently running anywhere, with the student's names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentAssessment {
    #[serde(flatten)]
    pub session: AssessmentSessionView,
    pub first_name: String,
    pub last_name: String,
    pub student_name: String,
}

impl From<ActiveAssessment> for CurrentAssessment {
    fn from(active: ActiveAssessment) -> Self {
        let student_name = format!("{} {}", active.first_name, active.last_name);
        Self {
            session: active.session.into(),
            first_name: active.first_name,
            last_name: active.last_name,
            student_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssessmentQuestionView {
    pub id: QuestionId,
    pub student_id: StudentId,
    pub session_id: Option<AssessmentSessionId>,
    pub question: String,
    pub answer: String,
    pub assessment: String,
    pub is_correct: bool,
    pub timestamp: DateTime<Utc>,
}

impl From<AssessmentQuestion> for AssessmentQuestionView {
    fn from(q: AssessmentQuestion) -> Self {
        let is_correct = q.is_correct();
        Self {
            id: q.id,
            student_id: q.student_id,
            session_id: q.session_id,
            question: q.question,
            answer: q.answer,
            assessment: q.assessment,
            is_correct,
            timestamp: q.timestamp,
        }
    }
}
