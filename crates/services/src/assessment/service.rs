use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use storage::repository::{
    AssessmentQuestionRepository, AssessmentSessionRepository, LearningSessionFilter,
    LearningSessionRepository, QuestionFilter, StorageError, StudentRepository,
};
use tactile_core::model::{AssessmentSession, AssessmentStatus, NewAssessmentQuestion, StudentId};
use tactile_core::time::DayWindow;
use tracing::{debug, info};

use super::view::{
    AssessmentQuestionView, AssessmentSessionView, AssessmentStatusView, CompletedAssessment,
    CurrentAssessment,
};
use crate::Clock;
use crate::error::AssessmentError;

/// Session state manager.
///
/// Per student: idle, then active after `start`, then closed by `complete`
/// (which also counts as assessed for the rest of the UTC day) or `cancel`
/// (which does not). The store guarantees at most one active marker.
#[derive(Clone)]
pub struct AssessmentService {
    clock: Clock,
    students: Arc<dyn StudentRepository>,
    learning: Arc<dyn LearningSessionRepository>,
    questions: Arc<dyn AssessmentQuestionRepository>,
    sessions: Arc<dyn AssessmentSessionRepository>,
}

impl AssessmentService {
    #[must_use]
    pub fn new(
        clock: Clock,
        students: Arc<dyn StudentRepository>,
        learning: Arc<dyn LearningSessionRepository>,
        questions: Arc<dyn AssessmentQuestionRepository>,
        sessions: Arc<dyn AssessmentSessionRepository>,
    ) -> Self {
        Self {
            clock,
            students,
            learning,
            questions,
            sessions,
        }
    }

    /// Open an assessment for the student.
    ///
    /// # Errors
    ///
    /// - `AssessmentError::InvalidStudent` for a malformed id.
    /// - `AssessmentError::StudentNotFound` if the student does not exist.
    /// - `AssessmentError::AlreadyAssessedToday` if an assessment was completed
    ///   or answers were recorded today.
    /// - `AssessmentError::SessionAlreadyActive` if a session is already open,
    ///   including one opened concurrently.
    pub async fn start(&self, raw_id: &str) -> Result<AssessmentSessionView, AssessmentError> {
        let id = StudentId::parse(raw_id)?;
        if self.students.get_student(&id).await?.is_none() {
            return Err(AssessmentError::StudentNotFound(id));
        }

        let now = self.clock.now();
        if self.assessed_on(&id, now.date_naive()).await? {
            return Err(AssessmentError::AlreadyAssessedToday(id));
        }
        if self.sessions.active_session(&id).await?.is_some() {
            return Err(AssessmentError::SessionAlreadyActive(id));
        }

        let session = match self.sessions.start_session(&id, now).await {
            Ok(session) => session,
            Err(StorageError::Conflict) => return Err(AssessmentError::SessionAlreadyActive(id)),
            Err(StorageError::NotFound) => return Err(AssessmentError::StudentNotFound(id)),
            Err(e) => return Err(e.into()),
        };
        info!(student_id = %id, session_id = %session.id, "assessment started");
        Ok(session.into())
    }

    /// Read-only snapshot of the student's assessment state.
    ///
    /// Unknown students report all-false flags rather than an error.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::InvalidStudent` for a malformed id, or a
    /// storage error.
    pub async fn status(&self, raw_id: &str) -> Result<AssessmentStatusView, AssessmentError> {
        let id = StudentId::parse(raw_id)?;
        let today = self.clock.today();
        let window = DayWindow::for_date(today);

        let current_session = self.sessions.active_session(&id).await?;
        let last_completed = self.sessions.latest_completed(&id).await?;
        let last_question = self
            .questions
            .list_questions(&QuestionFilter::for_student(id.clone()).with_limit(1))
            .await?
            .into_iter()
            .next();
        let last_learning = self
            .learning
            .list_sessions(&LearningSessionFilter::for_student(id.clone()).with_limit(1))
            .await?
            .into_iter()
            .next()
            .map(|s| s.timestamp);

        let last_assessment = latest(
            last_completed.and_then(|s| s.ended_at),
            last_question.map(|q| q.timestamp),
        );

        Ok(AssessmentStatusView {
            assessed_today: self.assessed_on(&id, today).await?,
            learned_today: last_learning.is_some_and(|at| window.contains(at)),
            current_session: current_session.map(Into::into),
            last_assessment,
            last_learning,
            student_id: id,
        })
    }

    /// Close the student's active assessment as completed.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::NoActiveSession` if nothing is running.
    pub async fn complete(&self, raw_id: &str) -> Result<CompletedAssessment, AssessmentError> {
        let id = StudentId::parse(raw_id)?;
        let session = self.finish(&id, AssessmentStatus::Completed).await?;
        let tally = self.questions.session_tally(session.id).await?;
        info!(
            student_id = %id,
            session_id = %session.id,
            asked = tally.asked,
            correct = tally.correct,
            "assessment completed"
        );
        Ok(CompletedAssessment::new(session, tally))
    }

    /// Stop the student's active assessment without counting it.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::NoActiveSession` if nothing is running.
    pub async fn cancel(&self, raw_id: &str) -> Result<AssessmentSessionView, AssessmentError> {
        let id = StudentId::parse(raw_id)?;
        let session = self.finish(&id, AssessmentStatus::Cancelled).await?;
        info!(student_id = %id, session_id = %session.id, "assessment cancelled");
        Ok(session.into())
    }

    /// The most recently started assessment across all students.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the lookup fails.
    pub async fn current(&self) -> Result<Option<CurrentAssessment>, AssessmentError> {
        Ok(self.sessions.latest_active().await?.map(Into::into))
    }

    /// Store one scored answer from the assessment feed, attached to the
    /// student's running session if there is one.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::Question` for a blank question or outcome,
    /// `AssessmentError::StudentNotFound` for an unknown student.
    pub async fn record_question(
        &self,
        raw_id: &str,
        question: &str,
        answer: &str,
        assessment: &str,
    ) -> Result<AssessmentQuestionView, AssessmentError> {
        let id = StudentId::parse(raw_id)?;
        let draft =
            NewAssessmentQuestion::new(id.clone(), question, answer, assessment, self.clock.now())?;
        let active = self.sessions.active_session(&id).await?;
        let draft = draft.in_session(active.map(|s| s.id));

        let stored = match self.questions.append_question(&draft).await {
            Ok(stored) => stored,
            Err(StorageError::NotFound) => return Err(AssessmentError::StudentNotFound(id)),
            Err(e) => return Err(e.into()),
        };
        debug!(
            student_id = %id,
            question_id = %stored.id,
            correct = stored.is_correct(),
            "assessment answer recorded"
        );
        Ok(stored.into())
    }

    /// Raw answers of one student, newest first, optionally for a single day.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::InvalidStudent` for a malformed or empty id.
    pub async fn list_questions(
        &self,
        raw_id: &str,
        day: Option<NaiveDate>,
    ) -> Result<Vec<AssessmentQuestionView>, AssessmentError> {
        let id = StudentId::parse(raw_id)?;
        let mut filter = QuestionFilter::for_student(id);
        if let Some(day) = day {
            filter = filter.on_day(day);
        }
        let rows = self.questions.list_questions(&filter).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn assessed_on(&self, id: &StudentId, day: NaiveDate) -> Result<bool, AssessmentError> {
        let window = DayWindow::for_date(day);
        let completed = self.sessions.latest_completed(id).await?;
        if completed
            .and_then(|s| s.ended_at)
            .is_some_and(|at| window.contains(at))
        {
            return Ok(true);
        }
        // Answers under a marker only count once that marker completes.
        let answered = self
            .questions
            .list_questions(
                &QuestionFilter::for_student(id.clone())
                    .on_day(day)
                    .outside_sessions()
                    .with_limit(1),
            )
            .await?;
        Ok(!answered.is_empty())
    }

    async fn finish(
        &self,
        id: &StudentId,
        status: AssessmentStatus,
    ) -> Result<AssessmentSession, AssessmentError> {
        match self
            .sessions
            .finish_session(id, status, self.clock.now())
            .await
        {
            Ok(session) => Ok(session),
            Err(StorageError::NotFound) => Err(AssessmentError::NoActiveSession(id.clone())),
            Err(e) => Err(e.into()),
        }
    }
}

fn latest(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use storage::repository::Storage;
    use tactile_core::model::{Student, StudentProfile};
    use tactile_core::time::fixed_now;

    async fn setup(clock: Clock) -> (AssessmentService, Storage) {
        let storage = Storage::in_memory();
        for id in ["STU1", "STU2"] {
            let student = Student::new(
                StudentId::parse(id).unwrap(),
                StudentProfile::new("Ana", id),
                fixed_now(),
            )
            .unwrap();
            storage.students.insert_student(&student).await.unwrap();
        }
        let svc = AssessmentService::new(
            clock,
            Arc::clone(&storage.students),
            Arc::clone(&storage.learning_sessions),
            Arc::clone(&storage.questions),
            Arc::clone(&storage.assessments),
        );
        (svc, storage)
    }

    #[tokio::test]
    async fn second_start_is_rejected_while_active() {
        let (svc, _) = setup(Clock::fixed(fixed_now())).await;
        let started = svc.start("STU1").await.unwrap();
        assert_eq!(started.status, AssessmentStatus::Active);

        let err = svc.start("STU1").await.unwrap_err();
        assert!(matches!(err, AssessmentError::SessionAlreadyActive(_)));

        // Other students are unaffected.
        svc.start("STU2").await.unwrap();
    }

    #[tokio::test]
    async fn completed_assessment_blocks_rest_of_day() {
        let (svc, storage) = setup(Clock::fixed(fixed_now())).await;
        svc.start("STU1").await.unwrap();
        svc.record_question("STU1", "What shape?", "circle", "Correct")
            .await
            .unwrap();
        svc.record_question("STU1", "And this?", "square", "Incorrect")
            .await
            .unwrap();
        let done = svc.complete("STU1").await.unwrap();
        assert_eq!(done.questions_asked, 2);
        assert_eq!(done.correct_answers, 1);
        assert_eq!(done.accuracy, 50);

        let err = svc.start("STU1").await.unwrap_err();
        assert!(matches!(err, AssessmentError::AlreadyAssessedToday(_)));
        let id = StudentId::parse("STU1").unwrap();
        assert!(storage.assessments.active_session(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn next_day_allows_a_new_assessment() {
        let (svc, storage) = setup(Clock::fixed(fixed_now())).await;
        svc.start("STU1").await.unwrap();
        svc.complete("STU1").await.unwrap();

        let mut clock = Clock::fixed(fixed_now());
        clock.advance(Duration::days(1));
        let tomorrow = AssessmentService::new(
            clock,
            Arc::clone(&storage.students),
            Arc::clone(&storage.learning_sessions),
            Arc::clone(&storage.questions),
            Arc::clone(&storage.assessments),
        );
        assert!(!tomorrow.status("STU1").await.unwrap().assessed_today);
        tomorrow.start("STU1").await.unwrap();
    }

    #[tokio::test]
    async fn cancelled_run_does_not_count_as_assessed() {
        let (svc, _) = setup(Clock::fixed(fixed_now())).await;
        svc.start("STU1").await.unwrap();
        let cancelled = svc.cancel("STU1").await.unwrap();
        assert_eq!(cancelled.status, AssessmentStatus::Cancelled);

        let status = svc.status("STU1").await.unwrap();
        assert!(!status.assessed_today);
        assert!(status.current_session.is_none());
        svc.start("STU1").await.unwrap();
    }

    #[tokio::test]
    async fn answers_inside_a_cancelled_run_allow_a_restart() {
        let (svc, _) = setup(Clock::fixed(fixed_now())).await;
        svc.start("STU1").await.unwrap();
        let q = svc
            .record_question("STU1", "What shape?", "circle", "Correct")
            .await
            .unwrap();
        assert!(q.session_id.is_some());

        let status = svc.status("STU1").await.unwrap();
        assert!(!status.assessed_today);
        assert!(status.current_session.is_some());

        svc.cancel("STU1").await.unwrap();
        assert!(!svc.status("STU1").await.unwrap().assessed_today);
        let restarted = svc.start("STU1").await.unwrap();
        assert_eq!(restarted.status, AssessmentStatus::Active);
    }

    #[tokio::test]
    async fn answers_outside_a_session_count_as_assessed() {
        let (svc, _) = setup(Clock::fixed(fixed_now())).await;
        let q = svc
            .record_question("STU1", "What shape?", "", "Incorrect")
            .await
            .unwrap();
        assert_eq!(q.session_id, None);

        let status = svc.status("STU1").await.unwrap();
        assert!(status.assessed_today);
        assert_eq!(status.last_assessment, Some(fixed_now()));
        assert!(matches!(
            svc.start("STU1").await,
            Err(AssessmentError::AlreadyAssessedToday(_))
        ));
    }

    #[tokio::test]
    async fn complete_without_session_is_not_found() {
        let (svc, _) = setup(Clock::fixed(fixed_now())).await;
        assert!(matches!(
            svc.complete("STU1").await,
            Err(AssessmentError::NoActiveSession(_))
        ));
        assert!(matches!(
            svc.cancel("STU1").await,
            Err(AssessmentError::NoActiveSession(_))
        ));
    }

    #[tokio::test]
    async fn start_requires_known_student() {
        let (svc, _) = setup(Clock::fixed(fixed_now())).await;
        assert!(matches!(
            svc.start("STU404").await,
            Err(AssessmentError::StudentNotFound(_))
        ));
        assert!(matches!(
            svc.start("  ").await,
            Err(AssessmentError::InvalidStudent(_))
        ));
    }

    #[tokio::test]
    async fn current_reports_latest_running_session() {
        let (svc, _) = setup(Clock::fixed(fixed_now())).await;
        assert!(svc.current().await.unwrap().is_none());
        svc.start("STU2").await.unwrap();
        let current = svc.current().await.unwrap().unwrap();
        assert_eq!(current.session.student_id.as_str(), "STU2");
        assert_eq!(current.student_name, "Ana STU2");
    }

    #[tokio::test]
    async fn list_questions_filters_by_day() {
        let (svc, _) = setup(Clock::fixed(fixed_now())).await;
        svc.record_question("STU1", "Q1", "circle", "Correct")
            .await
            .unwrap();
        let today = svc
            .list_questions("STU1", Some(fixed_now().date_naive()))
            .await
            .unwrap();
        assert_eq!(today.len(), 1);
        let yesterday = svc
            .list_questions("STU1", Some((fixed_now() - Duration::days(1)).date_naive()))
            .await
            .unwrap();
        assert!(yesterday.is_empty());
        assert!(matches!(
            svc.list_questions("", None).await,
            Err(AssessmentError::InvalidStudent(_))
        ));
    }
}
