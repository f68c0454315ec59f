use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tactile_core::model::{
    AssessmentQuestion, AssessmentSession, AssessmentSessionId, AssessmentStatus,
    LearningSession, LearningSessionId, NewAssessmentQuestion, NewLearningSession, QuestionId,
    Shape, Student, StudentId, StudentPatch,
};
use tactile_core::stats::ScoreTally;
use tactile_core::time::DayWindow;
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// A student joined with the raw counters the dashboard list needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentActivity {
    pub student: Student,
    pub total_sessions: u32,
    pub last_session_at: Option<DateTime<Utc>>,
    pub tally: ScoreTally,
}

/// Filter for learning-session listings. Results are always newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LearningSessionFilter {
    pub student_id: Option<StudentId>,
    pub shape: Option<Shape>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

impl LearningSessionFilter {
    #[must_use]
    pub fn for_student(student_id: StudentId) -> Self {
        Self {
            student_id: Some(student_id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    fn matches(&self, session: &LearningSession) -> bool {
        self.student_id
            .as_ref()
            .is_none_or(|id| *id == session.student_id)
            && self.shape.is_none_or(|shape| shape == session.shape)
            && self.since.is_none_or(|since| session.timestamp >= since)
    }
}

/// Filter for raw assessment question rows of one student, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionFilter {
    pub student_id: StudentId,
    pub window: Option<DayWindow>,
    /// Only answers recorded outside any assessment marker.
    pub unattached_only: bool,
    pub limit: Option<u32>,
}

impl QuestionFilter {
    #[must_use]
    pub fn for_student(student_id: StudentId) -> Self {
        Self {
            student_id,
            window: None,
            unattached_only: false,
            limit: None,
        }
    }

    #[must_use]
    pub fn outside_sessions(mut self) -> Self {
        self.unattached_only = true;
        self
    }

    #[must_use]
    pub fn on_day(mut self, day: NaiveDate) -> Self {
        self.window = Some(DayWindow::for_date(day));
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, question: &AssessmentQuestion) -> bool {
        question.student_id == self.student_id
            && self.window.is_none_or(|w| w.contains(question.timestamp))
            && (!self.unattached_only || question.session_id.is_none())
    }
}

/// Scored answers of one student on one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyTally {
    pub student_id: StudentId,
    pub day: NaiveDate,
    pub tally: ScoreTally,
}

/// Folds `(student, timestamp, correct?)` triples into per-day tallies,
/// ordered by student then day.
pub fn fold_daily_tallies(
    rows: impl IntoIterator<Item = (StudentId, DateTime<Utc>, bool)>,
) -> Vec<DailyTally> {
    let mut days: BTreeMap<(StudentId, NaiveDate), ScoreTally> = BTreeMap::new();
    for (student_id, at, correct) in rows {
        days.entry((student_id, at.date_naive()))
            .or_default()
            .record(correct);
    }
    days.into_iter()
        .map(|((student_id, day), tally)| DailyTally {
            student_id,
            day,
            tally,
        })
        .collect()
}

/// The running assessment marker together with the student's names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveAssessment {
    pub session: AssessmentSession,
    pub first_name: String,
    pub last_name: String,
}

/// Which of the four tables currently exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaStatus {
    pub students: bool,
    pub learning_sessions: bool,
    pub assessment_sessions: bool,
    pub active_sessions: bool,
}

impl SchemaStatus {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.students && self.learning_sessions && self.assessment_sessions && self.active_sessions
    }
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait StudentRepository: Send + Sync {
    /// Persist a newly registered student.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the student id is already taken.
    async fn insert_student(&self, student: &Student) -> Result<(), StorageError>;

    /// Fetch a student by external id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_student(&self, id: &StudentId) -> Result<Option<Student>, StorageError>;

    /// Overwrite only the fields present in `patch` and bump `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the student does not exist.
    async fn update_student(
        &self,
        id: &StudentId,
        patch: &StudentPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Student, StorageError>;

    /// Delete a student together with every dependent row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the student does not exist.
    async fn delete_student(&self, id: &StudentId) -> Result<(), StorageError>;

    /// Every student with session and answer counters, most recently
    /// registered first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_student_activity(&self) -> Result<Vec<StudentActivity>, StorageError>;
}

#[async_trait]
pub trait LearningSessionRepository: Send + Sync {
    /// Append an immutable learning session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the student does not exist.
    async fn append_session(
        &self,
        session: &NewLearningSession,
    ) -> Result<LearningSession, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_sessions(
        &self,
        filter: &LearningSessionFilter,
    ) -> Result<Vec<LearningSession>, StorageError>;
}

#[async_trait]
pub trait AssessmentQuestionRepository: Send + Sync {
    /// Append one scored question row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the student does not exist.
    async fn append_question(
        &self,
        question: &NewAssessmentQuestion,
    ) -> Result<AssessmentQuestion, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_questions(
        &self,
        filter: &QuestionFilter,
    ) -> Result<Vec<AssessmentQuestion>, StorageError>;

    /// Per student and UTC day answer tallies, optionally restricted to one
    /// student and to rows at or after `since`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn daily_tallies(
        &self,
        student_id: Option<&StudentId>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<DailyTally>, StorageError>;

    /// Tally of the questions recorded under one assessment marker.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn session_tally(&self, session_id: AssessmentSessionId)
    -> Result<ScoreTally, StorageError>;
}

#[async_trait]
pub trait AssessmentSessionRepository: Send + Sync {
    /// Insert an active marker for the student.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the student already has an active
    /// marker, `StorageError::NotFound` if the student does not exist.
    async fn start_session(
        &self,
        student_id: &StudentId,
        started_at: DateTime<Utc>,
    ) -> Result<AssessmentSession, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn active_session(
        &self,
        student_id: &StudentId,
    ) -> Result<Option<AssessmentSession>, StorageError>;

    /// Move the student's active marker to a terminal status.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if there is no active marker.
    async fn finish_session(
        &self,
        student_id: &StudentId,
        status: AssessmentStatus,
        ended_at: DateTime<Utc>,
    ) -> Result<AssessmentSession, StorageError>;

    /// Most recently ended completed marker of the student.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn latest_completed(
        &self,
        student_id: &StudentId,
    ) -> Result<Option<AssessmentSession>, StorageError>;

    /// Most recently started active marker across all students.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn latest_active(&self) -> Result<Option<ActiveAssessment>, StorageError>;
}

#[async_trait]
pub trait SchemaRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn schema_status(&self) -> Result<SchemaStatus, StorageError>;

    /// Create any missing tables and indexes.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the schema cannot be created.
    async fn ensure_schema(&self) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemoryState {
    students: HashMap<StudentId, (u64, Student)>,
    learning: Vec<LearningSession>,
    questions: Vec<AssessmentQuestion>,
    markers: Vec<AssessmentSession>,
    next_row: u64,
    next_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn require_student(&self, id: &StudentId) -> Result<(), StorageError> {
        if self.students.contains_key(id) {
            Ok(())
        } else {
            Err(StorageError::NotFound)
        }
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl StudentRepository for InMemoryRepository {
    async fn insert_student(&self, student: &Student) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard.students.contains_key(student.id()) {
            return Err(StorageError::Conflict);
        }
        guard.next_row += 1;
        let row = guard.next_row;
        guard
            .students
            .insert(student.id().clone(), (row, student.clone()));
        Ok(())
    }

    async fn get_student(&self, id: &StudentId) -> Result<Option<Student>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.students.get(id).map(|(_, s)| s.clone()))
    }

    async fn update_student(
        &self,
        id: &StudentId,
        patch: &StudentPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Student, StorageError> {
        let mut guard = self.lock()?;
        let (_, student) = guard.students.get_mut(id).ok_or(StorageError::NotFound)?;
        student.apply_patch(patch, updated_at);
        Ok(student.clone())
    }

    async fn delete_student(&self, id: &StudentId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard.students.remove(id).is_none() {
            return Err(StorageError::NotFound);
        }
        guard.learning.retain(|s| s.student_id != *id);
        guard.questions.retain(|q| q.student_id != *id);
        guard.markers.retain(|m| m.student_id != *id);
        Ok(())
    }

    async fn list_student_activity(&self) -> Result<Vec<StudentActivity>, StorageError> {
        let guard = self.lock()?;
        let mut rows: Vec<(u64, StudentActivity)> = guard
            .students
            .values()
            .map(|(row, student)| {
                let sessions = guard
                    .learning
                    .iter()
                    .filter(|s| s.student_id == *student.id());
                let total_sessions =
                    u32::try_from(sessions.clone().count()).unwrap_or(u32::MAX);
                let last_session_at = sessions.map(|s| s.timestamp).max();
                let mut tally = ScoreTally::default();
                for q in guard
                    .questions
                    .iter()
                    .filter(|q| q.student_id == *student.id())
                {
                    tally.record(q.is_correct());
                }
                (
                    *row,
                    StudentActivity {
                        student: student.clone(),
                        total_sessions,
                        last_session_at,
                        tally,
                    },
                )
            })
            .collect();
        rows.sort_by(|(ra, a), (rb, b)| {
            b.student
                .created_at()
                .cmp(&a.student.created_at())
                .then(rb.cmp(ra))
        });
        Ok(rows.into_iter().map(|(_, activity)| activity).collect())
    }
}

#[async_trait]
impl LearningSessionRepository for InMemoryRepository {
    async fn append_session(
        &self,
        session: &NewLearningSession,
    ) -> Result<LearningSession, StorageError> {
        let mut guard = self.lock()?;
        guard.require_student(&session.student_id)?;
        let id = LearningSessionId::new(guard.next_id());
        let stored = session.clone().into_session(id);
        guard.learning.push(stored.clone());
        Ok(stored)
    }

    async fn list_sessions(
        &self,
        filter: &LearningSessionFilter,
    ) -> Result<Vec<LearningSession>, StorageError> {
        let guard = self.lock()?;
        let mut sessions: Vec<LearningSession> = guard
            .learning
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        if let Some(limit) = filter.limit {
            sessions.truncate(limit as usize);
        }
        Ok(sessions)
    }
}

#[async_trait]
impl AssessmentQuestionRepository for InMemoryRepository {
    async fn append_question(
        &self,
        question: &NewAssessmentQuestion,
    ) -> Result<AssessmentQuestion, StorageError> {
        let mut guard = self.lock()?;
        guard.require_student(&question.student_id)?;
        let id = QuestionId::new(guard.next_id());
        let stored = question.clone().into_question(id);
        guard.questions.push(stored.clone());
        Ok(stored)
    }

    async fn list_questions(
        &self,
        filter: &QuestionFilter,
    ) -> Result<Vec<AssessmentQuestion>, StorageError> {
        let guard = self.lock()?;
        let mut questions: Vec<AssessmentQuestion> = guard
            .questions
            .iter()
            .filter(|q| filter.matches(q))
            .cloned()
            .collect();
        questions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        if let Some(limit) = filter.limit {
            questions.truncate(limit as usize);
        }
        Ok(questions)
    }

    async fn daily_tallies(
        &self,
        student_id: Option<&StudentId>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<DailyTally>, StorageError> {
        let guard = self.lock()?;
        let rows = guard
            .questions
            .iter()
            .filter(|q| student_id.is_none_or(|id| *id == q.student_id))
            .filter(|q| since.is_none_or(|since| q.timestamp >= since))
            .map(|q| (q.student_id.clone(), q.timestamp, q.is_correct()));
        Ok(fold_daily_tallies(rows))
    }

    async fn session_tally(
        &self,
        session_id: AssessmentSessionId,
    ) -> Result<ScoreTally, StorageError> {
        let guard = self.lock()?;
        let mut tally = ScoreTally::default();
        for q in guard
            .questions
            .iter()
            .filter(|q| q.session_id == Some(session_id))
        {
            tally.record(q.is_correct());
        }
        Ok(tally)
    }
}

#[async_trait]
impl AssessmentSessionRepository for InMemoryRepository {
    async fn start_session(
        &self,
        student_id: &StudentId,
        started_at: DateTime<Utc>,
    ) -> Result<AssessmentSession, StorageError> {
        let mut guard = self.lock()?;
        guard.require_student(student_id)?;
        if guard
            .markers
            .iter()
            .any(|m| m.student_id == *student_id && m.is_active())
        {
            return Err(StorageError::Conflict);
        }
        let session = AssessmentSession {
            id: AssessmentSessionId::new(guard.next_id()),
            student_id: student_id.clone(),
            status: AssessmentStatus::Active,
            started_at,
            ended_at: None,
        };
        guard.markers.push(session.clone());
        Ok(session)
    }

    async fn active_session(
        &self,
        student_id: &StudentId,
    ) -> Result<Option<AssessmentSession>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .markers
            .iter()
            .find(|m| m.student_id == *student_id && m.is_active())
            .cloned())
    }

    async fn finish_session(
        &self,
        student_id: &StudentId,
        status: AssessmentStatus,
        ended_at: DateTime<Utc>,
    ) -> Result<AssessmentSession, StorageError> {
        let mut guard = self.lock()?;
        let marker = guard
            .markers
            .iter_mut()
            .find(|m| m.student_id == *student_id && m.is_active())
            .ok_or(StorageError::NotFound)?;
        marker.status = status;
        marker.ended_at = Some(ended_at);
        Ok(marker.clone())
    }

    async fn latest_completed(
        &self,
        student_id: &StudentId,
    ) -> Result<Option<AssessmentSession>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .markers
            .iter()
            .filter(|m| m.student_id == *student_id && m.status == AssessmentStatus::Completed)
            .max_by(|a, b| a.ended_at.cmp(&b.ended_at).then(a.id.cmp(&b.id)))
            .cloned())
    }

    async fn latest_active(&self) -> Result<Option<ActiveAssessment>, StorageError> {
        let guard = self.lock()?;
        let Some(session) = guard
            .markers
            .iter()
            .filter(|m| m.is_active())
            .max_by(|a, b| a.started_at.cmp(&b.started_at).then(a.id.cmp(&b.id)))
        else {
            return Ok(None);
        };
        let Some((_, student)) = guard.students.get(&session.student_id) else {
            return Ok(None);
        };
        Ok(Some(ActiveAssessment {
            session: session.clone(),
            first_name: student.first_name().to_owned(),
            last_name: student.last_name().to_owned(),
        }))
    }
}

#[async_trait]
impl SchemaRepository for InMemoryRepository {
    async fn schema_status(&self) -> Result<SchemaStatus, StorageError> {
        Ok(SchemaStatus {
            students: true,
            learning_sessions: true,
            assessment_sessions: true,
            active_sessions: true,
        })
    }

    async fn ensure_schema(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub students: Arc<dyn StudentRepository>,
    pub learning_sessions: Arc<dyn LearningSessionRepository>,
    pub questions: Arc<dyn AssessmentQuestionRepository>,
    pub assessments: Arc<dyn AssessmentSessionRepository>,
    pub schema: Arc<dyn SchemaRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self::from_repository(repo)
    }

    pub(crate) fn from_repository<R>(repo: R) -> Self
    where
        R: StudentRepository
            + LearningSessionRepository
            + AssessmentQuestionRepository
            + AssessmentSessionRepository
            + SchemaRepository
            + Clone
            + 'static,
    {
        let students: Arc<dyn StudentRepository> = Arc::new(repo.clone());
        let learning_sessions: Arc<dyn LearningSessionRepository> = Arc::new(repo.clone());
        let questions: Arc<dyn AssessmentQuestionRepository> = Arc::new(repo.clone());
        let assessments: Arc<dyn AssessmentSessionRepository> = Arc::new(repo.clone());
        let schema: Arc<dyn SchemaRepository> = Arc::new(repo);
        Self {
            students,
            learning_sessions,
            questions,
            assessments,
            schema,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tactile_core::model::StudentProfile;
    use tactile_core::time::fixed_now;

    fn student(id: &str) -> Student {
        Student::new(
            StudentId::parse(id).unwrap(),
            StudentProfile::new("Ana", "Lee"),
            fixed_now(),
        )
        .unwrap()
    }

    fn sid(id: &str) -> StudentId {
        StudentId::parse(id).unwrap()
    }

    #[tokio::test]
    async fn duplicate_student_is_a_conflict() {
        let repo = InMemoryRepository::new();
        repo.insert_student(&student("STU1")).await.unwrap();
        let err = repo.insert_student(&student("STU1")).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn second_active_marker_is_rejected() {
        let repo = InMemoryRepository::new();
        repo.insert_student(&student("STU1")).await.unwrap();
        repo.start_session(&sid("STU1"), fixed_now()).await.unwrap();
        let err = repo
            .start_session(&sid("STU1"), fixed_now())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));

        repo.finish_session(&sid("STU1"), AssessmentStatus::Cancelled, fixed_now())
            .await
            .unwrap();
        assert!(repo.active_session(&sid("STU1")).await.unwrap().is_none());
        repo.start_session(&sid("STU1"), fixed_now()).await.unwrap();
    }

    #[tokio::test]
    async fn sessions_for_unknown_student_are_rejected() {
        let repo = InMemoryRepository::new();
        let draft = NewLearningSession::new(sid("GHOST"), Shape::Circle, "Round.", fixed_now())
            .unwrap();
        let err = repo.append_session(&draft).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn delete_cascades_to_dependent_rows() {
        let repo = InMemoryRepository::new();
        repo.insert_student(&student("STU1")).await.unwrap();
        repo.insert_student(&student("STU2")).await.unwrap();
        for id in ["STU1", "STU2"] {
            let draft =
                NewLearningSession::new(sid(id), Shape::Circle, "Round.", fixed_now()).unwrap();
            repo.append_session(&draft).await.unwrap();
            let q = NewAssessmentQuestion::new(sid(id), "Shape?", "circle", "Correct", fixed_now())
                .unwrap();
            repo.append_question(&q).await.unwrap();
            repo.start_session(&sid(id), fixed_now()).await.unwrap();
        }

        repo.delete_student(&sid("STU1")).await.unwrap();

        let all = repo
            .list_sessions(&LearningSessionFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].student_id, sid("STU2"));
        assert!(repo.active_session(&sid("STU1")).await.unwrap().is_none());
        assert!(
            repo.daily_tallies(Some(&sid("STU1")), None)
                .await
                .unwrap()
                .is_empty()
        );
        assert!(matches!(
            repo.delete_student(&sid("STU1")).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn list_sessions_filters_and_orders_newest_first() {
        let repo = InMemoryRepository::new();
        repo.insert_student(&student("STU1")).await.unwrap();
        for (offset, shape) in [(0, Shape::Circle), (1, Shape::Square), (2, Shape::Circle)] {
            let draft = NewLearningSession::new(
                sid("STU1"),
                shape,
                "Explained.",
                fixed_now() + Duration::minutes(offset),
            )
            .unwrap();
            repo.append_session(&draft).await.unwrap();
        }

        let filter = LearningSessionFilter {
            shape: Some(Shape::Circle),
            ..LearningSessionFilter::for_student(sid("STU1"))
        };
        let circles = repo.list_sessions(&filter).await.unwrap();
        assert_eq!(circles.len(), 2);
        assert!(circles[0].timestamp > circles[1].timestamp);

        let one = repo.list_sessions(&filter.with_limit(1)).await.unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].timestamp, fixed_now() + Duration::minutes(2));
    }

    #[test]
    fn daily_tallies_group_by_student_and_day() {
        let now = fixed_now();
        let tallies = fold_daily_tallies([
            (sid("STU1"), now, true),
            (sid("STU1"), now + Duration::minutes(5), false),
            (sid("STU1"), now + Duration::days(1), true),
            (sid("STU2"), now, false),
        ]);
        assert_eq!(tallies.len(), 3);
        assert_eq!(tallies[0].tally, ScoreTally::new(2, 1));
        assert_eq!(tallies[1].day, (now + Duration::days(1)).date_naive());
        assert_eq!(tallies[2].student_id, sid("STU2"));
    }
}
