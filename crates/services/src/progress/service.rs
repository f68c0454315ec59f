use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use storage::repository::{
    AssessmentQuestionRepository, LearningSessionFilter, LearningSessionRepository,
    StudentRepository,
};
use tactile_core::model::{Shape, StudentId};
use tactile_core::time::DayWindow;
use tracing::warn;

use super::engine::{
    self, SessionSummary, ShapeBreakdown, StudentListItem, StudentMetrics, StudentSort,
    TallyIndex,
};
use super::report::{self, OverviewReport, ReportPeriod};
use crate::Clock;
use crate::error::ProgressError;
use crate::student_service::StudentView;

/// Default page size of session listings.
pub const DEFAULT_SESSION_LIMIT: u32 = 50;
/// Upper bound on a session listing page.
pub const MAX_SESSION_LIMIT: u32 = 500;
/// Number of sessions embedded in a student detail.
pub const RECENT_SESSIONS: u32 = 10;

/// Filter accepted by [`ProgressService::list_sessions`], still unparsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionQuery {
    pub student_id: Option<String>,
    pub shape: Option<String>,
    pub limit: Option<u32>,
}

/// Profile, standing, shape breakdown and latest sessions of one student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentDetail {
    #[serde(flatten)]
    pub student: StudentView,
    #[serde(flatten)]
    pub metrics: StudentMetrics,
    pub shape_progress: ShapeBreakdown,
    pub recent_sessions: Vec<SessionSummary>,
}

/// Aggregation engine: recomputes every statistic from the raw tables on read.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    students: Arc<dyn StudentRepository>,
    learning: Arc<dyn LearningSessionRepository>,
    questions: Arc<dyn AssessmentQuestionRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        students: Arc<dyn StudentRepository>,
        learning: Arc<dyn LearningSessionRepository>,
        questions: Arc<dyn AssessmentQuestionRepository>,
    ) -> Self {
        Self {
            clock,
            students,
            learning,
            questions,
        }
    }

    /// Learning sessions of one student, newest first, each with the accuracy
    /// of the answers given that day.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidStudent` for a malformed id.
    pub async fn student_summary(
        &self,
        raw_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<SessionSummary>, ProgressError> {
        let id = StudentId::parse(raw_id)?;
        let mut filter = LearningSessionFilter::for_student(id.clone());
        filter.limit = limit;
        let sessions = self.learning.list_sessions(&filter).await?;
        let tallies = self.tallies_or_empty(Some(&id), None).await;
        Ok(engine::summarize(sessions, &tallies))
    }

    /// Overall score and status of one student. Unknown ids yield zeros.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidStudent` for a malformed id.
    pub async fn student_status(&self, raw_id: &str) -> Result<StudentMetrics, ProgressError> {
        let id = StudentId::parse(raw_id)?;
        let sessions = self
            .learning
            .list_sessions(&LearningSessionFilter::for_student(id.clone()))
            .await?;
        let tallies = self.tallies_or_empty(Some(&id), None).await;
        Ok(metrics_for(&id, sessions.len(), sessions.first().map(|s| s.timestamp), &tallies))
    }

    /// One entry per shape for the student; zeros when nothing was recorded.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidStudent` for a malformed id.
    pub async fn shape_progress(&self, raw_id: &str) -> Result<ShapeBreakdown, ProgressError> {
        let summaries = self.student_summary(raw_id, None).await?;
        Ok(ShapeBreakdown::from_summaries(&summaries))
    }

    /// Every student with their dashboard metrics.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidSort` for an unknown order.
    pub async fn list_students(&self, sort: &str) -> Result<Vec<StudentListItem>, ProgressError> {
        let sort: StudentSort = sort
            .parse()
            .map_err(ProgressError::InvalidSort)?;
        let mut items: Vec<StudentListItem> = self
            .students
            .list_student_activity()
            .await?
            .into_iter()
            .map(StudentListItem::from)
            .collect();
        engine::sort_students(&mut items, sort);
        Ok(items)
    }

    /// # Errors
    ///
    /// Returns `ProgressError::StudentNotFound` if the student does not exist.
    pub async fn student_detail(&self, raw_id: &str) -> Result<StudentDetail, ProgressError> {
        let id = StudentId::parse(raw_id)?;
        let student = self
            .students
            .get_student(&id)
            .await?
            .ok_or_else(|| ProgressError::StudentNotFound(id.clone()))?;

        let sessions = self
            .learning
            .list_sessions(&LearningSessionFilter::for_student(id.clone()))
            .await?;
        let tallies = self.tallies_or_empty(Some(&id), None).await;
        let metrics = metrics_for(
            &id,
            sessions.len(),
            sessions.first().map(|s| s.timestamp),
            &tallies,
        );
        let summaries = engine::summarize(sessions, &tallies);
        let shape_progress = ShapeBreakdown::from_summaries(&summaries);
        let recent_sessions = summaries
            .into_iter()
            .take(RECENT_SESSIONS as usize)
            .collect();

        Ok(StudentDetail {
            student: StudentView::from(&student),
            metrics,
            shape_progress,
            recent_sessions,
        })
    }

    /// Learning sessions across students, newest first.
    ///
    /// `limit` defaults to 50 and is clamped to `1..=500`.
    ///
    /// # Errors
    ///
    /// Returns a validation variant for a malformed id or unknown shape.
    pub async fn list_sessions(
        &self,
        query: SessionQuery,
    ) -> Result<Vec<SessionSummary>, ProgressError> {
        let student_id = query
            .student_id
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(StudentId::parse)
            .transpose()?;
        let shape = query
            .shape
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<Shape>)
            .transpose()?;
        let filter = LearningSessionFilter {
            student_id,
            shape,
            since: None,
            limit: Some(clamp_limit(query.limit)),
        };
        let sessions = self.learning.list_sessions(&filter).await?;
        let Some(oldest) = sessions.iter().map(|s| s.timestamp).min() else {
            return Ok(Vec::new());
        };
        let tallies = self
            .tallies_or_empty(filter.student_id.as_ref(), Some(day_start(oldest)))
            .await;
        Ok(engine::summarize(sessions, &tallies))
    }

    /// Cohort-wide figures for the reports page.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidPeriod` for an unknown period.
    pub async fn overview_report(&self, period: &str) -> Result<OverviewReport, ProgressError> {
        let period: ReportPeriod = period.parse().map_err(ProgressError::InvalidPeriod)?;
        let since = period.since(self.clock.now());

        let students: Vec<StudentListItem> = self
            .students
            .list_student_activity()
            .await?
            .into_iter()
            .map(StudentListItem::from)
            .collect();
        let sessions = self
            .learning
            .list_sessions(&LearningSessionFilter::default().since(since))
            .await?;
        // Sessions join whole days, so the first day is tallied from midnight.
        let tallies = self.tallies_or_empty(None, Some(day_start(since))).await;
        let summaries = engine::summarize(sessions, &tallies);

        let student_performance =
            report::student_performance(&students, &summaries, |id| tallies.for_student(id));
        Ok(OverviewReport {
            period,
            since,
            total_students: count_u32(students.len()),
            active_students: count_u32(student_performance.len()),
            total_sessions: count_u32(summaries.len()),
            average_score: tallies.overall().accuracy(),
            shape_analytics: engine::shape_analytics(&summaries),
            student_performance,
        })
    }

    async fn tallies_or_empty(
        &self,
        student_id: Option<&StudentId>,
        since: Option<DateTime<Utc>>,
    ) -> TallyIndex {
        match self.questions.daily_tallies(student_id, since).await {
            Ok(tallies) => TallyIndex::new(tallies),
            Err(err) => {
                warn!(
                    student_id = student_id.map(StudentId::as_str),
                    error = %err,
                    "answer tallies unavailable; reporting zero accuracy"
                );
                TallyIndex::default()
            }
        }
    }
}

fn metrics_for(
    id: &StudentId,
    total_sessions: usize,
    last_session_date: Option<DateTime<Utc>>,
    tallies: &TallyIndex,
) -> StudentMetrics {
    StudentMetrics::new(
        count_u32(total_sessions),
        last_session_date,
        tallies.for_student(id),
    )
}

fn day_start(at: DateTime<Utc>) -> DateTime<Utc> {
    DayWindow::for_date(at.date_naive()).start
}

fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn clamp_limit(limit: Option<u32>) -> u32 {
    limit
        .unwrap_or(DEFAULT_SESSION_LIMIT)
        .clamp(1, MAX_SESSION_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(clamp_limit(None), 50);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(10_000)), 500);
        assert_eq!(clamp_limit(Some(7)), 7);
    }
}
