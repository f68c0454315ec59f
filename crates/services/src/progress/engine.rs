//! Pure joins from raw rows to dashboard statistics.
//!
//! Nothing here touches storage; the service feeds it rows and tallies so the
//! arithmetic can be tested on plain values.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use storage::repository::{DailyTally, StudentActivity};
use tactile_core::model::{LearningSession, LearningSessionId, Shape, StudentId};
use tactile_core::stats::{Difficulty, ScoreTally, StudentStatus, mean_percent};

/// Answer tallies keyed by student and UTC day.
#[derive(Debug, Clone, Default)]
pub struct TallyIndex(HashMap<StudentId, BTreeMap<NaiveDate, ScoreTally>>);

impl TallyIndex {
    #[must_use]
    pub fn new(tallies: Vec<DailyTally>) -> Self {
        let mut index: HashMap<StudentId, BTreeMap<NaiveDate, ScoreTally>> = HashMap::new();
        for t in tallies {
            index
                .entry(t.student_id)
                .or_default()
                .entry(t.day)
                .or_default()
                .merge(t.tally);
        }
        Self(index)
    }

    /// Tally for one student on one day; zero when nothing was recorded.
    #[must_use]
    pub fn on_day(&self, student_id: &StudentId, day: NaiveDate) -> ScoreTally {
        self.0
            .get(student_id)
            .and_then(|days| days.get(&day))
            .copied()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn for_student(&self, student_id: &StudentId) -> ScoreTally {
        let mut total = ScoreTally::default();
        if let Some(days) = self.0.get(student_id) {
            for tally in days.values() {
                total.merge(*tally);
            }
        }
        total
    }

    #[must_use]
    pub fn overall(&self) -> ScoreTally {
        let mut total = ScoreTally::default();
        for tally in self.0.values().flat_map(BTreeMap::values) {
            total.merge(*tally);
        }
        total
    }
}

/// A learning session joined with the answers its student gave that day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub id: LearningSessionId,
    pub student_id: StudentId,
    pub shape: Shape,
    pub explanation: String,
    pub timestamp: DateTime<Utc>,
    pub questions_asked: u32,
    pub correct_answers: u32,
    pub accuracy: u8,
}

/// Join each session with the same-day tally of its student.
#[must_use]
pub fn summarize(sessions: Vec<LearningSession>, tallies: &TallyIndex) -> Vec<SessionSummary> {
    sessions
        .into_iter()
        .map(|s| {
            let tally = tallies.on_day(&s.student_id, s.timestamp.date_naive());
            SessionSummary {
                id: s.id,
                student_id: s.student_id,
                shape: s.shape,
                explanation: s.explanation,
                timestamp: s.timestamp,
                questions_asked: tally.asked,
                correct_answers: tally.correct,
                accuracy: tally.accuracy(),
            }
        })
        .collect()
}

/// Per-shape learning progress of one student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShapeProgress {
    pub shape: Shape,
    pub sessions: u32,
    /// Mean of per-session accuracy.
    pub progress: u8,
    /// Pooled accuracy over every answer counted for those sessions.
    pub accuracy: u8,
}

/// Exactly one entry per shape, in `Shape::ALL` order.
#[must_use]
pub fn shape_progress(summaries: &[SessionSummary]) -> Vec<ShapeProgress> {
    Shape::ALL
        .into_iter()
        .map(|shape| {
            let of_shape: Vec<&SessionSummary> =
                summaries.iter().filter(|s| s.shape == shape).collect();
            let mut pooled = ScoreTally::default();
            for s in &of_shape {
                pooled.merge(ScoreTally::new(s.questions_asked, s.correct_answers));
            }
            ShapeProgress {
                shape,
                sessions: u32::try_from(of_shape.len()).unwrap_or(u32::MAX),
                progress: mean_percent(of_shape.iter().map(|s| s.accuracy)),
                accuracy: pooled.accuracy(),
            }
        })
        .collect()
}

/// Shape progress keyed by shape name when serialized, in `Shape::ALL` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeBreakdown(Vec<ShapeProgress>);

impl ShapeBreakdown {
    #[must_use]
    pub fn from_summaries(summaries: &[SessionSummary]) -> Self {
        Self(shape_progress(summaries))
    }

    #[must_use]
    pub fn as_slice(&self) -> &[ShapeProgress] {
        &self.0
    }

    #[must_use]
    pub fn get(&self, shape: Shape) -> Option<&ShapeProgress> {
        self.0.iter().find(|p| p.shape == shape)
    }
}

impl Serialize for ShapeBreakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for entry in &self.0 {
            map.serialize_entry(entry.shape.as_str(), entry)?;
        }
        map.end()
    }
}

/// Overall standing of one student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StudentMetrics {
    pub total_sessions: u32,
    pub questions_asked: u32,
    pub correct_answers: u32,
    pub average_score: u8,
    pub status: StudentStatus,
    pub last_session_date: Option<DateTime<Utc>>,
}

impl StudentMetrics {
    #[must_use]
    pub fn new(
        total_sessions: u32,
        last_session_date: Option<DateTime<Utc>>,
        tally: ScoreTally,
    ) -> Self {
        let average_score = tally.accuracy();
        Self {
            total_sessions,
            questions_asked: tally.asked,
            correct_answers: tally.correct,
            average_score,
            status: StudentStatus::from_score(average_score),
            last_session_date,
        }
    }
}

/// Ordering of the student list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StudentSort {
    /// Most recently registered first.
    #[default]
    Newest,
    Oldest,
    /// Alphabetical by first then last name, case-insensitive.
    Name,
    /// Highest average score first.
    Score,
}

impl std::str::FromStr for StudentSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            "name" => Ok(Self::Name),
            "score" => Ok(Self::Score),
            _ => Err(s.to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentListItem {
    pub student_id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub metrics: StudentMetrics,
}

impl From<StudentActivity> for StudentListItem {
    fn from(a: StudentActivity) -> Self {
        let p = a.student.profile();
        Self {
            student_id: a.student.id().clone(),
            first_name: p.first_name.clone(),
            last_name: p.last_name.clone(),
            email: p.email.clone(),
            created_at: a.student.created_at(),
            metrics: StudentMetrics::new(a.total_sessions, a.last_session_at, a.tally),
        }
    }
}

fn name_key(item: &StudentListItem) -> (String, String) {
    (
        item.first_name.to_lowercase(),
        item.last_name.to_lowercase(),
    )
}

/// Sort in place. Ties fall back to the student id so output is stable.
pub fn sort_students(items: &mut [StudentListItem], sort: StudentSort) {
    match sort {
        StudentSort::Newest => items.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.student_id.cmp(&b.student_id))
        }),
        StudentSort::Oldest => items.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.student_id.cmp(&b.student_id))
        }),
        StudentSort::Name => items.sort_by(|a, b| {
            name_key(a)
                .cmp(&name_key(b))
                .then_with(|| a.student_id.cmp(&b.student_id))
        }),
        StudentSort::Score => items.sort_by(|a, b| {
            b.metrics
                .average_score
                .cmp(&a.metrics.average_score)
                .then_with(|| name_key(a).cmp(&name_key(b)))
                .then_with(|| a.student_id.cmp(&b.student_id))
        }),
    }
}

/// Per-shape totals across every student for the report page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShapeAnalytics {
    pub shape: Shape,
    pub total_interactions: u32,
    pub avg_score: u8,
    pub difficulty: Difficulty,
}

#[must_use]
pub fn shape_analytics(summaries: &[SessionSummary]) -> Vec<ShapeAnalytics> {
    Shape::ALL
        .into_iter()
        .map(|shape| {
            let scores: Vec<u8> = summaries
                .iter()
                .filter(|s| s.shape == shape)
                .map(|s| s.accuracy)
                .collect();
            let avg_score = mean_percent(scores.iter().copied());
            ShapeAnalytics {
                shape,
                total_interactions: u32::try_from(scores.len()).unwrap_or(u32::MAX),
                avg_score,
                difficulty: Difficulty::from_score(avg_score),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tactile_core::model::{Student, StudentProfile};
    use tactile_core::time::fixed_now;

    fn sid(id: &str) -> StudentId {
        StudentId::parse(id).unwrap()
    }

    fn session(id: i64, student: &str, shape: Shape, at: DateTime<Utc>) -> LearningSession {
        LearningSession {
            id: LearningSessionId::new(id),
            student_id: sid(student),
            shape,
            explanation: "Explained.".into(),
            timestamp: at,
        }
    }

    fn tally(student: &str, day: NaiveDate, asked: u32, correct: u32) -> DailyTally {
        DailyTally {
            student_id: sid(student),
            day,
            tally: ScoreTally::new(asked, correct),
        }
    }

    #[test]
    fn sessions_take_same_day_tally_of_their_student() {
        let today = fixed_now().date_naive();
        let index = TallyIndex::new(vec![
            tally("STU1", today, 3, 2),
            tally("STU2", today, 4, 4),
        ]);
        let summaries = summarize(
            vec![
                session(1, "STU1", Shape::Circle, fixed_now()),
                session(2, "STU1", Shape::Square, fixed_now() + Duration::days(1)),
            ],
            &index,
        );
        assert_eq!(summaries[0].questions_asked, 3);
        assert_eq!(summaries[0].correct_answers, 2);
        assert_eq!(summaries[0].accuracy, 67);
        assert_eq!(summaries[1].questions_asked, 0);
        assert_eq!(summaries[1].accuracy, 0);
    }

    #[test]
    fn shape_progress_always_has_every_shape() {
        let progress = shape_progress(&[]);
        assert_eq!(progress.len(), Shape::ALL.len());
        for (entry, shape) in progress.iter().zip(Shape::ALL) {
            assert_eq!(entry.shape, shape);
            assert_eq!(entry.sessions, 0);
            assert_eq!(entry.progress, 0);
            assert_eq!(entry.accuracy, 0);
        }
    }

    #[test]
    fn shape_progress_separates_mean_and_pooled_accuracy() {
        let today = fixed_now().date_naive();
        let tomorrow = today + Duration::days(1);
        let index = TallyIndex::new(vec![
            tally("STU1", today, 1, 1),
            tally("STU1", tomorrow, 3, 0),
        ]);
        let summaries = summarize(
            vec![
                session(1, "STU1", Shape::Triangle, fixed_now()),
                session(2, "STU1", Shape::Triangle, fixed_now() + Duration::days(1)),
            ],
            &index,
        );
        let triangle = shape_progress(&summaries)
            .into_iter()
            .find(|p| p.shape == Shape::Triangle)
            .unwrap();
        assert_eq!(triangle.sessions, 2);
        // (100 + 0) / 2
        assert_eq!(triangle.progress, 50);
        // 1 of 4
        assert_eq!(triangle.accuracy, 25);
    }

    #[test]
    fn breakdown_serializes_one_key_per_shape() {
        let json = serde_json::to_value(ShapeBreakdown::from_summaries(&[])).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 4);
        for shape in Shape::ALL {
            assert_eq!(json[shape.as_str()]["sessions"], 0);
            assert_eq!(json[shape.as_str()]["progress"], 0);
        }
    }

    #[test]
    fn two_of_three_needs_attention() {
        let metrics = StudentMetrics::new(1, Some(fixed_now()), ScoreTally::new(3, 2));
        assert_eq!(metrics.average_score, 67);
        assert_eq!(metrics.status, StudentStatus::NeedsAttention);

        let none = StudentMetrics::new(0, None, ScoreTally::default());
        assert_eq!(none.average_score, 0);
    }

    #[test]
    fn sort_orders() {
        let make = |id: &str, first: &str, offset: i64, score: (u32, u32)| {
            let student = Student::new(
                sid(id),
                StudentProfile::new(first, "Lee"),
                fixed_now() + Duration::days(offset),
            )
            .unwrap();
            StudentListItem::from(StudentActivity {
                student,
                total_sessions: 0,
                last_session_at: None,
                tally: ScoreTally::new(score.0, score.1),
            })
        };
        let mut items = vec![
            make("STU1", "cara", 0, (2, 1)),
            make("STU2", "Ana", 2, (1, 1)),
            make("STU3", "Ben", 1, (4, 0)),
        ];

        sort_students(&mut items, StudentSort::Newest);
        let ids: Vec<&str> = items.iter().map(|i| i.student_id.as_str()).collect();
        assert_eq!(ids, ["STU2", "STU3", "STU1"]);

        sort_students(&mut items, StudentSort::Oldest);
        assert_eq!(items[0].student_id.as_str(), "STU1");

        sort_students(&mut items, StudentSort::Name);
        let names: Vec<&str> = items.iter().map(|i| i.first_name.as_str()).collect();
        assert_eq!(names, ["Ana", "Ben", "cara"]);

        sort_students(&mut items, StudentSort::Score);
        let scores: Vec<u8> = items.iter().map(|i| i.metrics.average_score).collect();
        assert_eq!(scores, [100, 50, 0]);
    }

    #[test]
    fn sort_parses_known_orders_only() {
        assert_eq!("".parse::<StudentSort>(), Ok(StudentSort::Newest));
        assert_eq!("Score".parse::<StudentSort>(), Ok(StudentSort::Score));
        assert!("random".parse::<StudentSort>().is_err());
    }

    #[test]
    fn shape_analytics_bands_difficulty() {
        let today = fixed_now().date_naive();
        let index = TallyIndex::new(vec![tally("STU1", today, 4, 3)]);
        let summaries = summarize(vec![session(1, "STU1", Shape::Circle, fixed_now())], &index);
        let analytics = shape_analytics(&summaries);
        assert_eq!(analytics[0].total_interactions, 1);
        assert_eq!(analytics[0].avg_score, 75);
        assert_eq!(analytics[0].difficulty, Difficulty::Medium);
        assert_eq!(analytics[1].total_interactions, 0);
        assert_eq!(analytics[1].difficulty, Difficulty::Hard);
    }
}
