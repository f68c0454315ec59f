use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tactile_core::model::StudentId;
use tactile_core::stats::ScoreTally;

use super::engine::{SessionSummary, ShapeAnalytics, StudentListItem};

/// Look-back window of the overview report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    Week,
    #[default]
    Month,
    Quarter,
    Year,
}

impl ReportPeriod {
    #[must_use]
    pub fn days(&self) -> i64 {
        match self {
            Self::Week => 7,
            Self::Month => 30,
            Self::Quarter => 90,
            Self::Year => 365,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::Quarter => "quarter",
            Self::Year => "year",
        }
    }

    /// Start of the window ending at `now`.
    #[must_use]
    pub fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.days())
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "week" => Ok(Self::Week),
            "" | "month" => Ok(Self::Month),
            "quarter" => Ok(Self::Quarter),
            "year" => Ok(Self::Year),
            _ => Err(s.to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentPerformance {
    pub student_id: StudentId,
    pub student_name: String,
    pub sessions: u32,
    pub avg_score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverviewReport {
    pub period: ReportPeriod,
    pub since: DateTime<Utc>,
    pub total_students: u32,
    pub active_students: u32,
    pub total_sessions: u32,
    pub average_score: u8,
    pub shape_analytics: Vec<ShapeAnalytics>,
    pub student_performance: Vec<StudentPerformance>,
}

/// Students with at least one session in the window, best score first.
pub(crate) fn student_performance(
    students: &[StudentListItem],
    summaries: &[SessionSummary],
    window_tally: impl Fn(&StudentId) -> ScoreTally,
) -> Vec<StudentPerformance> {
    let mut sessions: HashMap<&StudentId, u32> = HashMap::new();
    for s in summaries {
        *sessions.entry(&s.student_id).or_default() += 1;
    }

    let mut rows: Vec<StudentPerformance> = students
        .iter()
        .filter_map(|student| {
            let count = *sessions.get(&student.student_id)?;
            Some(StudentPerformance {
                student_id: student.student_id.clone(),
                student_name: format!("{} {}", student.first_name, student.last_name),
                sessions: count,
                avg_score: window_tally(&student.student_id).accuracy(),
            })
        })
        .collect();
    rows.sort_by(|a, b| {
        b.avg_score
            .cmp(&a.avg_score)
            .then_with(|| b.sessions.cmp(&a.sessions))
            .then_with(|| a.student_id.cmp(&b.student_id))
    });
    rows
}
