//! Pure scoring arithmetic shared by the aggregation layer.
//!
//! Every percentage leaves this module already rounded to the nearest integer
//! and clamped to `0..=100`. Empty denominators produce `0`.

use std::fmt;

use serde::Serialize;

/// Score at or above which a student is classified as excellent.
pub const EXCELLENT_THRESHOLD: u8 = 90;
/// Score at or above which a student is classified as active.
pub const ACTIVE_THRESHOLD: u8 = 70;

/// Rounded `correct / asked * 100`, or `0` when nothing was asked.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn accuracy_percent(correct: u32, asked: u32) -> u8 {
    if asked == 0 {
        return 0;
    }
    let ratio = f64::from(correct.min(asked)) / f64::from(asked);
    (ratio * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Rounded arithmetic mean of a set of percentages, `0` for an empty set.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn mean_percent<I>(values: I) -> u8
where
    I: IntoIterator<Item = u8>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0_u64, 0_u64), |(sum, count), v| (sum + u64::from(v), count + 1));
    if count == 0 {
        return 0;
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = sum as f64 / count as f64;
    mean.round().clamp(0.0, 100.0) as u8
}

/// Running count of scored assessment answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreTally {
    pub asked: u32,
    pub correct: u32,
}

impl ScoreTally {
    #[must_use]
    pub fn new(asked: u32, correct: u32) -> Self {
        Self { asked, correct }
    }

    pub fn record(&mut self, is_correct: bool) {
        self.asked = self.asked.saturating_add(1);
        if is_correct {
            self.correct = self.correct.saturating_add(1);
        }
    }

    pub fn merge(&mut self, other: ScoreTally) {
        self.asked = self.asked.saturating_add(other.asked);
        self.correct = self.correct.saturating_add(other.correct);
    }

    #[must_use]
    pub fn accuracy(&self) -> u8 {
        accuracy_percent(self.correct, self.asked)
    }
}

/// Dashboard classification of a student's overall assessment score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentStatus {
    Excellent,
    Active,
    NeedsAttention,
}

impl StudentStatus {
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        if score >= EXCELLENT_THRESHOLD {
            Self::Excellent
        } else if score >= ACTIVE_THRESHOLD {
            Self::Active
        } else {
            Self::NeedsAttention
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Active => "active",
            Self::NeedsAttention => "needs_attention",
        }
    }
}

impl fmt::Display for StudentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How hard a shape is across the whole cohort, judged by its average score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => Self::Easy,
            70..=79 => Self::Medium,
            _ => Self::Hard,
        }
    }
}
