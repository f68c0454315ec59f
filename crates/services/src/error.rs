//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use tactile_core::model::{
    AssessmentQuestionError, LearningSessionError, ShapeError, StudentError, StudentId,
};

/// Coarse classification the transport layer maps onto status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed or missing input. Never retried.
    Validation,
    NotFound,
    /// The request conflicts with current state.
    Conflict,
    /// The store stayed unreachable after the adapter's retry.
    Unavailable,
    Internal,
}

fn storage_category(err: &StorageError) -> ErrorCategory {
    match err {
        StorageError::NotFound => ErrorCategory::NotFound,
        StorageError::Conflict => ErrorCategory::Conflict,
        StorageError::Unavailable(_) => ErrorCategory::Unavailable,
        _ => ErrorCategory::Internal,
    }
}

/// Errors emitted by `StudentService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StudentServiceError {
    #[error(transparent)]
    Invalid(#[from] StudentError),
    #[error("student {0} already exists")]
    AlreadyExists(StudentId),
    #[error("student {0} not found")]
    NotFound(StudentId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl StudentServiceError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Invalid(_) => ErrorCategory::Validation,
            Self::AlreadyExists(_) => ErrorCategory::Conflict,
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::Storage(e) => storage_category(e),
        }
    }
}

/// Errors emitted by `LearningService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LearningServiceError {
    #[error(transparent)]
    InvalidStudent(#[from] StudentError),
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error(transparent)]
    Session(#[from] LearningSessionError),
    #[error("student {0} not found")]
    StudentNotFound(StudentId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl LearningServiceError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidStudent(_) | Self::Shape(_) | Self::Session(_) => {
                ErrorCategory::Validation
            }
            Self::StudentNotFound(_) => ErrorCategory::NotFound,
            Self::Storage(e) => storage_category(e),
        }
    }
}

/// Errors emitted by the assessment session state manager.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AssessmentError {
    #[error(transparent)]
    InvalidStudent(#[from] StudentError),
    #[error("student {0} not found")]
    StudentNotFound(StudentId),
    #[error("student {0} has already been assessed today")]
    AlreadyAssessedToday(StudentId),
    #[error("student {0} already has an active assessment session")]
    SessionAlreadyActive(StudentId),
    #[error("student {0} has no active assessment session")]
    NoActiveSession(StudentId),
    #[error(transparent)]
    Question(#[from] AssessmentQuestionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AssessmentError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidStudent(_) | Self::Question(_) => ErrorCategory::Validation,
            Self::StudentNotFound(_) | Self::NoActiveSession(_) => ErrorCategory::NotFound,
            Self::AlreadyAssessedToday(_) | Self::SessionAlreadyActive(_) => {
                ErrorCategory::Conflict
            }
            Self::Storage(e) => storage_category(e),
        }
    }
}

/// Errors emitted by the aggregation engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error(transparent)]
    InvalidStudent(#[from] StudentError),
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error("student {0} not found")]
    StudentNotFound(StudentId),
    #[error("unknown sort order: {0:?} (expected newest, oldest, name or score)")]
    InvalidSort(String),
    #[error("unknown report period: {0:?} (expected week, month, quarter or year)")]
    InvalidPeriod(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ProgressError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidStudent(_)
            | Self::Shape(_)
            | Self::InvalidSort(_)
            | Self::InvalidPeriod(_) => ErrorCategory::Validation,
            Self::StudentNotFound(_) => ErrorCategory::NotFound,
            Self::Storage(e) => storage_category(e),
        }
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AppServicesError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Sqlite(_) => ErrorCategory::Unavailable,
            Self::Storage(e) => storage_category(e),
        }
    }
}
