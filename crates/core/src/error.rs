use thiserror::Error;

use crate::model::{AssessmentQuestionError, LearningSessionError, ShapeError, StudentError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Student(#[from] StudentError),
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error(transparent)]
    LearningSession(#[from] LearningSessionError),
    #[error(transparent)]
    AssessmentQuestion(#[from] AssessmentQuestionError),
}
