use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use services::{
    AppServicesError, AssessmentError, ErrorCategory, LearningServiceError, ProgressError,
    StudentServiceError,
};
use thiserror::Error;
use tracing::{error, warn};

use crate::dto::Failure;

/// Errors surfaced by HTTP handlers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// Input rejected before it reached a service.
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Students(#[from] StudentServiceError),
    #[error(transparent)]
    Learning(#[from] LearningServiceError),
    #[error(transparent)]
    Assessment(#[from] AssessmentError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Schema(#[from] AppServicesError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::BadRequest(_) => ErrorCategory::Validation,
            Self::Students(e) => e.category(),
            Self::Learning(e) => e.category(),
            Self::Assessment(e) => e.category(),
            Self::Progress(e) => e.category(),
            Self::Schema(e) => e.category(),
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self.category() {
            ErrorCategory::Validation => StatusCode::BAD_REQUEST,
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            ErrorCategory::Conflict => StatusCode::CONFLICT,
            ErrorCategory::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self.category() {
            ErrorCategory::Internal => {
                error!(error = %self, "request failed");
                "internal server error".to_owned()
            }
            ErrorCategory::Unavailable => {
                warn!(error = %self, "store unavailable");
                "store temporarily unavailable, retry later".to_owned()
            }
            _ => self.to_string(),
        };
        (status, Json(Failure::new(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tactile_core::model::StudentId;

    #[test]
    fn categories_map_to_status_codes() {
        let id = StudentId::parse("STU1").unwrap();
        assert_eq!(
            ApiError::bad_request("studentId is required").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(StudentServiceError::NotFound(id.clone())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(AssessmentError::SessionAlreadyActive(id)).status(),
            StatusCode::CONFLICT
        );
    }
}
