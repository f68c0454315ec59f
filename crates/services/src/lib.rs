#![forbid(unsafe_code)]

pub mod app_services;
pub mod assessment;
pub mod error;
pub mod learning_service;
pub mod progress;
pub mod student_service;

pub use tactile_core::Clock;

pub use app_services::AppServices;
pub use assessment::{
    AssessmentQuestionView, AssessmentService, AssessmentSessionView, AssessmentStatusView,
    CompletedAssessment, CurrentAssessment,
};
pub use error::{
    AppServicesError, AssessmentError, ErrorCategory, LearningServiceError, ProgressError,
    StudentServiceError,
};
pub use learning_service::LearningService;
pub use progress::{
    OverviewReport, ProgressService, ReportPeriod, SessionQuery, SessionSummary, ShapeBreakdown,
    ShapeProgress, StudentDetail, StudentListItem, StudentMetrics,
};
pub use student_service::{StudentService, StudentView};
