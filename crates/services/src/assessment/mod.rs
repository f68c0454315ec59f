mod service;
mod view;

pub use crate::error::AssessmentError;
pub use service::AssessmentService;
pub use view::{
    AssessmentQuestionView, AssessmentSessionView, AssessmentStatusView, CompletedAssessment,
    CurrentAssessment,
};
