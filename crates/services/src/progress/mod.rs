mod engine;
mod report;
mod service;

pub use crate::error::ProgressError;
pub use engine::{
    SessionSummary, ShapeAnalytics, ShapeBreakdown, ShapeProgress, StudentListItem,
    StudentMetrics, StudentSort, TallyIndex, shape_analytics, shape_progress, sort_students,
    summarize,
};
pub use report::{OverviewReport, ReportPeriod, StudentPerformance};
pub use service::{
    DEFAULT_SESSION_LIMIT, MAX_SESSION_LIMIT, ProgressService, RECENT_SESSIONS, SessionQuery,
    StudentDetail,
};
