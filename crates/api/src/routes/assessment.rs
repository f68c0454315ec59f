use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use services::{
    AppServices, AssessmentQuestionView, AssessmentSessionView, AssessmentStatusView,
    CompletedAssessment,
};

use crate::dto::{CurrentStudent, QuestionListQuery, RecordQuestionRequest, StudentRef, Success};
use crate::error::ApiError;

fn student_id(body: &StudentRef) -> &str {
    body.student_id.as_deref().unwrap_or_default()
}

pub(super) async fn start(
    State(services): State<AppServices>,
    body: Result<Json<StudentRef>, JsonRejection>,
) -> Result<Json<Success<AssessmentSessionView>>, ApiError> {
    let Json(body) = body?;
    let session = services.assessments().start(student_id(&body)).await?;
    Ok(Json(Success::new(session)))
}

pub(super) async fn complete(
    State(services): State<AppServices>,
    body: Result<Json<StudentRef>, JsonRejection>,
) -> Result<Json<Success<CompletedAssessment>>, ApiError> {
    let Json(body) = body?;
    let completed = services.assessments().complete(student_id(&body)).await?;
    Ok(Json(Success::new(completed)))
}

pub(super) async fn cancel(
    State(services): State<AppServices>,
    body: Result<Json<StudentRef>, JsonRejection>,
) -> Result<Json<Success<AssessmentSessionView>>, ApiError> {
    let Json(body) = body?;
    let cancelled = services.assessments().cancel(student_id(&body)).await?;
    Ok(Json(Success::new(cancelled)))
}

pub(super) async fn status(
    State(services): State<AppServices>,
    Path(id): Path<String>,
) -> Result<Json<Success<AssessmentStatusView>>, ApiError> {
    let status = services.assessments().status(&id).await?;
    Ok(Json(Success::new(status)))
}

pub(super) async fn current(
    State(services): State<AppServices>,
) -> Result<Json<Success<CurrentStudent>>, ApiError> {
    let current_student = services.assessments().current().await?;
    Ok(Json(Success::new(CurrentStudent { current_student })))
}

pub(super) async fn list_questions(
    State(services): State<AppServices>,
    query: Result<Query<QuestionListQuery>, QueryRejection>,
) -> Result<Json<Success<Vec<AssessmentQuestionView>>>, ApiError> {
    let Query(query) = query?;
    let raw_id = query
        .student_id
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("studentId is required"))?;
    let rows = services
        .assessments()
        .list_questions(raw_id, query.date)
        .await?;
    Ok(Json(Success::list(rows)))
}

pub(super) async fn record_question(
    State(services): State<AppServices>,
    body: Result<Json<RecordQuestionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Success<AssessmentQuestionView>>), ApiError> {
    let Json(body) = body?;
    let stored = services
        .assessments()
        .record_question(
            body.student_id.as_deref().unwrap_or_default(),
            body.question.as_deref().unwrap_or_default(),
            body.answer.as_deref().unwrap_or_default(),
            body.assessment.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(Success::new(stored))))
}
