use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use services::{AppServices, SessionSummary};

use crate::dto::{LearningSessionView, RecordSessionRequest, SessionListQuery, Success};
use crate::error::ApiError;

pub(super) async fn list(
    State(services): State<AppServices>,
    query: Result<Query<SessionListQuery>, QueryRejection>,
) -> Result<Json<Success<Vec<SessionSummary>>>, ApiError> {
    let Query(query) = query?;
    let rows = services.progress().list_sessions(query.into()).await?;
    Ok(Json(Success::list(rows)))
}

pub(super) async fn create(
    State(services): State<AppServices>,
    body: Result<Json<RecordSessionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Success<LearningSessionView>>), ApiError> {
    let Json(body) = body?;
    let session = services
        .learning()
        .record(
            body.student_id.as_deref().unwrap_or_default(),
            body.shape.as_deref().unwrap_or_default(),
            body.explanation.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(Success::new(LearningSessionView::from(session))),
    ))
}
