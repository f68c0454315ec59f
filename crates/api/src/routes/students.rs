use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use services::{AppServices, ShapeBreakdown, StudentDetail, StudentListItem, StudentView};

use crate::dto::{DeletedStudent, RegisterStudentRequest, StudentFields, StudentListQuery, Success};
use crate::error::ApiError;

pub(super) async fn list(
    State(services): State<AppServices>,
    query: Result<Query<StudentListQuery>, QueryRejection>,
) -> Result<Json<Success<Vec<StudentListItem>>>, ApiError> {
    let Query(query) = query?;
    let items = services
        .progress()
        .list_students(query.sort.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(Success::list(items)))
}

pub(super) async fn create(
    State(services): State<AppServices>,
    body: Result<Json<RegisterStudentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Success<StudentView>>), ApiError> {
    let Json(body) = body?;
    let (raw_id, profile) = body.into_parts()?;
    let student = services.students().register(&raw_id, profile).await?;
    Ok((
        StatusCode::CREATED,
        Json(Success::new(StudentView::from(&student))),
    ))
}

pub(super) async fn detail(
    State(services): State<AppServices>,
    Path(id): Path<String>,
) -> Result<Json<Success<StudentDetail>>, ApiError> {
    let detail = services.progress().student_detail(&id).await?;
    Ok(Json(Success::new(detail)))
}

pub(super) async fn update(
    State(services): State<AppServices>,
    Path(id): Path<String>,
    body: Result<Json<StudentFields>, JsonRejection>,
) -> Result<Json<Success<StudentView>>, ApiError> {
    let Json(fields) = body?;
    let student = services
        .students()
        .update(&id, fields.into_patch()?)
        .await?;
    Ok(Json(Success::new(StudentView::from(&student))))
}

pub(super) async fn remove(
    State(services): State<AppServices>,
    Path(id): Path<String>,
) -> Result<Json<Success<DeletedStudent>>, ApiError> {
    services.students().delete(&id).await?;
    Ok(Json(Success::new(DeletedStudent {
        student_id: id,
        deleted: true,
    })))
}

pub(super) async fn progress(
    State(services): State<AppServices>,
    Path(id): Path<String>,
) -> Result<Json<Success<ShapeBreakdown>>, ApiError> {
    let breakdown = services.progress().shape_progress(&id).await?;
    Ok(Json(Success::new(breakdown)))
}
