use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use services::{AppServices, OverviewReport};
use tracing::info;

use crate::dto::{ReportQuery, SchemaView, Success};
use crate::error::ApiError;

pub(super) async fn overview(
    State(services): State<AppServices>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> Result<Json<Success<OverviewReport>>, ApiError> {
    let Query(query) = query?;
    let report = services
        .progress()
        .overview_report(query.period.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(Success::new(report)))
}

pub(super) async fn schema_status(
    State(services): State<AppServices>,
) -> Result<Json<Success<SchemaView>>, ApiError> {
    let status = services.schema_status().await?;
    Ok(Json(Success::new(status.into())))
}

pub(super) async fn ensure_schema(
    State(services): State<AppServices>,
) -> Result<Json<Success<SchemaView>>, ApiError> {
    let status = services.ensure_schema().await?;
    info!(ready = status.is_complete(), "schema ensured");
    Ok(Json(Success::new(status.into())))
}
