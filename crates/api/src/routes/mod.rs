use std::time::Instant;

use axum::Router;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use services::AppServices;
use tracing::debug;

mod assessment;
mod reports;
mod sessions;
mod students;

/// Every route of the tracker, sharing one set of services.
pub fn router(services: AppServices) -> Router {
    Router::new()
        .route("/students", get(students::list).post(students::create))
        .route(
            "/students/{id}",
            get(students::detail)
                .put(students::update)
                .delete(students::remove),
        )
        .route("/students/{id}/progress", get(students::progress))
        .route("/sessions", get(sessions::list).post(sessions::create))
        .route("/assessment/start", post(assessment::start))
        .route("/assessment/complete", post(assessment::complete))
        .route("/assessment/cancel", post(assessment::cancel))
        .route("/assessment/status/{id}", get(assessment::status))
        .route("/assessment/current", get(assessment::current))
        .route("/assessment/sessions", get(assessment::list_questions))
        .route("/assessment/questions", post(assessment::record_question))
        .route("/reports/overview", get(reports::overview))
        .route("/init-db", get(reports::schema_status).post(reports::ensure_schema))
        .layer(middleware::from_fn(log_request))
        .with_state(services)
}

async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let started = Instant::now();
    let response = next.run(req).await;
    debug!(
        %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed = ?started.elapsed(),
        "request handled"
    );
    response
}
