use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::criteria::CascadePlan;
use super::domain::StudentProfile;
use super::pipeline::{SelectionRequest, TierSorts};
use super::repository::{RepositoryError, SessionId, SessionRepository};
use super::service::{ReportRequest, ScreeningService, ScreeningServiceError};
use crate::workflows::report::NarrativeGenerator;

/// Router exposing the staged screening session and the one-shot report.
pub fn screening_router<R, N>(service: Arc<ScreeningService<R, N>>) -> Router
where
    R: SessionRepository + 'static,
    N: NarrativeGenerator + 'static,
{
    Router::new()
        .route("/api/v1/screening/sessions", post(start_handler::<R, N>))
        .route(
            "/api/v1/screening/sessions/:session_id",
            get(session_handler::<R, N>),
        )
        .route(
            "/api/v1/screening/sessions/:session_id/criteria",
            post(criteria_handler::<R, N>),
        )
        .route(
            "/api/v1/screening/sessions/:session_id/shortlist",
            post(shortlist_handler::<R, N>),
        )
        .route(
            "/api/v1/screening/sessions/:session_id/selection",
            post(selection_handler::<R, N>),
        )
        .route(
            "/api/v1/screening/sessions/:session_id/report",
            post(session_report_handler::<R, N>),
        )
        .route("/api/v1/screening/report", post(report_handler::<R, N>))
        .with_state(service)
}

pub(crate) async fn start_handler<R, N>(
    State(service): State<Arc<ScreeningService<R, N>>>,
    axum::Json(profile): axum::Json<StudentProfile>,
) -> Response
where
    R: SessionRepository + 'static,
    N: NarrativeGenerator + 'static,
{
    match service.start(profile) {
        Ok(session) => (StatusCode::CREATED, axum::Json(session.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn session_handler<R, N>(
    State(service): State<Arc<ScreeningService<R, N>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    N: NarrativeGenerator + 'static,
{
    match service.get(&SessionId(session_id)) {
        Ok(session) => (StatusCode::OK, axum::Json(session.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn criteria_handler<R, N>(
    State(service): State<Arc<ScreeningService<R, N>>>,
    Path(session_id): Path<String>,
    axum::Json(plan): axum::Json<CascadePlan>,
) -> Response
where
    R: SessionRepository + 'static,
    N: NarrativeGenerator + 'static,
{
    match service.apply_criteria(&SessionId(session_id), plan) {
        Ok(session) => (StatusCode::OK, axum::Json(session.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn shortlist_handler<R, N>(
    State(service): State<Arc<ScreeningService<R, N>>>,
    Path(session_id): Path<String>,
    axum::Json(sorts): axum::Json<TierSorts>,
) -> Response
where
    R: SessionRepository + 'static,
    N: NarrativeGenerator + 'static,
{
    match service.shortlist(&SessionId(session_id), sorts) {
        Ok(session) => (StatusCode::OK, axum::Json(session.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn selection_handler<R, N>(
    State(service): State<Arc<ScreeningService<R, N>>>,
    Path(session_id): Path<String>,
    axum::Json(request): axum::Json<SelectionRequest>,
) -> Response
where
    R: SessionRepository + 'static,
    N: NarrativeGenerator + 'static,
{
    match service.select(&SessionId(session_id), &request) {
        Ok(session) => (StatusCode::OK, axum::Json(session.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn session_report_handler<R, N>(
    State(service): State<Arc<ScreeningService<R, N>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    N: NarrativeGenerator + 'static,
{
    match service.session_report(&SessionId(session_id)) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn report_handler<R, N>(
    State(service): State<Arc<ScreeningService<R, N>>>,
    axum::Json(request): axum::Json<ReportRequest>,
) -> Response
where
    R: SessionRepository + 'static,
    N: NarrativeGenerator + 'static,
{
    match service.report(&request) {
        Ok(response) => (StatusCode::OK, axum::Json(response)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: ScreeningServiceError) -> Response {
    let status = match &error {
        ScreeningServiceError::InvalidProfile(_) | ScreeningServiceError::Pipeline(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ScreeningServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        ScreeningServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        ScreeningServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
