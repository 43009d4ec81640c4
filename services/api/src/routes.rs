use crate::infra::AppState;
use admissions_ai::workflows::catalog::schema::Column;
use admissions_ai::workflows::report::NarrativeGenerator;
use admissions_ai::workflows::screening::{screening_router, ScreeningService, SessionRepository};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub(crate) struct CatalogSummary {
    pub(crate) programs: usize,
    pub(crate) fingerprint: String,
    pub(crate) columns: Vec<Column>,
    pub(crate) score_bands: bool,
    pub(crate) expert_notes: bool,
    pub(crate) university_summaries: usize,
}

pub(crate) fn with_screening_routes<R, N>(service: Arc<ScreeningService<R, N>>) -> axum::Router
where
    R: SessionRepository + 'static,
    N: NarrativeGenerator + 'static,
{
    screening_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/catalog", axum::routing::get(catalog_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Shape of the catalog the service was started with.
pub(crate) async fn catalog_endpoint(
    Extension(state): Extension<AppState>,
) -> Json<CatalogSummary> {
    let datasets = &state.datasets;
    let catalog = &datasets.catalog;
    Json(CatalogSummary {
        programs: catalog.len(),
        fingerprint: format!("{:016x}", catalog.fingerprint()),
        columns: catalog.capabilities().columns().collect(),
        score_bands: datasets.bands.is_some(),
        expert_notes: datasets
            .expert_notes
            .as_deref()
            .is_some_and(|notes| !notes.trim().is_empty()),
        university_summaries: datasets
            .summaries
            .as_ref()
            .map_or(0, |summaries| summaries.len()),
    })
}
