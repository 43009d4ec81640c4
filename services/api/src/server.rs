use crate::cli::ServeArgs;
use crate::infra::{load_datasets, AppState, InMemorySessionRepository, OfflineNarrator};
use crate::routes::with_screening_routes;
use admissions_ai::config::AppConfig;
use admissions_ai::error::AppError;
use admissions_ai::telemetry;
use admissions_ai::workflows::screening::ScreeningService;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(catalog) = args.catalog.take() {
        config.data.catalog_path = catalog;
    }
    if let Some(bands) = args.score_bands.take() {
        config.data.score_bands_path = Some(bands);
    }
    if let Some(notes) = args.expert_notes.take() {
        config.data.expert_notes_path = Some(notes);
    }
    if let Some(summaries) = args.university_summaries.take() {
        config.data.university_summary_path = Some(summaries);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));

    let datasets = Arc::new(load_datasets(&config.data)?);
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        datasets: Arc::clone(&datasets),
    };

    let repository = Arc::new(InMemorySessionRepository::default());
    let narrator = Arc::new(OfflineNarrator);
    let screening_service = Arc::new(ScreeningService::new(repository, narrator, datasets));

    let app = with_screening_routes(screening_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "admissions screening service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
