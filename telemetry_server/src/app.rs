use crate::{error::ApiError, health::HealthStatus};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use telemetry_config::ServiceConfig;
use telemetry_core::{
    CsvSampleLog, HttpForwarder, IngestionGateway, ProcessedReceipt, ProcessedUpload,
    PublishedAggregate, RawReceipt, RawSample, RawUpload,
};
use telemetry_metrics::{HistorySummary, PrometheusExporter};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<IngestionGateway>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(gateway: Arc<IngestionGateway>) -> Self {
        Self {
            gateway,
            start_time: Instant::now(),
        }
    }
}

/// Open the durable logs and wire up the gateway described by `config`.
pub async fn build_gateway(config: &ServiceConfig) -> anyhow::Result<IngestionGateway> {
    let log = CsvSampleLog::open(
        &config.server.data_dir,
        &config.server.raw_log_file,
        &config.server.aggregate_log_file,
    )
    .await?;
    info!(
        "Durable logs: {} and {}",
        log.raw_path().display(),
        log.aggregate_path().display()
    );

    let mut builder = IngestionGateway::builder(Arc::new(log))
        .flush_interval(config.aggregation.flush_interval)
        .forward_timeout(config.forwarding.timeout)
        .default_session_id(config.forwarding.default_session_id.clone());

    if config.forwarding.enabled {
        info!("Forwarding enabled: {}", config.forwarding.base_url);
        let forwarder = HttpForwarder::new(config.forwarding.to_forwarder_config())?;
        builder = builder.forwarder(Arc::new(forwarder));
    }

    Ok(builder.build())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/upload_raw", post(upload_raw))
        .route("/upload_processed", post(upload_processed))
        .route("/latest_raw", get(latest_raw))
        .route("/latest_processed", get(latest_processed))
        .route("/history", get(aggregate_history))
        .route("/history_raw", get(raw_history))
        .route("/history/summary", get(history_summary))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(config: ServiceConfig) -> anyhow::Result<()> {
    let addr = config
        .bind_socket_addr()
        .map_err(|e| anyhow::anyhow!(e))?;
    let gateway = build_gateway(&config).await?;
    let app = router(AppState::new(Arc::new(gateway)));

    info!("Starting telemetry service on {}", addr);
    info!("Endpoints:");
    info!("  POST /upload_raw        - Raw channel frame");
    info!("  POST /upload_processed  - Processed metric");
    info!("  GET  /latest_raw        - Newest raw frame");
    info!("  GET  /latest_processed  - Newest window aggregate");
    info!("  GET  /history           - Aggregate log");
    info!("  GET  /history_raw       - Raw log");
    info!("  GET  /history/summary   - Aggregate log statistics");
    info!("  GET  /metrics           - Prometheus metrics");
    info!("  GET  /health            - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Telemetry service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus::healthy(
        state.start_time.elapsed().as_secs(),
        state.gateway.storage_backend(),
        state.gateway.forwarding_enabled(),
    ))
}

async fn upload_raw(
    State(state): State<AppState>,
    payload: Result<Json<RawUpload>, JsonRejection>,
) -> Result<Json<RawReceipt>, ApiError> {
    let Json(upload) = payload?;
    Ok(Json(state.gateway.ingest_raw(upload).await?))
}

async fn upload_processed(
    State(state): State<AppState>,
    payload: Result<Json<ProcessedUpload>, JsonRejection>,
) -> Result<Json<ProcessedReceipt>, ApiError> {
    let Json(upload) = payload?;
    Ok(Json(state.gateway.ingest_processed(upload).await?))
}

async fn latest_raw(State(state): State<AppState>) -> Response {
    match state.gateway.latest_raw().await {
        Some(sample) => Json(sample).into_response(),
        None => Json(json!({})).into_response(),
    }
}

async fn latest_processed(State(state): State<AppState>) -> Json<PublishedAggregate> {
    Json(state.gateway.latest_aggregate().await)
}

async fn aggregate_history(
    State(state): State<AppState>,
) -> Result<Json<Vec<PublishedAggregate>>, ApiError> {
    Ok(Json(state.gateway.aggregate_history().await?))
}

async fn raw_history(State(state): State<AppState>) -> Result<Json<Vec<RawSample>>, ApiError> {
    Ok(Json(state.gateway.raw_history().await?))
}

async fn history_summary(
    State(state): State<AppState>,
) -> Result<Json<HistorySummary>, ApiError> {
    let history = state.gateway.aggregate_history().await?;
    Ok(Json(HistorySummary::from_aggregates(&history)))
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = PrometheusExporter::format(
        &state.gateway.stats(),
        &state.gateway.latest_aggregate().await,
    );
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}
