// REST handlers: version, logs, filters, monitor control, balancer simulator

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::time::Duration;

use super::AppState;
use crate::balancer::Algorithm;
use crate::models::{
    FilterUpdate, LogLevel, LogSource, Metadata, ModelError, Operation, ResourceRef,
};
use crate::version::{NAME, VERSION};

/// Upper bound for one burst request.
const MAX_BURST: usize = 100;
const DEFAULT_BURST: usize = 10;
const BURST_SPACING: Duration = Duration::from_millis(100);

/// Error body `{ "error": "..." }` with a matching status.
#[derive(Debug, thiserror::Error)]
pub(super) enum ApiError {
    #[error(transparent)]
    BadRequest(#[from] ModelError),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(e) => {
                tracing::error!(error = %e, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

/// GET /version — returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

// --- logs ---

pub(super) async fn list_logs(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.filtered_logs())
}

#[derive(Debug, Deserialize)]
pub(super) struct AppendLogRequest {
    level: String,
    message: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    metadata: Metadata,
}

/// POST /api/logs: entries from the dashboard; `source` defaults to `dashboard`.
pub(super) async fn append_log(
    State(state): State<AppState>,
    Json(req): Json<AppendLogRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let level: LogLevel = req.level.parse()?;
    let source: LogSource = match req.source.as_deref() {
        Some(s) => s.parse()?,
        None => LogSource::default(),
    };
    let entry = state.store.log(level, req.message, source, req.metadata);
    Ok((StatusCode::CREATED, Json(entry)))
}

pub(super) async fn clear_logs(State(state): State<AppState>) -> impl IntoResponse {
    state.store.clear_logs().await;
    StatusCode::NO_CONTENT
}

pub(super) async fn log_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.stats())
}

pub(super) async fn get_filters(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.filter_state())
}

#[derive(Debug, Deserialize)]
pub(super) struct FilterRequest {
    kind: String,
    #[serde(default)]
    value: String,
}

/// PUT /api/logs/filters: `{kind: "level"|"source"|"search", value}`; returns the new filter.
pub(super) async fn set_filter(
    State(state): State<AppState>,
    Json(req): Json<FilterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let update = FilterUpdate::parse(&req.kind, &req.value)?;
    state.store.set_filter(update);
    Ok(Json(state.store.filter_state()))
}

pub(super) async fn clear_filters(State(state): State<AppState>) -> impl IntoResponse {
    state.store.clear_filters();
    Json(state.store.filter_state())
}

/// GET /api/logs/export: full buffer as a JSON download, filters ignored.
pub(super) async fn export_logs(State(state): State<AppState>) -> Result<Response, ApiError> {
    let export = state.store.export_logs()?;
    let headers = [
        (header::CONTENT_TYPE, "application/json".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export.file_name),
        ),
    ];
    Ok((headers, export.contents).into_response())
}

// --- cluster monitor ---

fn monitor_body(monitoring: bool, changed: bool) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "monitoring": monitoring, "changed": changed }))
}

pub(super) async fn monitor_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({ "monitoring": state.watcher.is_monitoring() }))
}

pub(super) async fn monitor_start(State(state): State<AppState>) -> impl IntoResponse {
    let changed = state.watcher.start();
    monitor_body(state.watcher.is_monitoring(), changed)
}

pub(super) async fn monitor_stop(State(state): State<AppState>) -> impl IntoResponse {
    let changed = state.watcher.stop();
    monitor_body(state.watcher.is_monitoring(), changed)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct OperationRequest {
    operation: String,
    resource_type: String,
    resource_name: String,
    #[serde(default)]
    details: Metadata,
}

pub(super) async fn log_operation(
    State(state): State<AppState>,
    Json(req): Json<OperationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let operation: Operation = req.operation.parse()?;
    let resource = ResourceRef::new(req.resource_type, req.resource_name);
    let entry = state.watcher.log_operation(operation, &resource, req.details);
    Ok((StatusCode::CREATED, Json(entry)))
}

// --- load balancer simulator ---

pub(super) async fn balancer_state(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.balancer.state())
}

/// POST /api/balancer/request: 503 with the state when every pod is disabled.
pub(super) async fn balancer_request(State(state): State<AppState>) -> Response {
    match state.balancer.send_request() {
        Some(outcome) => Json(outcome).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(state.balancer.state()),
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct BurstParams {
    count: Option<usize>,
}

/// POST /api/balancer/burst?count=N: requests are sent in the background, 100 ms apart.
pub(super) async fn balancer_burst(
    State(state): State<AppState>,
    Query(params): Query<BurstParams>,
) -> impl IntoResponse {
    let count = params.count.unwrap_or(DEFAULT_BURST).min(MAX_BURST);
    let balancer = state.balancer.clone();
    tokio::spawn(async move {
        balancer.send_burst(count, BURST_SPACING).await;
    });
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "queued": count })),
    )
}

#[derive(Debug, Deserialize)]
pub(super) struct AlgorithmRequest {
    algorithm: String,
}

pub(super) async fn balancer_algorithm(
    State(state): State<AppState>,
    Json(req): Json<AlgorithmRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let algorithm: Algorithm = req.algorithm.parse()?;
    state.balancer.set_algorithm(algorithm);
    Ok(Json(state.balancer.state()))
}

pub(super) async fn balancer_toggle_pod(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .balancer
        .toggle_pod(id)
        .ok_or_else(|| ApiError::NotFound(format!("no backend pod with id {id}")))?;
    Ok(Json(state.balancer.state()))
}

pub(super) async fn balancer_reset(State(state): State<AppState>) -> impl IntoResponse {
    state.balancer.reset();
    Json(state.balancer.state())
}
