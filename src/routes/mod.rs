// HTTP + WebSocket routes

mod http;
mod ws;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::balancer::LoadBalancer;
use crate::config::AppConfig;
use crate::log_store::LogStore;
use crate::watcher::ClusterWatcher;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<LogStore>,
    pub(crate) watcher: Arc<ClusterWatcher>,
    pub(crate) balancer: Arc<LoadBalancer>,
    pub(crate) config: AppConfig,
}

pub fn app(
    store: Arc<LogStore>,
    watcher: Arc<ClusterWatcher>,
    balancer: Arc<LoadBalancer>,
    config: AppConfig,
) -> Router {
    let state = AppState {
        store,
        watcher,
        balancer,
        config,
    };
    Router::new()
        .route("/", get(|| async { "clusterwatch: unified log service" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route(
            "/api/logs",
            get(http::list_logs)
                .post(http::append_log)
                .delete(http::clear_logs),
        ) // GET, POST, DELETE /api/logs
        .route("/api/logs/stats", get(http::log_stats)) // GET /api/logs/stats
        .route(
            "/api/logs/filters",
            get(http::get_filters)
                .put(http::set_filter)
                .delete(http::clear_filters),
        ) // GET, PUT, DELETE /api/logs/filters
        .route("/api/logs/export", get(http::export_logs)) // GET /api/logs/export
        .route("/api/monitor", get(http::monitor_status)) // GET /api/monitor
        .route("/api/monitor/start", post(http::monitor_start)) // POST /api/monitor/start
        .route("/api/monitor/stop", post(http::monitor_stop)) // POST /api/monitor/stop
        .route("/api/monitor/operations", post(http::log_operation)) // POST /api/monitor/operations
        .route("/api/balancer", get(http::balancer_state)) // GET /api/balancer
        .route("/api/balancer/request", post(http::balancer_request)) // POST /api/balancer/request
        .route("/api/balancer/burst", post(http::balancer_burst)) // POST /api/balancer/burst
        .route("/api/balancer/algorithm", post(http::balancer_algorithm)) // POST /api/balancer/algorithm
        .route(
            "/api/balancer/pods/{id}/toggle",
            post(http::balancer_toggle_pod),
        ) // POST /api/balancer/pods/{id}/toggle
        .route("/api/balancer/reset", post(http::balancer_reset)) // POST /api/balancer/reset
        .route("/ws/logs", get(ws::ws_logs)) // WS /ws/logs
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}
