use axum::{extract::State, response::Response, routing::get, Router};
use chrono::Utc;
use std::sync::Arc;

use crate::{
    logger::{self, LogTag},
    webserver::{
        models::{BroadcastMetricsResponse, HealthResponse},
        state::AppState,
        utils::success_response,
    },
};

/// Public status routes
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/health", get(health_check))
}

/// Status routes behind the access gate
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/broadcast/metrics", get(broadcast_metrics))
}

/// GET /api/health
async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    logger::verbose(LogTag::Webserver, "Health check endpoint called");

    let response = HealthResponse {
        status: if state.hub.is_closed() {
            "stopping".to_string()
        } else {
            "ok".to_string()
        },
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        observers: state.hub.metrics().active_observers(),
    };

    success_response(response)
}

/// GET /api/broadcast/metrics
async fn broadcast_metrics(State(state): State<Arc<AppState>>) -> Response {
    success_response(BroadcastMetricsResponse {
        metrics: state.hub.metrics().snapshot(),
        hub_closed: state.hub.is_closed(),
        timestamp: Utc::now(),
    })
}
