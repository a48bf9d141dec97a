/// API response type definitions
///
/// Standard response structures for REST API endpoints
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::broadcast::HubMetricsSnapshot;

/// Simple health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime_seconds: u64,
    /// Currently connected real-time observers
    pub observers: usize,
}

/// `POST /api/auth/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: u64,
}

/// `DELETE /api/devices/:id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub id: String,
}

/// `GET /api/broadcast/metrics`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastMetricsResponse {
    #[serde(flatten)]
    pub metrics: HubMetricsSnapshot,
    pub hub_closed: bool,
    pub timestamp: DateTime<Utc>,
}

/// Generic error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub request_id: Option<String>,
}
