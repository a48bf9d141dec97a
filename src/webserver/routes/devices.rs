//! Device registry endpoints, mounted at `/api/devices`.

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;

use crate::{
    devices::{DeviceUpdate, NewDevice},
    errors::{DeviceError, DeviceResult},
    webserver::{
        models::{AssignRequest, DeletedResponse, DeviceListQuery, PingRequest},
        state::AppState,
        utils::{created_response, success_response},
    },
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_devices).post(create_device))
        .route("/stats", get(device_stats))
        .route(
            "/:id",
            get(get_device).put(update_device).delete(delete_device),
        )
        .route("/:id/assign", put(assign_device))
        .route("/:id/unassign", put(unassign_device))
        .route("/:id/set-inactive", put(set_inactive))
        .route("/:id/ping", post(ping_device))
}

/// GET /api/devices?status=&search=
async fn list_devices(
    State(state): State<Arc<AppState>>,
    query: Result<Query<DeviceListQuery>, QueryRejection>,
) -> DeviceResult<Response> {
    let Query(query) = query?;
    let filter = query.into_filter()?;
    Ok(success_response(state.registry.list(&filter)))
}

/// GET /api/devices/stats
async fn device_stats(State(state): State<Arc<AppState>>) -> Response {
    success_response(state.registry.stats())
}

/// GET /api/devices/:id
async fn get_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> DeviceResult<Response> {
    Ok(success_response(state.registry.get(&id)?))
}

/// POST /api/devices
async fn create_device(
    State(state): State<Arc<AppState>>,
    body: Result<Json<NewDevice>, JsonRejection>,
) -> DeviceResult<Response> {
    let Json(input) = body?;
    let device = state.registry.create(input).await?;
    Ok(created_response(device))
}

/// PUT /api/devices/:id
async fn update_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<DeviceUpdate>, JsonRejection>,
) -> DeviceResult<Response> {
    let Json(changes) = body?;
    Ok(success_response(state.registry.update(&id, changes).await?))
}

/// PUT /api/devices/:id/assign
async fn assign_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<AssignRequest>, JsonRejection>,
) -> DeviceResult<Response> {
    let Json(request) = body?;
    let device = state.registry.assign(&id, &request.assigned_to).await?;
    Ok(success_response(device))
}

/// PUT /api/devices/:id/unassign
async fn unassign_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> DeviceResult<Response> {
    Ok(success_response(state.registry.unassign(&id).await?))
}

/// PUT /api/devices/:id/set-inactive
async fn set_inactive(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> DeviceResult<Response> {
    Ok(success_response(state.registry.set_inactive(&id).await?))
}

/// POST /api/devices/:id/ping
///
/// The body is optional; `{}` or no body records a ping without wifi info.
async fn ping_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> DeviceResult<Response> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        PingRequest::default()
    } else {
        serde_json::from_slice::<PingRequest>(&body)
            .map_err(|e| DeviceError::validation(format!("Invalid ping body: {}", e)))?
    };
    let wifi = request.current_wifi.filter(|w| !w.trim().is_empty());
    Ok(success_response(state.registry.ping(&id, wifi).await?))
}

/// DELETE /api/devices/:id
async fn delete_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> DeviceResult<Response> {
    let id = state.registry.delete(&id).await?;
    Ok(success_response(DeletedResponse { id }))
}
