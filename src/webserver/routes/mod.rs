use axum::{http::StatusCode, middleware, response::Response, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::webserver::{middleware::require_auth, state::AppState, utils};

pub mod auth;
pub mod devices;
pub mod status;
pub mod ws;

/// Build the full application router
///
/// `/api/health` and `/api/auth/login` are public; everything else sits behind
/// the access gate.
pub fn create_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .nest("/api/devices", devices::routes())
        .merge(status::protected_routes())
        .merge(ws::routes())
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_auth,
        ));

    let app = Router::new()
        .merge(status::routes())
        .nest("/api/auth", auth::routes())
        .merge(protected)
        .fallback(not_found)
        .with_state(Arc::clone(&state));

    if state.cors_enabled {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

async fn not_found() -> Response {
    utils::error_response(
        StatusCode::NOT_FOUND,
        "NOT_FOUND",
        "No such endpoint",
        None,
    )
}
