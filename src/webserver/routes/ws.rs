//! Real-time observer endpoint (`GET /ws`).

use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Extension, Router,
};
use std::sync::Arc;

use crate::{
    logger::{self, LogTag},
    webserver::{auth::Principal, state::AppState, ws},
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(ws_handler))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Response {
    logger::debug(
        LogTag::Webserver,
        &format!("WebSocket upgrade requested by {}", principal.login),
    );

    let hub = Arc::clone(&state.hub);
    let keep_alive = state.keep_alive;
    ws.on_upgrade(move |socket| ws::handle_connection(socket, hub, keep_alive, principal.login))
}
