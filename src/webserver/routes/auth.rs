//! Login endpoint, mounted at `/api/auth`.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::Response,
    routing::post,
    Json, Router,
};
use std::sync::Arc;

use crate::{
    errors::{DeviceError, DeviceResult},
    logger::{self, LogTag},
    webserver::{
        auth::verify_password,
        models::{LoginRequest, LoginResponse},
        state::AppState,
        utils::success_response,
    },
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/login", post(login))
}

/// POST /api/auth/login
///
/// Only the configured admin credential is accepted; no accounts are created.
async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> DeviceResult<Response> {
    let Json(request) = body?;
    if request.login.trim().is_empty() || request.password.is_empty() {
        return Err(DeviceError::validation("login and password are required"));
    }

    let login_matches = request.login.trim() == state.auth.admin_login;
    // hash check runs even for an unknown login
    let password_ok = verify_password(&request.password, &state.auth.admin_password_hash);

    if !(login_matches && password_ok) {
        logger::warning(
            LogTag::Auth,
            &format!("Login rejected for '{}'", request.login.trim()),
        );
        return Err(DeviceError::Unauthorized("Invalid credentials".to_string()));
    }

    let token = state.jwt.issue(&state.auth.admin_login, &state.auth.admin_login)?;
    logger::info(
        LogTag::Auth,
        &format!("Issued token for '{}'", state.auth.admin_login),
    );

    Ok(success_response(LoginResponse {
        token,
        expires_in: state.jwt.expire_secs().max(0) as u64,
    }))
}
