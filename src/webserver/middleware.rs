/// Webserver middleware
///
/// Access gate for every non-public route
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::{
    logger::{self, LogTag},
    webserver::{
        auth::{extract_token, Principal},
        state::AppState,
        utils,
    },
};

/// Require a valid token; store the `Principal` in request extensions
///
/// The `?token=` query parameter is only honored on the WebSocket upgrade,
/// since browsers cannot set headers on that request.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let allow_query = path == "/ws";
    let token = extract_token(request.headers(), request.uri().query(), allow_query);

    let Some(token) = token else {
        logger::debug(
            LogTag::Auth,
            &format!("Rejected request to {} - missing token", path),
        );
        return utils::error_response(
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "Authentication token required",
            Some("Send Authorization: Bearer <token>"),
        );
    };

    match state.jwt.verify(&token) {
        Ok(claims) => {
            logger::verbose(
                LogTag::Auth,
                &format!("Authorized {} for {}", claims.sub, path),
            );
            request.extensions_mut().insert(Principal::from(claims));
            next.run(request).await
        }
        Err(e) => {
            logger::debug(
                LogTag::Auth,
                &format!("Rejected request to {} - {}", path, e),
            );
            utils::error_response(
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Invalid or expired token",
                None,
            )
        }
    }
}
