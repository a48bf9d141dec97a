/// Response helpers shared by route handlers and middleware
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;

use crate::errors::DeviceError;
use crate::logger::{self, LogTag};
use crate::webserver::models::{ErrorDetails, ErrorResponse};

/// 200 with a JSON body
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// 201 with a JSON body
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Standard error envelope `{error: {code, message, details, timestamp, request_id}}`
pub fn error_response(
    status: StatusCode,
    code: &str,
    message: &str,
    details: Option<&str>,
) -> Response {
    let body = ErrorResponse {
        error: ErrorDetails {
            code: code.to_string(),
            message: message.to_string(),
            details: details.map(|d| d.to_string()),
            timestamp: Utc::now(),
            request_id: Some(uuid::Uuid::new_v4().to_string()),
        },
    };
    (status, Json(body)).into_response()
}

pub fn status_for(err: &DeviceError) -> StatusCode {
    match err {
        DeviceError::Validation(_) => StatusCode::BAD_REQUEST,
        DeviceError::DuplicateKey { .. } => StatusCode::CONFLICT,
        DeviceError::NotFound(_) => StatusCode::NOT_FOUND,
        DeviceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        DeviceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for DeviceError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        match &self {
            DeviceError::Internal(detail) => {
                // details stay in the log
                logger::error(LogTag::Webserver, &format!("Request failed: {}", detail));
                error_response(status, self.code(), "Internal server error", None)
            }
            DeviceError::DuplicateKey { field, .. } => {
                error_response(status, self.code(), &self.to_string(), Some(field))
            }
            _ => error_response(status, self.code(), &self.to_string(), None),
        }
    }
}

impl From<JsonRejection> for DeviceError {
    fn from(rejection: JsonRejection) -> Self {
        DeviceError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for DeviceError {
    fn from(rejection: QueryRejection) -> Self {
        DeviceError::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_statuses() {
        assert_eq!(
            DeviceError::validation("x").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DeviceError::duplicate("macAddress", "AA").into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            DeviceError::NotFound("id".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            DeviceError::Unauthorized("no token".into())
                .into_response()
                .status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            DeviceError::Internal("db".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
