/// Error types for the device registry
///
/// `DeviceError` is the single failure type returned by the store, the registry
/// and the access gate. The HTTP mapping lives in `webserver::utils`.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Missing or malformed required field
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unique constraint violation on `macAddress` or `serialNumber`
    #[error("Duplicate {field}: '{value}' is already registered")]
    DuplicateKey { field: String, value: String },

    #[error("Device not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Store or transport failure; details are logged, never returned to clients
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type DeviceResult<T> = Result<T, DeviceError>;

impl DeviceError {
    pub fn validation(message: impl Into<String>) -> Self {
        DeviceError::Validation(message.into())
    }

    pub fn duplicate(field: &str, value: &str) -> Self {
        DeviceError::DuplicateKey {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// Stable machine-readable code used in error envelopes
    pub fn code(&self) -> &'static str {
        match self {
            DeviceError::Validation(_) => "VALIDATION_ERROR",
            DeviceError::DuplicateKey { .. } => "DUPLICATE_KEY",
            DeviceError::NotFound(_) => "NOT_FOUND",
            DeviceError::Unauthorized(_) => "UNAUTHORIZED",
            DeviceError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, DeviceError::Internal(_))
    }
}

impl From<rusqlite::Error> for DeviceError {
    fn from(err: rusqlite::Error) -> Self {
        DeviceError::Internal(format!("Database error: {}", err))
    }
}

impl From<serde_json::Error> for DeviceError {
    fn from(err: serde_json::Error) -> Self {
        DeviceError::Internal(format!("Serialization error: {}", err))
    }
}
