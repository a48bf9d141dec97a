/// API request type definitions
///
/// Device create/update bodies are `devices::NewDevice` / `devices::DeviceUpdate`;
/// the shapes here are the remaining endpoint-specific ones.
use serde::Deserialize;

use crate::devices::{DeviceFilter, DeviceStatus};
use crate::errors::{DeviceError, DeviceResult};

/// `PUT /api/devices/:id/assign`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssignRequest {
    pub assigned_to: String,
}

/// `POST /api/devices/:id/ping` (body optional)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PingRequest {
    pub current_wifi: Option<String>,
}

/// `POST /api/auth/login`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

/// `GET /api/devices?status=&search=`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeviceListQuery {
    pub status: Option<String>,
    pub search: Option<String>,
}

impl DeviceListQuery {
    /// Unknown status values are rejected rather than matching nothing
    pub fn into_filter(self) -> DeviceResult<DeviceFilter> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(DeviceStatus::parse(raw).ok_or_else(|| {
                DeviceError::validation(format!("Unknown status filter '{}'", raw))
            })?),
        };
        Ok(DeviceFilter {
            status,
            search: self.search.filter(|s| !s.trim().is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_into_filter() {
        let filter = DeviceListQuery {
            status: Some("active".into()),
            search: Some("".into()),
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.status, Some(DeviceStatus::Active));
        assert!(filter.search.is_none());

        assert!(DeviceListQuery {
            status: Some("lost".into()),
            search: None
        }
        .into_filter()
        .is_err());
    }
}
