/// Device record, lifecycle status and the input/filter shapes the registry accepts
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{DeviceError, DeviceResult};

/// Category assigned when the caller supplies none
pub const DEFAULT_CATEGORY: &str = "Sem Categoria";

/// Lifecycle status. Wire values are the Portuguese labels the dashboards use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DeviceStatus {
    #[default]
    #[serde(rename = "disponível", alias = "available", alias = "disponivel")]
    Available,
    #[serde(rename = "ativo", alias = "active")]
    Active,
    #[serde(rename = "inativo", alias = "inactive")]
    Inactive,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Available => "disponível",
            DeviceStatus::Active => "ativo",
            DeviceStatus::Inactive => "inativo",
        }
    }

    /// Accepts wire values and English aliases, case-insensitive
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "disponível" | "disponivel" | "available" => Some(DeviceStatus::Available),
            "ativo" | "active" => Some(DeviceStatus::Active),
            "inativo" | "inactive" => Some(DeviceStatus::Inactive),
            _ => None,
        }
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    pub mac_address: String,
    pub serial_number: String,
    pub category: String,
    pub wms_login: String,
    pub status: DeviceStatus,
    /// Non-null iff `status == Active`
    pub assigned_to: Option<String>,
    pub last_ping: Option<DateTime<Utc>>,
    pub current_wifi: Option<String>,
    pub last_assigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Device {
    /// Build a fresh record: new id, status Available, no assignment
    pub fn from_new(input: NewDevice, default_category: &str) -> DeviceResult<Self> {
        input.validate()?;
        let now = Utc::now();
        let category = match input.category {
            Some(c) if !c.trim().is_empty() => c.trim().to_string(),
            _ => default_category.to_string(),
        };

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            mac_address: input.mac_address.trim().to_string(),
            serial_number: input.serial_number.trim().to_string(),
            category,
            wms_login: input.wms_login.trim().to_string(),
            status: DeviceStatus::Available,
            assigned_to: None,
            last_ping: None,
            current_wifi: None,
            last_assigned_at: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Create request. Unknown fields such as `status` or `assignedTo` are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewDevice {
    pub mac_address: String,
    pub serial_number: String,
    pub category: Option<String>,
    pub wms_login: String,
}

impl NewDevice {
    pub fn validate(&self) -> DeviceResult<()> {
        for (field, value) in [
            ("macAddress", &self.mac_address),
            ("serialNumber", &self.serial_number),
            ("wmsLogin", &self.wms_login),
        ] {
            if value.trim().is_empty() {
                return Err(DeviceError::validation(format!("{} is required", field)));
            }
        }
        Ok(())
    }
}

/// Field update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceUpdate {
    pub mac_address: Option<String>,
    pub serial_number: Option<String>,
    pub category: Option<String>,
    pub wms_login: Option<String>,
}

impl DeviceUpdate {
    /// Present identity fields must not be blank
    pub fn validate(&self) -> DeviceResult<()> {
        for (field, value) in [
            ("macAddress", &self.mac_address),
            ("serialNumber", &self.serial_number),
            ("wmsLogin", &self.wms_login),
        ] {
            if matches!(value, Some(v) if v.trim().is_empty()) {
                return Err(DeviceError::validation(format!("{} cannot be empty", field)));
            }
        }
        Ok(())
    }

    pub fn apply(&self, device: &mut Device, default_category: &str) {
        if let Some(mac) = &self.mac_address {
            device.mac_address = mac.trim().to_string();
        }
        if let Some(serial) = &self.serial_number {
            device.serial_number = serial.trim().to_string();
        }
        if let Some(category) = &self.category {
            device.category = if category.trim().is_empty() {
                default_category.to_string()
            } else {
                category.trim().to_string()
            };
        }
        if let Some(login) = &self.wms_login {
            device.wms_login = login.trim().to_string();
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeviceFilter {
    pub status: Option<DeviceStatus>,
    /// Case-insensitive substring of mac OR serial
    pub search: Option<String>,
}

impl DeviceFilter {
    pub fn matches(&self, device: &Device) -> bool {
        if let Some(status) = self.status {
            if device.status != status {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let needle = term.to_lowercase();
                device.mac_address.to_lowercase().contains(&needle)
                    || device.serial_number.to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub available: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Device {
        Device::from_new(
            NewDevice {
                mac_address: "AA:BB:CC".into(),
                serial_number: "SN-100".into(),
                category: None,
                wms_login: "wms1".into(),
            },
            DEFAULT_CATEGORY,
        )
        .unwrap()
    }

    #[test]
    fn test_status_wire_values() {
        assert_eq!(
            serde_json::to_string(&DeviceStatus::Available).unwrap(),
            "\"disponível\""
        );
        let parsed: DeviceStatus = serde_json::from_str("\"active\"").unwrap();
        assert_eq!(parsed, DeviceStatus::Active);
        assert_eq!(DeviceStatus::parse("INATIVO"), Some(DeviceStatus::Inactive));
        assert_eq!(DeviceStatus::parse("broken"), None);
    }

    #[test]
    fn test_new_device_defaults() {
        let device = sample();
        assert_eq!(device.status, DeviceStatus::Available);
        assert_eq!(device.category, DEFAULT_CATEGORY);
        assert!(device.assigned_to.is_none());

        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json["macAddress"], "AA:BB:CC");
        assert!(json["assignedTo"].is_null());
        assert_eq!(json["status"], "disponível");
    }

    #[test]
    fn test_new_device_requires_fields() {
        let err = Device::from_new(
            NewDevice {
                mac_address: "AA".into(),
                serial_number: " ".into(),
                category: None,
                wms_login: "wms".into(),
            },
            DEFAULT_CATEGORY,
        )
        .unwrap_err();
        assert_eq!(err, DeviceError::validation("serialNumber is required"));
    }

    #[test]
    fn test_create_body_ignores_status() {
        let input: NewDevice = serde_json::from_str(
            r#"{"macAddress":"M1","serialNumber":"S1","wmsLogin":"w","status":"ativo","assignedTo":"eve"}"#,
        )
        .unwrap();
        let device = Device::from_new(input, DEFAULT_CATEGORY).unwrap();
        assert_eq!(device.status, DeviceStatus::Available);
        assert!(device.assigned_to.is_none());
    }

    #[test]
    fn test_filter_matching() {
        let device = sample();
        let by_mac = DeviceFilter {
            status: None,
            search: Some("bb:c".into()),
        };
        let by_serial = DeviceFilter {
            status: Some(DeviceStatus::Available),
            search: Some("sn-1".into()),
        };
        let wrong_status = DeviceFilter {
            status: Some(DeviceStatus::Active),
            search: None,
        };
        assert!(by_mac.matches(&device));
        assert!(by_serial.matches(&device));
        assert!(!wrong_status.matches(&device));
    }

    #[test]
    fn test_update_apply_and_validate() {
        let mut device = sample();
        let update = DeviceUpdate {
            category: Some("".into()),
            wms_login: Some("wms2".into()),
            ..Default::default()
        };
        update.validate().unwrap();
        update.apply(&mut device, "Fallback");
        assert_eq!(device.category, "Fallback");
        assert_eq!(device.wms_login, "wms2");
        assert_eq!(device.mac_address, "AA:BB:CC");

        let blank = DeviceUpdate {
            mac_address: Some("".into()),
            ..Default::default()
        };
        assert!(blank.validate().is_err());
    }
}
