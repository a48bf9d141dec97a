/// Change events pushed to observers
///
/// Serialized as `{"type": "...", "device": {...}}` or, for deletions,
/// `{"type": "device-deleted", "id": "..."}`.
use serde::{Deserialize, Serialize};

use crate::devices::Device;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DeviceEvent {
    #[serde(rename = "device-added")]
    Added { device: Device },
    #[serde(rename = "device-updated")]
    Updated { device: Device },
    #[serde(rename = "device-deleted")]
    Deleted { id: String },
    #[serde(rename = "device-ping")]
    Ping { device: Device },
}

impl DeviceEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            DeviceEvent::Added { .. } => "device-added",
            DeviceEvent::Updated { .. } => "device-updated",
            DeviceEvent::Deleted { .. } => "device-deleted",
            DeviceEvent::Ping { .. } => "device-ping",
        }
    }

    pub fn device_id(&self) -> &str {
        match self {
            DeviceEvent::Added { device }
            | DeviceEvent::Updated { device }
            | DeviceEvent::Ping { device } => &device.id,
            DeviceEvent::Deleted { id } => id,
        }
    }

    /// JSON text frame payload
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
