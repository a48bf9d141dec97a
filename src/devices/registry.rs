/// Device registry - lifecycle rules on top of the store
///
/// Every mutation runs under a registry-wide write gate: the store commit and
/// the hand-off to the broadcast hub happen in the same critical section, so
/// the event order seen by observers equals the commit order. Publishing only
/// enqueues, and a failed publish never rolls back the committed change.
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::store::DeviceStore;
use super::types::{
    Device, DeviceFilter, DeviceStats, DeviceStatus, DeviceUpdate, NewDevice, DEFAULT_CATEGORY,
};
use crate::broadcast::{BroadcastHub, DeviceEvent};
use crate::errors::{DeviceError, DeviceResult};
use crate::logger::{self, LogTag};

pub struct DeviceRegistry {
    store: Arc<DeviceStore>,
    hub: Arc<BroadcastHub>,
    write_gate: Mutex<()>,
    default_category: String,
}

impl DeviceRegistry {
    pub fn new(store: Arc<DeviceStore>, hub: Arc<BroadcastHub>) -> Self {
        Self {
            store,
            hub,
            write_gate: Mutex::new(()),
            default_category: DEFAULT_CATEGORY.to_string(),
        }
    }

    pub fn with_default_category(mut self, category: impl Into<String>) -> Self {
        let category = category.into();
        if !category.trim().is_empty() {
            self.default_category = category;
        }
        self
    }

    fn emit(&self, event: DeviceEvent) {
        let event_type = event.event_type();
        let id = event.device_id().to_string();
        if !self.hub.publish(event) {
            logger::debug(
                LogTag::Broadcast,
                &format!("Event {} for {} not queued (hub closed)", event_type, id),
            );
        }
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Create a device; status always starts Available
    pub async fn create(&self, input: NewDevice) -> DeviceResult<Device> {
        let device = Device::from_new(input, &self.default_category)?;

        let _gate = self.write_gate.lock().await;
        let device = self.store.insert(device).await?;
        self.emit(DeviceEvent::Added {
            device: device.clone(),
        });

        logger::info(
            LogTag::Devices,
            &format!(
                "Device registered: {} (mac={}, serial={})",
                device.id, device.mac_address, device.serial_number
            ),
        );
        Ok(device)
    }

    /// Replace identity/descriptive fields; status and assignment are untouched
    pub async fn update(&self, id: &str, changes: DeviceUpdate) -> DeviceResult<Device> {
        changes.validate()?;

        let _gate = self.write_gate.lock().await;
        let device = self.store.update(id, |device| {
            changes.apply(device, &self.default_category);
            device.updated_at = Utc::now();
            Ok(())
        })
        .await?;
        self.emit(DeviceEvent::Updated {
            device: device.clone(),
        });

        logger::debug(LogTag::Devices, &format!("Device updated: {}", device.id));
        Ok(device)
    }

    /// Any status → Active, assigned to `assignee`
    pub async fn assign(&self, id: &str, assignee: &str) -> DeviceResult<Device> {
        let assignee = assignee.trim();
        if assignee.is_empty() {
            return Err(DeviceError::validation("assignedTo is required"));
        }

        let _gate = self.write_gate.lock().await;
        let device = self.store.update(id, |device| {
            let now = Utc::now();
            device.status = DeviceStatus::Active;
            device.assigned_to = Some(assignee.to_string());
            device.last_assigned_at = Some(now);
            device.updated_at = now;
            Ok(())
        })
        .await?;
        self.emit(DeviceEvent::Updated {
            device: device.clone(),
        });

        logger::info(
            LogTag::Devices,
            &format!("Device {} assigned to {}", device.id, assignee),
        );
        Ok(device)
    }

    /// Any status → Available, assignment cleared
    pub async fn unassign(&self, id: &str) -> DeviceResult<Device> {
        self.release(id, DeviceStatus::Available).await
    }

    /// Any status → Inactive, assignment cleared
    pub async fn set_inactive(&self, id: &str) -> DeviceResult<Device> {
        self.release(id, DeviceStatus::Inactive).await
    }

    async fn release(&self, id: &str, status: DeviceStatus) -> DeviceResult<Device> {
        let _gate = self.write_gate.lock().await;
        let device = self.store.update(id, |device| {
            device.status = status;
            device.assigned_to = None;
            device.updated_at = Utc::now();
            Ok(())
        })
        .await?;
        self.emit(DeviceEvent::Updated {
            device: device.clone(),
        });

        logger::info(
            LogTag::Devices,
            &format!("Device {} is now {}", device.id, status),
        );
        Ok(device)
    }

    /// Record a heartbeat. Without a wifi value the last known one is kept.
    pub async fn ping(&self, id: &str, current_wifi: Option<String>) -> DeviceResult<Device> {
        let _gate = self.write_gate.lock().await;
        let device = self.store.update(id, |device| {
            let now = Utc::now();
            device.last_ping = Some(now);
            if let Some(wifi) = current_wifi {
                device.current_wifi = Some(wifi);
            }
            device.updated_at = now;
            Ok(())
        })
        .await?;
        self.emit(DeviceEvent::Ping {
            device: device.clone(),
        });

        logger::debug(
            LogTag::Devices,
            &format!(
                "Ping from {} (wifi={})",
                device.id,
                device.current_wifi.as_deref().unwrap_or("-")
            ),
        );
        Ok(device)
    }

    /// Permanently remove a device; returns the removed id
    pub async fn delete(&self, id: &str) -> DeviceResult<String> {
        let _gate = self.write_gate.lock().await;
        let device = self.store.delete(id).await?;
        self.emit(DeviceEvent::Deleted {
            id: device.id.clone(),
        });

        logger::info(
            LogTag::Devices,
            &format!("Device deleted: {} (mac={})", device.id, device.mac_address),
        );
        Ok(device.id)
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn get(&self, id: &str) -> DeviceResult<Device> {
        self.store.get(id)
    }

    pub fn list(&self, filter: &DeviceFilter) -> Vec<Device> {
        self.store.list(filter)
    }

    pub fn stats(&self) -> DeviceStats {
        self.store.stats()
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }
}
