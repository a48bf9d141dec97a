/// Durable write-through backend for the device store
///
/// `SqliteBackend` keeps one `devices` table keyed by id. The in-memory store
/// enforces uniqueness; the table's UNIQUE constraints only back it up.
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::time::Duration;

use super::types::{Device, DeviceStatus};
use crate::errors::{DeviceError, DeviceResult};
use crate::logger::{self, LogTag};

/// Storage contract the store writes through to
pub trait DeviceBackend: Send + Sync {
    /// All records in insertion order
    fn load_all(&self) -> DeviceResult<Vec<Device>>;
    /// Insert or replace by id
    fn save(&self, device: &Device) -> DeviceResult<()>;
    fn remove(&self, id: &str) -> DeviceResult<()>;
}

pub struct SqliteBackend {
    conn: Mutex<Connection>,
    database_path: String,
}

impl SqliteBackend {
    pub fn open(path: &Path) -> Result<Self, String> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create database directory: {}", e))?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| format!("Failed to open devices database {}: {}", path.display(), e))?;

        let backend = Self {
            conn: Mutex::new(conn),
            database_path: path.to_string_lossy().to_string(),
        };
        backend.initialize_schema()?;

        logger::info(
            LogTag::Database,
            &format!("Devices database initialized at {}", backend.database_path),
        );
        Ok(backend)
    }

    fn initialize_schema(&self) -> Result<(), String> {
        let conn = self.conn.lock();

        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
            .map_err(|e| format!("Failed to set journal mode: {}", e))?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(|e| format!("Failed to set synchronous mode: {}", e))?;
        conn.busy_timeout(Duration::from_millis(30_000))
            .map_err(|e| format!("Failed to set busy timeout: {}", e))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS devices (
                id                TEXT PRIMARY KEY,
                mac_address       TEXT NOT NULL UNIQUE,
                serial_number     TEXT NOT NULL UNIQUE,
                category          TEXT NOT NULL,
                wms_login         TEXT NOT NULL,
                status            TEXT NOT NULL,
                assigned_to       TEXT,
                last_ping         TEXT,
                current_wifi      TEXT,
                last_assigned_at  TEXT,
                created_at        TEXT NOT NULL,
                updated_at        TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| format!("Failed to create devices table: {}", e))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_devices_status ON devices(status)",
            [],
        )
        .map_err(|e| format!("Failed to create status index: {}", e))?;

        Ok(())
    }

    pub fn database_path(&self) -> &str {
        &self.database_path
    }
}

fn parse_time(raw: &str) -> DeviceResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DeviceError::Internal(format!("Invalid timestamp '{}': {}", raw, e)))
}

fn parse_opt_time(raw: Option<String>) -> DeviceResult<Option<DateTime<Utc>>> {
    raw.as_deref().map(parse_time).transpose()
}

struct DeviceRow {
    id: String,
    mac_address: String,
    serial_number: String,
    category: String,
    wms_login: String,
    status: String,
    assigned_to: Option<String>,
    last_ping: Option<String>,
    current_wifi: Option<String>,
    last_assigned_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl DeviceRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            mac_address: row.get(1)?,
            serial_number: row.get(2)?,
            category: row.get(3)?,
            wms_login: row.get(4)?,
            status: row.get(5)?,
            assigned_to: row.get(6)?,
            last_ping: row.get(7)?,
            current_wifi: row.get(8)?,
            last_assigned_at: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    fn into_device(self) -> DeviceResult<Device> {
        let status = DeviceStatus::parse(&self.status).ok_or_else(|| {
            DeviceError::Internal(format!(
                "Unknown status '{}' for device {}",
                self.status, self.id
            ))
        })?;
        Ok(Device {
            status,
            last_ping: parse_opt_time(self.last_ping)?,
            last_assigned_at: parse_opt_time(self.last_assigned_at)?,
            created_at: parse_time(&self.created_at)?,
            updated_at: parse_time(&self.updated_at)?,
            id: self.id,
            mac_address: self.mac_address,
            serial_number: self.serial_number,
            category: self.category,
            wms_login: self.wms_login,
            assigned_to: self.assigned_to,
            current_wifi: self.current_wifi,
        })
    }
}

impl DeviceBackend for SqliteBackend {
    fn load_all(&self) -> DeviceResult<Vec<Device>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, mac_address, serial_number, category, wms_login, status,
                    assigned_to, last_ping, current_wifi, last_assigned_at,
                    created_at, updated_at
             FROM devices ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([], DeviceRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(DeviceRow::into_device).collect()
    }

    fn save(&self, device: &Device) -> DeviceResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO devices (
                id, mac_address, serial_number, category, wms_login, status,
                assigned_to, last_ping, current_wifi, last_assigned_at,
                created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(id) DO UPDATE SET
                mac_address = excluded.mac_address,
                serial_number = excluded.serial_number,
                category = excluded.category,
                wms_login = excluded.wms_login,
                status = excluded.status,
                assigned_to = excluded.assigned_to,
                last_ping = excluded.last_ping,
                current_wifi = excluded.current_wifi,
                last_assigned_at = excluded.last_assigned_at,
                updated_at = excluded.updated_at",
            params![
                device.id,
                device.mac_address,
                device.serial_number,
                device.category,
                device.wms_login,
                device.status.as_str(),
                device.assigned_to,
                device.last_ping.map(|t| t.to_rfc3339()),
                device.current_wifi,
                device.last_assigned_at.map(|t| t.to_rfc3339()),
                device.created_at.to_rfc3339(),
                device.updated_at.to_rfc3339(),
            ],
        )?;

        logger::debug(
            LogTag::Database,
            &format!("Saved device {} ({})", device.id, device.mac_address),
        );
        Ok(())
    }

    fn remove(&self, id: &str) -> DeviceResult<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM devices WHERE id = ?1", params![id])?;
        logger::debug(LogTag::Database, &format!("Removed device {}", id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::types::{NewDevice, DEFAULT_CATEGORY};
    use tempfile::TempDir;

    fn device(mac: &str, serial: &str) -> Device {
        Device::from_new(
            NewDevice {
                mac_address: mac.into(),
                serial_number: serial.into(),
                category: None,
                wms_login: "wms".into(),
            },
            DEFAULT_CATEGORY,
        )
        .unwrap()
    }

    #[test]
    fn test_save_load_and_remove() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("devices.db");
        let backend = SqliteBackend::open(&path).unwrap();

        let first = device("AA:01", "S1");
        let mut second = device("AA:02", "S2");
        backend.save(&first).unwrap();
        backend.save(&second).unwrap();

        second.status = DeviceStatus::Active;
        second.assigned_to = Some("alice".into());
        second.last_assigned_at = Some(Utc::now());
        backend.save(&second).unwrap();

        let loaded = backend.load_all().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, first.id);
        assert_eq!(loaded[1].status, DeviceStatus::Active);
        assert_eq!(loaded[1].assigned_to.as_deref(), Some("alice"));

        backend.remove(&first.id).unwrap();
        assert_eq!(backend.load_all().unwrap().len(), 1);
    }

    #[test]
    fn test_reopen_keeps_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("devices.db");
        let original = device("AA:03", "S3");
        {
            let backend = SqliteBackend::open(&path).unwrap();
            backend.save(&original).unwrap();
        }
        let backend = SqliteBackend::open(&path).unwrap();
        let loaded = backend.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].serial_number, "S3");
        assert_eq!(loaded[0].category, DEFAULT_CATEGORY);
    }

    #[test]
    fn test_unique_constraint_backs_up_store() {
        let dir = TempDir::new().unwrap();
        let backend = SqliteBackend::open(&dir.path().join("devices.db")).unwrap();
        backend.save(&device("AA:04", "S4")).unwrap();
        let err = backend.save(&device("AA:04", "S5")).unwrap_err();
        assert!(err.is_internal());
    }
}
