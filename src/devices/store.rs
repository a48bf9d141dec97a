/// In-memory device store with explicit unique indexes
///
/// The primary map and both indexes (mac → id, serial → id) sit behind one
/// lock. Writers are serialized by a separate async gate that is held across
/// the backend round-trip, so the uniqueness check, the durable write and the
/// in-memory commit form one critical section while readers only ever wait on
/// the short in-memory lock. Backend writes run on the blocking pool; if one
/// fails the in-memory state is left untouched.
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::db::DeviceBackend;
use super::types::{Device, DeviceFilter, DeviceStats, DeviceStatus};
use crate::errors::{DeviceError, DeviceResult};
use crate::logger::{self, LogTag};

struct Entry {
    /// Insertion sequence, used for creation-order listing
    seq: u64,
    device: Device,
}

#[derive(Default)]
struct StoreInner {
    devices: HashMap<String, Entry>,
    by_mac: HashMap<String, String>,
    by_serial: HashMap<String, String>,
    next_seq: u64,
}

impl StoreInner {
    /// Reject if mac or serial belongs to a record other than `self_id`
    fn check_unique(&self, device: &Device, self_id: Option<&str>) -> DeviceResult<()> {
        if let Some(owner) = self.by_mac.get(&device.mac_address) {
            if Some(owner.as_str()) != self_id {
                return Err(DeviceError::duplicate("macAddress", &device.mac_address));
            }
        }
        if let Some(owner) = self.by_serial.get(&device.serial_number) {
            if Some(owner.as_str()) != self_id {
                return Err(DeviceError::duplicate(
                    "serialNumber",
                    &device.serial_number,
                ));
            }
        }
        Ok(())
    }

    fn index(&mut self, device: &Device) {
        self.by_mac
            .insert(device.mac_address.clone(), device.id.clone());
        self.by_serial
            .insert(device.serial_number.clone(), device.id.clone());
    }

    fn unindex(&mut self, device: &Device) {
        self.by_mac.remove(&device.mac_address);
        self.by_serial.remove(&device.serial_number);
    }

    fn push(&mut self, device: Device) {
        self.index(&device);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.devices.insert(device.id.clone(), Entry { seq, device });
    }
}

/// Durable write handed to the blocking pool
enum BackendWrite {
    Save(Device),
    Remove(String),
}

pub struct DeviceStore {
    inner: RwLock<StoreInner>,
    backend: Option<Arc<dyn DeviceBackend>>,
    writer: Mutex<()>,
}

impl DeviceStore {
    /// Store without durability (tests, `persistence_enabled = false`)
    pub fn in_memory() -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            backend: None,
            writer: Mutex::new(()),
        }
    }

    /// Store hydrated from `backend`, writing through to it afterwards
    pub fn with_backend(backend: Arc<dyn DeviceBackend>) -> DeviceResult<Self> {
        let mut inner = StoreInner::default();
        for device in backend.load_all()? {
            if let Err(e) = inner.check_unique(&device, None) {
                logger::warning(
                    LogTag::Database,
                    &format!("Skipping stored device {}: {}", device.id, e),
                );
                continue;
            }
            inner.push(device);
        }

        logger::info(
            LogTag::Devices,
            &format!("Loaded {} devices from storage", inner.devices.len()),
        );

        Ok(Self {
            inner: RwLock::new(inner),
            backend: Some(backend),
            writer: Mutex::new(()),
        })
    }

    pub fn is_persistent(&self) -> bool {
        self.backend.is_some()
    }

    async fn write_through(&self, write: BackendWrite) -> DeviceResult<()> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };
        let backend = Arc::clone(backend);

        tokio::task::spawn_blocking(move || match write {
            BackendWrite::Save(device) => backend.save(&device),
            BackendWrite::Remove(id) => backend.remove(&id),
        })
        .await
        .map_err(|e| DeviceError::Internal(format!("Storage task failed: {}", e)))?
    }

    pub async fn insert(&self, device: Device) -> DeviceResult<Device> {
        let _writer = self.writer.lock().await;
        {
            let inner = self.inner.read();
            if inner.devices.contains_key(&device.id) {
                return Err(DeviceError::duplicate("id", &device.id));
            }
            inner.check_unique(&device, None)?;
        }

        self.write_through(BackendWrite::Save(device.clone())).await?;

        self.inner.write().push(device.clone());
        Ok(device)
    }

    pub fn get(&self, id: &str) -> DeviceResult<Device> {
        self.inner
            .read()
            .devices
            .get(id)
            .map(|entry| entry.device.clone())
            .ok_or_else(|| DeviceError::NotFound(id.to_string()))
    }

    /// Apply `mutate` to a copy of the record and commit it atomically
    ///
    /// The closure may reject the change; uniqueness is re-checked against
    /// every other record before the copy replaces the original.
    pub async fn update<F>(&self, id: &str, mutate: F) -> DeviceResult<Device>
    where
        F: FnOnce(&mut Device) -> DeviceResult<()>,
    {
        let _writer = self.writer.lock().await;
        let current = self.get(id)?;

        let mut next = current.clone();
        mutate(&mut next)?;
        // id is immutable
        next.id = current.id.clone();
        self.inner.read().check_unique(&next, Some(id))?;

        self.write_through(BackendWrite::Save(next.clone())).await?;

        let mut inner = self.inner.write();
        inner.unindex(&current);
        inner.index(&next);
        if let Some(entry) = inner.devices.get_mut(id) {
            entry.device = next.clone();
        }
        Ok(next)
    }

    pub async fn delete(&self, id: &str) -> DeviceResult<Device> {
        let _writer = self.writer.lock().await;
        if !self.inner.read().devices.contains_key(id) {
            return Err(DeviceError::NotFound(id.to_string()));
        }

        self.write_through(BackendWrite::Remove(id.to_string())).await?;

        let mut inner = self.inner.write();
        let entry = inner
            .devices
            .remove(id)
            .ok_or_else(|| DeviceError::NotFound(id.to_string()))?;
        inner.unindex(&entry.device);
        Ok(entry.device)
    }

    /// Matching records in creation order
    pub fn list(&self, filter: &DeviceFilter) -> Vec<Device> {
        let inner = self.inner.read();
        let mut matched: Vec<&Entry> = inner
            .devices
            .values()
            .filter(|entry| filter.matches(&entry.device))
            .collect();
        matched.sort_by(|a, b| a.seq.cmp(&b.seq).then_with(|| a.device.id.cmp(&b.device.id)));
        matched.into_iter().map(|entry| entry.device.clone()).collect()
    }

    /// Status counts from one pass under a single read lock
    pub fn stats(&self) -> DeviceStats {
        let inner = self.inner.read();
        let mut stats = DeviceStats {
            total: inner.devices.len(),
            ..DeviceStats::default()
        };
        for entry in inner.devices.values() {
            match entry.device.status {
                DeviceStatus::Active => stats.active += 1,
                DeviceStatus::Inactive => stats.inactive += 1,
                DeviceStatus::Available => stats.available += 1,
            }
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.inner.read().devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::db::SqliteBackend;
    use crate::devices::types::{NewDevice, DEFAULT_CATEGORY};
    use std::time::{Duration, Instant};

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

    /// Backend that fails every write once armed, and can be made slow
    #[derive(Default)]
    struct FlakyBackend {
        fail: parking_lot::Mutex<bool>,
        delay: Option<Duration>,
    }

    impl FlakyBackend {
        fn write(&self) -> DeviceResult<()> {
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            if *self.fail.lock() {
                return Err(DeviceError::Internal("disk full".into()));
            }
            Ok(())
        }
    }

    impl DeviceBackend for FlakyBackend {
        fn load_all(&self) -> DeviceResult<Vec<Device>> {
            Ok(Vec::new())
        }
        fn save(&self, _device: &Device) -> DeviceResult<()> {
            self.write()
        }
        fn remove(&self, _id: &str) -> DeviceResult<()> {
            self.write()
        }
    }

    #[tokio::test]
    async fn test_duplicate_mac_rejected() {
        let store = DeviceStore::in_memory();
        store.insert(device("AA:BB", "S1")).await.unwrap();
        let err = store.insert(device("AA:BB", "S2")).await.unwrap_err();
        assert_eq!(err, DeviceError::duplicate("macAddress", "AA:BB"));
        assert_eq!(store.len(), 1);

        let err = store.insert(device("CC:DD", "S1")).await.unwrap_err();
        assert_eq!(err, DeviceError::duplicate("serialNumber", "S1"));
    }

    #[tokio::test]
    async fn test_update_rechecks_uniqueness() {
        let store = DeviceStore::in_memory();
        let a = store.insert(device("AA:01", "S1")).await.unwrap();
        store.insert(device("AA:02", "S2")).await.unwrap();

        let err = store
            .update(&a.id, |d| {
                d.mac_address = "AA:02".into();
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::DuplicateKey { .. }));
        assert_eq!(store.get(&a.id).unwrap().mac_address, "AA:01");

        // Keeping its own mac is fine, and the old mac is released on change
        store
            .update(&a.id, |d| {
                d.mac_address = "AA:09".into();
                Ok(())
            })
            .await
            .unwrap();
        store.insert(device("AA:01", "S3")).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_ids() {
        let store = DeviceStore::in_memory();
        store.insert(device("AA:01", "S1")).await.unwrap();
        assert!(matches!(store.get("nope"), Err(DeviceError::NotFound(_))));
        assert!(matches!(
            store.delete("nope").await,
            Err(DeviceError::NotFound(_))
        ));
        assert!(matches!(
            store.update("nope", |_| Ok(())).await,
            Err(DeviceError::NotFound(_))
        ));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_list_creation_order_and_filters() {
        let store = DeviceStore::in_memory();
        let mut ids = Vec::new();
        for i in 0..5 {
            let d = store
                .insert(device(&format!("AA:0{}", i), &format!("SN{}", i)))
                .await
                .unwrap();
            ids.push(d.id);
        }

        let listed: Vec<String> = store
            .list(&DeviceFilter::default())
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(listed, ids);

        store
            .update(&ids[2], |d| {
                d.status = DeviceStatus::Inactive;
                Ok(())
            })
            .await
            .unwrap();
        let inactive = store.list(&DeviceFilter {
            status: Some(DeviceStatus::Inactive),
            search: None,
        });
        assert_eq!(inactive.len(), 1);
        assert_eq!(inactive[0].id, ids[2]);

        let searched = store.list(&DeviceFilter {
            status: None,
            search: Some("sn3".into()),
        });
        assert_eq!(searched.len(), 1);
    }

    #[tokio::test]
    async fn test_backend_failure_leaves_memory_untouched() {
        let backend = Arc::new(FlakyBackend::default());
        let store = DeviceStore::with_backend(backend.clone()).unwrap();
        let d = store.insert(device("AA:01", "S1")).await.unwrap();

        *backend.fail.lock() = true;
        assert!(store
            .insert(device("AA:02", "S2"))
            .await
            .unwrap_err()
            .is_internal());
        assert!(store
            .update(&d.id, |d| {
                d.category = "Scanners".into();
                Ok(())
            })
            .await
            .unwrap_err()
            .is_internal());
        assert!(store.delete(&d.id).await.unwrap_err().is_internal());

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&d.id).unwrap().category, DEFAULT_CATEGORY);
        // the rejected mac was never indexed
        *backend.fail.lock() = false;
        store.insert(device("AA:02", "S2")).await.unwrap();
    }

    #[tokio::test]
    async fn test_slow_backend_does_not_block_runtime_or_readers() {
        let backend = Arc::new(FlakyBackend {
            delay: Some(Duration::from_millis(300)),
            ..FlakyBackend::default()
        });
        let store = Arc::new(DeviceStore::with_backend(backend).unwrap());

        let writer = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.insert(device("AA:01", "S1")).await }
        });

        // single-threaded runtime: a timer only fires if the worker is free
        let started = Instant::now();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(started.elapsed() < Duration::from_millis(250));

        assert!(!writer.is_finished());
        assert_eq!(store.len(), 0);
        assert_eq!(store.stats().total, 0);

        writer.await.unwrap().unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_hydrates_from_sqlite() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("devices.db");
        let id = {
            let backend = Arc::new(SqliteBackend::open(&path).unwrap());
            let store = DeviceStore::with_backend(backend).unwrap();
            store.insert(device("AA:01", "S1")).await.unwrap();
            store.insert(device("AA:02", "S2")).await.unwrap().id
        };

        let backend = Arc::new(SqliteBackend::open(&path).unwrap());
        let store = DeviceStore::with_backend(backend).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(&id).unwrap().mac_address, "AA:02");
        assert!(store.insert(device("AA:02", "S9")).await.is_err());
    }

    #[tokio::test]
    async fn test_stats() {
        let store = DeviceStore::in_memory();
        let a = store.insert(device("AA:01", "S1")).await.unwrap();
        store.insert(device("AA:02", "S2")).await.unwrap();
        store
            .update(&a.id, |d| {
                d.status = DeviceStatus::Active;
                d.assigned_to = Some("bob".into());
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(
            store.stats(),
            DeviceStats {
                total: 2,
                active: 1,
                inactive: 0,
                available: 1
            }
        );
    }
}
