//! Device registry
//!
//! - `types`: the device record and request shapes
//! - `store`: keyed collection with unique mac/serial indexes
//! - `db`: SQLite write-through backend
//! - `registry`: lifecycle operations that publish change events

pub mod db;
pub mod registry;
pub mod store;
pub mod types;

pub use db::{DeviceBackend, SqliteBackend};
pub use registry::DeviceRegistry;
pub use store::DeviceStore;
pub use types::{
    Device, DeviceFilter, DeviceStats, DeviceStatus, DeviceUpdate, NewDevice, DEFAULT_CATEGORY,
};
