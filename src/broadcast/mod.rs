//! Real-time broadcast of device changes
//!
//! - `event`: the tagged event payloads
//! - `hub`: observer set, publish queue and dispatcher
//! - `metrics`: delivery counters

pub mod event;
pub mod hub;
pub mod metrics;

pub use event::DeviceEvent;
pub use hub::{BroadcastHub, ObserverId, ObserverReceiver};
pub use metrics::{HubMetrics, HubMetricsSnapshot};
