/// Shared application state for the webserver
///
/// Holds the registry, the broadcast hub and the access gate. Everything is
/// injected at construction; handlers never reach for process globals.
use std::sync::Arc;

use crate::broadcast::BroadcastHub;
use crate::config::{AuthConfig, BroadcastConfig};
use crate::devices::DeviceRegistry;
use crate::webserver::auth::JwtService;
use crate::webserver::ws::KeepAlive;

/// Shared application state passed to all route handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<DeviceRegistry>,
    pub hub: Arc<BroadcastHub>,
    pub jwt: Arc<JwtService>,

    /// Admin credential for `/api/auth/login`
    pub auth: Arc<AuthConfig>,

    /// Observer socket heartbeat / idle policy
    pub keep_alive: KeepAlive,

    pub cors_enabled: bool,

    /// Server startup time
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        auth: AuthConfig,
        broadcast: &BroadcastConfig,
        cors_enabled: bool,
    ) -> Self {
        let jwt = JwtService::new(&auth.jwt_secret, auth.token_expiry_secs as i64);
        Self {
            hub: Arc::clone(registry.hub()),
            registry,
            jwt: Arc::new(jwt),
            auth: Arc::new(auth),
            keep_alive: KeepAlive::from_config(broadcast),
            cors_enabled,
            startup_time: chrono::Utc::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        (chrono::Utc::now() - self.startup_time)
            .num_seconds()
            .max(0) as u64
    }
}
