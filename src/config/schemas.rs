/// Configuration schemas - every config section defined once with defaults
use crate::config_struct;

// ============================================================================
// WEBSERVER
// ============================================================================

config_struct! {
    /// HTTP / WebSocket listener settings
    pub struct WebserverConfig {
        host: String = "127.0.0.1".to_string(),
        port: u16 = 5000,
        cors_enabled: bool = true,
    }
}

// ============================================================================
// ACCESS GATE
// ============================================================================

config_struct! {
    /// Token issuance and the single configured admin credential
    pub struct AuthConfig {
        /// HS256 signing secret; a random one is generated when empty
        jwt_secret: String = String::new(),
        token_expiry_secs: u64 = 3600,
        admin_login: String = "admin".to_string(),
        /// argon2 PHC string; login is refused while this is empty
        admin_password_hash: String = String::new(),
    }
}

// ============================================================================
// DEVICES
// ============================================================================

config_struct! {
    pub struct DevicesConfig {
        persistence_enabled: bool = true,
        /// Relative paths resolve against the data directory
        database_file: String = "devices.db".to_string(),
        default_category: String = crate::devices::DEFAULT_CATEGORY.to_string(),
    }
}

// ============================================================================
// BROADCAST
// ============================================================================

config_struct! {
    /// Broadcast hub and WebSocket observer settings
    pub struct BroadcastConfig {
        /// Bounded queue per observer; a full queue drops the event for that observer
        observer_buffer_size: usize = 256,
        heartbeat_secs: u64 = 30,
        client_idle_timeout_secs: u64 = 120,
    }
}

config_struct! {
    /// Root configuration (`config.toml`)
    pub struct Config {
        webserver: WebserverConfig = WebserverConfig::default(),
        auth: AuthConfig = AuthConfig::default(),
        devices: DevicesConfig = DevicesConfig::default(),
        broadcast: BroadcastConfig = BroadcastConfig::default(),
    }
}
