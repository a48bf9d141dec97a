use super::schemas::Config;
/// Configuration utilities - loading, overrides, validation and access helpers
///
/// Load order: TOML file (or defaults) → environment (after `.env`) → CLI flags,
/// then validation. The result is stored in the global `CONFIG`.
use crate::arguments::{get_host_override, get_port_override};
use crate::logger::{self, LogTag};
use crate::webserver::auth::hash_password;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use rand::RngCore;
use std::path::Path;

/// Global configuration instance
///
/// Read through `with_config` / `get_config_clone`. Components get their
/// sections passed in at construction; only bootstrap code reads this.
pub static CONFIG: OnceCell<RwLock<Config>> = OnceCell::new();

/// Load configuration from a TOML file and initialize the global CONFIG
///
/// A missing file is not an error: defaults are used and a warning is logged.
pub fn load_config_from_path(path: &Path) -> Result<(), String> {
    let mut config = if path.exists() {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;
        parse_config_str(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?
    } else {
        logger::warning(
            LogTag::Config,
            &format!(
                "Config file '{}' not found, using default values",
                path.display()
            ),
        );
        Config::default()
    };

    dotenv::dotenv().ok();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    apply_cli_overrides(&mut config);
    finalize_config(&mut config)?;

    match CONFIG.get() {
        Some(lock) => *lock.write() = config,
        None => {
            CONFIG
                .set(RwLock::new(config))
                .map_err(|_| "Config already initialized".to_string())?;
        }
    }

    logger::debug(
        LogTag::Config,
        &format!("Configuration loaded from {}", path.display()),
    );
    Ok(())
}

pub fn parse_config_str(contents: &str) -> Result<Config, String> {
    toml::from_str::<Config>(contents).map_err(|e| e.to_string())
}

/// Apply environment variable overrides
///
/// `lookup` is `std::env::var` in production; tests pass a closure over a map.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup("PORT") {
        config.webserver.port = raw
            .trim()
            .parse()
            .map_err(|_| format!("PORT must be a number between 1 and 65535, got '{}'", raw))?;
    }
    if let Some(host) = lookup("HOST") {
        config.webserver.host = host;
    }
    if let Some(secret) = lookup("JWT_SECRET") {
        config.auth.jwt_secret = secret;
    }
    if let Some(login) = lookup("ADMIN_LOGIN") {
        config.auth.admin_login = login;
    }
    if let Some(hash) = lookup("ADMIN_PASSWORD_HASH") {
        config.auth.admin_password_hash = hash;
    }
    // A plain password wins over a stored hash
    if let Some(password) = lookup("ADMIN_PASSWORD") {
        if !password.is_empty() {
            config.auth.admin_password_hash = hash_password(&password)?;
        }
    }
    Ok(())
}

/// `--port` / `--host` win over file and environment
pub fn apply_cli_overrides(config: &mut Config) {
    if let Some(port) = get_port_override() {
        config.webserver.port = port;
    }
    if let Some(host) = get_host_override() {
        config.webserver.host = host;
    }
}

/// Validate the merged configuration and fill generated values
pub fn finalize_config(config: &mut Config) -> Result<(), String> {
    if config.webserver.port == 0 {
        return Err("webserver.port must be between 1 and 65535".to_string());
    }
    if config.broadcast.observer_buffer_size == 0 {
        return Err("broadcast.observer_buffer_size must be at least 1".to_string());
    }
    if config.auth.token_expiry_secs == 0 {
        return Err("auth.token_expiry_secs must be at least 1".to_string());
    }

    if config.auth.jwt_secret.trim().is_empty() {
        config.auth.jwt_secret = generate_secret();
        logger::warning(
            LogTag::Config,
            "No JWT secret configured; generated a per-process secret (tokens will not survive a restart)",
        );
    }

    if config.auth.admin_password_hash.is_empty() {
        logger::warning(
            LogTag::Config,
            "No admin password configured; login is disabled",
        );
    }

    if config.devices.default_category.trim().is_empty() {
        config.devices.default_category = crate::devices::DEFAULT_CATEGORY.to_string();
    }

    Ok(())
}

fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Execute a function with read access to the configuration
///
/// Falls back to defaults when `load_config_from_path` has not run yet.
pub fn with_config<F, R>(f: F) -> R
where
    F: FnOnce(&Config) -> R,
{
    let lock = CONFIG.get_or_init(|| RwLock::new(Config::default()));
    let config = lock.read();
    f(&config)
}

/// Clone of the whole configuration, for use across await points
pub fn get_config_clone() -> Config {
    with_config(|cfg| cfg.clone())
}

/// Write the current configuration to disk as pretty TOML
pub fn save_config(path: &Path) -> Result<(), String> {
    let config_str = with_config(|cfg| {
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))
    })?;

    std::fs::write(path, config_str)
        .map_err(|e| format!("Failed to write config file '{}': {}", path.display(), e))?;

    Ok(())
}
