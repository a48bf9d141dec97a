/// Centralized argument handling for the device tracker
///
/// All command-line argument parsing and debug flag checking lives here so the
/// logger, config loader and server bootstrap agree on the same flags.
///
/// Features:
/// - Centralized CMD_ARGS storage with thread-safe access
/// - Debug flag checking functions per subsystem
/// - Host/port/config overrides for the server
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage
/// Thread-safe singleton that stores arguments for access throughout the application
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Sets the global command-line arguments
/// Used by tests to override the default env::args() collection
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Gets a copy of the current command-line arguments
/// Returns a vector clone to avoid holding the mutex lock
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => {
            // Fallback to env::args if mutex is poisoned
            env::args().collect()
        }
    }
}

/// Checks if a specific argument is present in the command line
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Gets the value of a command-line argument that follows a flag
/// Returns None if the flag is not found or has no value
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    for (i, arg) in args.iter().enumerate() {
        if arg == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

// =============================================================================
// DEBUG FLAG CHECKING FUNCTIONS
// =============================================================================

/// Enables debug output for every tag
pub fn is_debug_all_enabled() -> bool {
    has_arg("--debug-all")
}

/// Device registry and store debug mode
pub fn is_debug_devices_enabled() -> bool {
    has_arg("--debug-devices")
}

/// Broadcast hub debug mode (per-event delivery logging)
pub fn is_debug_broadcast_enabled() -> bool {
    has_arg("--debug-broadcast")
}

/// Webserver debug mode (connections, routing)
pub fn is_debug_webserver_enabled() -> bool {
    has_arg("--debug-webserver")
}

/// Access gate debug mode
pub fn is_debug_auth_enabled() -> bool {
    has_arg("--debug-auth")
}

/// SQLite persistence debug mode
pub fn is_debug_database_enabled() -> bool {
    has_arg("--debug-database")
}

/// Write a default config file and exit
pub fn is_init_config_enabled() -> bool {
    has_arg("--init-config")
}

// =============================================================================
// SERVER OVERRIDES
// =============================================================================

/// Port override from `--port <n>`
pub fn get_port_override() -> Option<u16> {
    get_arg_value("--port").and_then(|s| s.parse().ok())
}

/// Host override from `--host <ip>`
pub fn get_host_override() -> Option<String> {
    get_arg_value("--host")
}

/// Config file override from `--config <path>`
pub fn get_config_path_override() -> Option<String> {
    get_arg_value("--config")
}

/// Data directory override from `--data-dir <path>`
pub fn get_data_dir_override() -> Option<String> {
    get_arg_value("--data-dir")
}

/// Validates `--port` when present: it must parse and be non-zero
pub fn validate_port_argument() -> Result<(), String> {
    match get_arg_value("--port") {
        None => Ok(()),
        Some(raw) => match raw.parse::<u16>() {
            Ok(0) => Err("--port must be between 1 and 65535".to_string()),
            Ok(_) => Ok(()),
            Err(_) => Err(format!("--port expects a number, got '{}'", raw)),
        },
    }
}

/// Validates `--host` when present: it must be a valid IP address
pub fn validate_host_argument() -> Result<(), String> {
    match get_arg_value("--host") {
        None => Ok(()),
        Some(raw) => raw
            .parse::<std::net::IpAddr>()
            .map(|_| ())
            .map_err(|_| format!("--host expects an IP address, got '{}'", raw)),
    }
}

/// Ports below 1024 need elevated privileges on most systems
pub fn is_privileged_port(port: u16) -> bool {
    port < 1024
}

/// Prints usage information
pub fn print_help() {
    println!("device-tracker - fleet device registry with real-time dashboard updates");
    println!();
    println!("USAGE:");
    println!("    device-tracker [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --config <path>       Path to the TOML configuration file");
    println!("    --data-dir <path>     Base directory for data and logs");
    println!("    --host <ip>           Override webserver bind address");
    println!("    --port <n>            Override webserver port");
    println!("    --init-config         Write a default config file and exit");
    println!("    --log-level <level>   Minimum level: error, warning, info, debug, verbose");
    println!("    --no-log-file         Disable the daily log file");
    println!("    --quiet, -q           Only show warnings and errors");
    println!("    --verbose, -v         Show verbose diagnostics");
    println!("    --help, -h            Show this help");
    println!("    --version, -V         Show version");
    println!();
    println!("DEBUG FLAGS:");
    println!("    --debug-all           Debug output for every subsystem");
    println!("    --debug-devices       Registry and store operations");
    println!("    --debug-broadcast     Hub registration and delivery");
    println!("    --debug-webserver     HTTP and WebSocket connections");
    println!("    --debug-auth          Credential verification");
    println!("    --debug-database      SQLite persistence");
}

/// Returns the names of all enabled debug modes
pub fn get_enabled_debug_modes() -> Vec<&'static str> {
    let mut modes = Vec::new();

    if is_debug_all_enabled() {
        modes.push("all");
    }
    if is_debug_devices_enabled() {
        modes.push("devices");
    }
    if is_debug_broadcast_enabled() {
        modes.push("broadcast");
    }
    if is_debug_webserver_enabled() {
        modes.push("webserver");
    }
    if is_debug_auth_enabled() {
        modes.push("auth");
    }
    if is_debug_database_enabled() {
        modes.push("database");
    }

    modes
}

// =============================================================================
// COMMON ARGUMENT PATTERNS
// =============================================================================

pub mod patterns {
    use super::*;

    /// Checks for help flags
    pub fn is_help_requested() -> bool {
        has_arg("--help") || has_arg("-h")
    }

    /// Checks for version flags
    pub fn is_version_requested() -> bool {
        has_arg("--version") || has_arg("-V")
    }

    /// Checks for quiet/silent mode
    pub fn is_quiet_mode() -> bool {
        has_arg("--quiet") || has_arg("-q")
    }

    /// Checks for verbose mode
    pub fn is_verbose_mode() -> bool {
        has_arg("--verbose") || has_arg("-v")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // CMD_ARGS is process-global, so everything that mutates it runs in one test.
    #[test]
    fn test_args_parsing_and_overrides() {
        set_cmd_args(vec![
            "device-tracker".to_string(),
            "--debug-broadcast".to_string(),
            "--port".to_string(),
            "8081".to_string(),
            "--host".to_string(),
            "not-an-ip".to_string(),
        ]);

        assert!(has_arg("--debug-broadcast"));
        assert!(is_debug_broadcast_enabled());
        assert!(!is_debug_devices_enabled());
        assert_eq!(get_port_override(), Some(8081));
        assert!(validate_port_argument().is_ok());
        assert!(validate_host_argument().is_err());
        assert_eq!(get_enabled_debug_modes(), vec!["broadcast"]);

        set_cmd_args(vec![
            "device-tracker".to_string(),
            "--port".to_string(),
            "0".to_string(),
        ]);
        assert!(validate_port_argument().is_err());
        assert_eq!(get_arg_value("--config"), None);

        set_cmd_args(vec!["device-tracker".to_string()]);
    }

    #[test]
    fn test_privileged_port() {
        assert!(is_privileged_port(80));
        assert!(!is_privileged_port(5000));
    }
}
