//! Centralized path resolution for the device tracker
//!
//! All file and directory paths are resolved through this module so the
//! config loader, the SQLite backend and the file logger agree on locations.
//!
//! ## Path Strategy
//!
//! The base directory is `--data-dir <path>` when given, otherwise the
//! platform data directory:
//! - **macOS**: `~/Library/Application Support/DeviceTracker/`
//! - **Windows**: `%LOCALAPPDATA%\DeviceTracker\`
//! - **Linux**: `$XDG_DATA_HOME/DeviceTracker/` (fallback `~/.local/share/DeviceTracker/`)
//!
//! ## Directory Structure
//!
//! ```text
//! DeviceTracker/
//! ├── data/
//! │ ├── config.toml
//! │ └── devices.db (+ -wal/-shm)
//! └── logs/
//!   └── device_tracker_*.log
//! ```

use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::arguments::get_data_dir_override;

// =============================================================================
// BASE DIRECTORY RESOLUTION
// =============================================================================

static INITIALIZED: AtomicBool = AtomicBool::new(false);

static BASE_DIRECTORY: Lazy<PathBuf> = Lazy::new(|| {
    let base_dir = resolve_base_directory();
    INITIALIZED.store(true, Ordering::SeqCst);
    base_dir
});

fn resolve_base_directory() -> PathBuf {
    const APP_DIR: &str = "DeviceTracker";

    if let Some(dir) = get_data_dir_override() {
        return PathBuf::from(dir);
    }

    if let Some(dir) = dirs::data_local_dir() {
        return dir.join(APP_DIR);
    }

    if let Some(dir) = dirs::data_dir() {
        return dir.join(APP_DIR);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(APP_DIR);
    }

    PathBuf::from(APP_DIR)
}

// =============================================================================
// DIRECTORY ACCESSORS
// =============================================================================

pub fn get_base_directory() -> PathBuf {
    BASE_DIRECTORY.clone()
}

/// Contains the config file and the device database.
pub fn get_data_directory() -> PathBuf {
    BASE_DIRECTORY.join("data")
}

/// Contains one log file per day.
pub fn get_logs_directory() -> PathBuf {
    BASE_DIRECTORY.join("logs")
}

/// Returns the main configuration file path (`--config` wins when given)
pub fn get_config_path() -> PathBuf {
    match crate::arguments::get_config_path_override() {
        Some(path) => PathBuf::from(path),
        None => get_data_directory().join("config.toml"),
    }
}

/// Resolves the configured database file against the data directory.
/// Absolute paths are used as-is.
pub fn resolve_database_path(database_file: &str) -> PathBuf {
    let path = Path::new(database_file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        get_data_directory().join(path)
    }
}

// =============================================================================
// DIRECTORY CREATION
// =============================================================================

/// Ensures the base, data and logs directories exist
///
/// Runs before the logger is initialized, so progress goes to stderr.
pub fn ensure_all_directories() -> Result<(), String> {
    if !is_initialized() {
        eprintln!("Base directory: {}", get_base_directory().display());
    }

    let dirs_to_create = vec![
        ("base", get_base_directory()),
        ("data", get_data_directory()),
        ("logs", get_logs_directory()),
    ];

    for (name, dir) in dirs_to_create {
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                format!(
                    "Failed to create {} directory at {}: {}",
                    name,
                    dir.display(),
                    e
                )
            })?;

            eprintln!("Created directory: {}", dir.display());
        }
    }

    Ok(())
}

pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subdirectories_under_base() {
        let base = get_base_directory();
        assert!(!base.as_os_str().is_empty());
        assert!(get_data_directory().starts_with(&base));
        assert!(get_logs_directory().starts_with(&base));
    }

    #[test]
    fn test_database_path_resolution() {
        let relative = resolve_database_path("devices.db");
        assert!(relative.starts_with(get_data_directory()));
        assert_eq!(relative.file_name().unwrap(), "devices.db");

        let absolute = resolve_database_path("/tmp/fleet.db");
        assert_eq!(absolute, PathBuf::from("/tmp/fleet.db"));
    }
}
