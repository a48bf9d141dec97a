//! Structured logging for the device tracker
//!
//! This module provides a small, ergonomic logging API with:
//! - Automatic debug mode filtering from command-line arguments
//! - Standard log levels (Error/Warning/Info/Debug/Verbose)
//! - Per-subsystem debug control via --debug-<tag> flags
//! - Dual output: colored console + file persistence
//!
//! ## Usage
//!
//! ```rust
//! use device_tracker::logger::{self, LogTag};
//!
//! logger::error(LogTag::Database, "Failed to open devices.db");
//! logger::warning(LogTag::Auth, "Login rejected for 'admin'");
//! logger::info(LogTag::Devices, "Device registered");
//! logger::debug(LogTag::Broadcast, "Delivered event to 3 observers"); // Only if --debug-broadcast
//! logger::verbose(LogTag::Webserver, "Raw frame: ..."); // Only if --verbose
//! ```
//!
//! ## Initialization
//!
//! Call once at startup (in run.rs):
//! ```rust
//! device_tracker::logger::init();
//! ```

mod config;
mod core;
mod file;
mod format;
mod levels;
mod tags;

pub use config::{get_logger_config, init_from_args, set_logger_config, LoggerConfig};
pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger system
///
/// Parses debug flags from the command line, then opens the log file.
/// Call once before starting services.
pub fn init() {
    config::init_from_args();
    file::init_file_logging();
}

/// Log at ERROR level (always shown)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level (shown even with --quiet)
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level (standard operations)
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level
///
/// Debug logs are ONLY shown when the matching --debug-<tag> flag (or --debug-all) is provided.
///
/// # Example
/// ```rust
/// // Only shown with --debug-devices
/// device_tracker::logger::debug(device_tracker::logger::LogTag::Devices, "index rebuilt");
/// ```
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level (only with --verbose)
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

/// Force flush all pending log writes
///
/// Call this during shutdown to ensure all logs are written to disk.
pub fn flush() {
    file::flush_file_logging();
}
