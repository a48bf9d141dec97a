/// Logger configuration derived from command-line flags
use super::levels::LogLevel;
use super::tags::LogTag;
use crate::arguments::{get_arg_value, get_cmd_args, is_debug_all_enabled, patterns};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Messages above this level are dropped (Debug is gated separately)
    pub min_level: LogLevel,
    /// Tags with DEBUG output enabled (debug keys)
    pub debug_tags: HashSet<String>,
    pub file_logging_enabled: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_tags: HashSet::new(),
            file_logging_enabled: true,
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG.read().clone()
}

pub fn set_logger_config(config: LoggerConfig) {
    *LOGGER_CONFIG.write() = config;
}

/// Build the logger configuration from the process arguments
///
/// Recognized: `--quiet`, `--verbose`, `--log-level <lvl>`, `--debug-all`,
/// `--debug-<tag>` and `--no-log-file`.
pub fn init_from_args() {
    let mut config = LoggerConfig::default();

    if patterns::is_quiet_mode() {
        config.min_level = LogLevel::Warning;
    }
    if patterns::is_verbose_mode() {
        config.min_level = LogLevel::Verbose;
    }
    if let Some(level) = get_arg_value("--log-level").and_then(|s| LogLevel::parse(&s)) {
        config.min_level = level;
    }

    if is_debug_all_enabled() {
        config
            .debug_tags
            .extend(LogTag::all_keys().iter().map(|k| k.to_string()));
    }
    for arg in get_cmd_args() {
        if let Some(key) = arg.strip_prefix("--debug-") {
            if key != "all" && !key.is_empty() {
                config.debug_tags.insert(key.to_lowercase());
            }
        }
    }

    if get_cmd_args().iter().any(|a| a == "--no-log-file") {
        config.file_logging_enabled = false;
    }

    set_logger_config(config);
}

pub fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    LOGGER_CONFIG.read().debug_tags.contains(&tag.to_debug_key())
}
