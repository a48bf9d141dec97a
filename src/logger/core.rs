/// Core logging implementation with automatic filtering
///
/// This module contains the central logging logic that:
/// - Checks if a log should be displayed based on level and tag
/// - Delegates to the format module for output
use super::config::{get_logger_config, is_debug_enabled_for_tag};
use super::levels::LogLevel;
use super::tags::LogTag;

/// Check if a log message should be displayed
///
/// Filtering rules:
/// 1. Errors are always shown
/// 2. Check against minimum log level threshold
/// 3. Debug level requires --debug-<tag> (or --debug-all) for that tag
/// 4. Verbose level requires --verbose
pub fn should_log(tag: &LogTag, level: LogLevel) -> bool {
    let config = get_logger_config();

    if level == LogLevel::Error {
        return true;
    }

    // Debug is gated per tag, not by min_level
    if level == LogLevel::Debug {
        return is_debug_enabled_for_tag(tag);
    }

    level <= config.min_level
}

/// Internal logging function with automatic filtering
pub fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(&tag, level) {
        return;
    }

    super::format::format_and_log(tag, level.as_str(), message);
}

#[cfg(test)]
mod tests {
    use super::super::config::{set_logger_config, LoggerConfig};
    use super::*;
    use std::collections::HashSet;

    // Logger config is global; keep all mutation inside one test.
    #[test]
    fn test_filtering_rules() {
        let mut debug_tags = HashSet::new();
        debug_tags.insert("broadcast".to_string());
        set_logger_config(LoggerConfig {
            min_level: LogLevel::Info,
            debug_tags,
            ..LoggerConfig::default()
        });

        assert!(should_log(&LogTag::Devices, LogLevel::Error));
        assert!(should_log(&LogTag::Devices, LogLevel::Info));
        assert!(should_log(&LogTag::Broadcast, LogLevel::Debug));
        assert!(!should_log(&LogTag::Devices, LogLevel::Debug));
        assert!(!should_log(&LogTag::Devices, LogLevel::Verbose));

        set_logger_config(LoggerConfig {
            min_level: LogLevel::Warning,
            ..LoggerConfig::default()
        });
        assert!(!should_log(&LogTag::System, LogLevel::Info));
        assert!(should_log(&LogTag::System, LogLevel::Warning));

        set_logger_config(LoggerConfig::default());
    }
}
