/// Log tags identify the subsystem a message comes from.
///
/// Each tag maps to a `--debug-<key>` flag that enables its DEBUG output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Config,
    Devices,
    Database,
    Broadcast,
    Webserver,
    Auth,
    Other(String),
}

impl LogTag {
    /// Key used by `--debug-<key>` flags
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::System => "system".to_string(),
            LogTag::Config => "config".to_string(),
            LogTag::Devices => "devices".to_string(),
            LogTag::Database => "database".to_string(),
            LogTag::Broadcast => "broadcast".to_string(),
            LogTag::Webserver => "webserver".to_string(),
            LogTag::Auth => "auth".to_string(),
            LogTag::Other(name) => name.to_lowercase(),
        }
    }

    /// Uncolored label for the log file
    pub fn to_plain_string(&self) -> String {
        match self {
            LogTag::Other(name) => name.to_uppercase(),
            other => other.to_debug_key().to_uppercase(),
        }
    }

    /// All built-in tags, used when --debug-all is set
    pub fn all_keys() -> &'static [&'static str] {
        &[
            "system",
            "config",
            "devices",
            "database",
            "broadcast",
            "webserver",
            "auth",
        ]
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_plain_string())
    }
}
