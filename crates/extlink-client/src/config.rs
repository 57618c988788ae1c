use std::collections::HashMap;

use extlink_protocol::{INTERFACE_VERSION, MAX_SCHEMA_VERSION};
use serde_json::Value;

/// Environment variable that turns on per-message tracing.
pub const LOG_MESSAGES_ENV: &str = "EXTLINK_LOG_MESSAGES";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Exact protocol version every inbound message must carry.
    pub interface_version: String,
    /// Newest schema document version accepted at registration.
    pub max_schema_version: String,
    /// Trace every inbound and outbound message at debug level.
    pub log_messages: bool,
    /// Registration `flags` per extension URI.
    pub flags: HashMap<String, Value>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            interface_version: INTERFACE_VERSION.into(),
            max_schema_version: MAX_SCHEMA_VERSION.into(),
            log_messages: false,
            flags: HashMap::new(),
        }
    }
}

impl ClientConfig {
    /// Defaults, with message tracing taken from `EXTLINK_LOG_MESSAGES`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(value) = std::env::var(LOG_MESSAGES_ENV) {
            config.log_messages = env_flag(&value);
        }
        config
    }

    pub fn with_flags(mut self, uri: impl Into<String>, flags: Value) -> Self {
        self.flags.insert(uri.into(), flags);
        self
    }

    pub fn flags_for(&self, uri: &str) -> Value {
        self.flags.get(uri).cloned().unwrap_or(Value::Null)
    }
}

fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_follow_protocol_constants() {
        let config = ClientConfig::default();
        assert_eq!(config.interface_version, "1.0");
        assert_eq!(config.max_schema_version, "1.1");
        assert!(!config.log_messages);
        assert_eq!(config.flags_for("aplext:any"), Value::Null);
    }

    #[test]
    fn flags_are_per_uri() {
        let config = ClientConfig::default().with_flags("aplext:audio:10", json!({"debug": true}));
        assert_eq!(config.flags_for("aplext:audio:10"), json!({"debug": true}));
        assert_eq!(config.flags_for("aplext:other:10"), Value::Null);
    }

    #[test]
    fn env_flag_values() {
        assert!(env_flag("1"));
        assert!(env_flag(" TRUE "));
        assert!(env_flag("on"));
        assert!(!env_flag("0"));
        assert!(!env_flag(""));
    }
}
