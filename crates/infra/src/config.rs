//! Configuration loading and representation.
//!
//! | variable | default |
//! |---|---|
//! | `STOCKROOM_DATA_PATH` | unset: in-memory storage |
//! | `REDIS_URL` | `redis://localhost:6379` |
//! | `API_HOST` / `API_PORT` | `0.0.0.0` / `8080` |
//! | `STOCKROOM_NOTIFY_TO` | `stock@made.com` |

use std::path::PathBuf;

pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
pub const DEFAULT_API_HOST: &str = "0.0.0.0";
pub const DEFAULT_API_PORT: u16 = 8080;
pub const DEFAULT_NOTIFICATION_RECIPIENT: &str = "stock@made.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// JSON document backing the store; `None` keeps everything in memory.
    pub data_path: Option<PathBuf>,
    pub redis_url: String,
    pub api_host: String,
    pub api_port: u16,
    /// Who gets out-of-stock notifications.
    pub notification_recipient: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_path: None,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            api_host: DEFAULT_API_HOST.to_string(),
            api_port: DEFAULT_API_PORT,
            notification_recipient: DEFAULT_NOTIFICATION_RECIPIENT.to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; unset or blank values fall back
    /// to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let api_port = match get("API_PORT") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "API_PORT is not a valid port; using {DEFAULT_API_PORT}");
                DEFAULT_API_PORT
            }),
            None => defaults.api_port,
        };

        Self {
            data_path: get("STOCKROOM_DATA_PATH").map(PathBuf::from),
            redis_url: get("REDIS_URL").unwrap_or(defaults.redis_url),
            api_host: get("API_HOST").unwrap_or(defaults.api_host),
            api_port,
            notification_recipient: get("STOCKROOM_NOTIFY_TO").unwrap_or(defaults.notification_recipient),
        }
    }

    /// `host:port` for the HTTP listener.
    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}
