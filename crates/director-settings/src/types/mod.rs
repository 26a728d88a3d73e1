//! Settings type definitions.
//!
//! All types use camelCase on the wire and `#[serde(default)]`, so a
//! settings file only needs the keys it changes.

mod integrations;
mod server;

pub use integrations::*;
pub use server::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "server": { "port": 9000 },
///   "audio": { "devices": ["default", "usb-interface"] }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectorSettings {
    /// HTTP / WebSocket server.
    pub server: ServerSettings,
    /// Lighting console session.
    pub console: ConsoleSettings,
    /// Audio monitoring.
    pub audio: AudioSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl DirectorSettings {
    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let s = &self.server;
        if s.max_connections == 0 {
            return Err(invalid("server.maxConnections must be at least 1"));
        }
        if s.max_send_queue == 0 {
            return Err(invalid("server.maxSendQueue must be at least 1"));
        }
        if s.heartbeat_interval_secs == 0 {
            return Err(invalid("server.heartbeatIntervalSecs must be at least 1"));
        }
        if s.heartbeat_timeout_secs < s.heartbeat_interval_secs {
            return Err(invalid(
                "server.heartbeatTimeoutSecs must not be shorter than the interval",
            ));
        }
        if s.send_timeout_ms == 0 {
            return Err(invalid("server.sendTimeoutMs must be at least 1"));
        }
        if self.audio.tempo_poll_interval_ms < 10 {
            return Err(invalid("audio.tempoPollIntervalMs must be at least 10"));
        }
        if self.audio.devices.is_empty() {
            return Err(invalid("audio.devices must list at least one device"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> SettingsError {
    SettingsError::InvalidValue(msg.to_string())
}
