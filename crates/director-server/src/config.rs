//! Server configuration.

use std::time::Duration;

use director_settings::DirectorSettings;
use serde::{Deserialize, Serialize};

/// Runtime configuration for [`DirectorServer`](crate::DirectorServer).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Maximum registered realtime sessions.
    pub max_connections: usize,
    /// Per-session outbound queue capacity.
    pub max_send_queue: usize,
    /// Heartbeat interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Close a session after this many seconds without a pong.
    pub heartbeat_timeout_secs: u64,
    /// Upper bound on one socket write, in milliseconds.
    pub send_timeout_ms: u64,
    /// Max inbound WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Tempo monitor sampling interval in milliseconds.
    pub tempo_poll_interval_ms: u64,
}

impl ServerConfig {
    /// Heartbeat interval as a [`Duration`].
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Heartbeat timeout as a [`Duration`].
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    /// Socket write timeout as a [`Duration`].
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Tempo monitor interval as a [`Duration`].
    pub fn tempo_poll_interval(&self) -> Duration {
        Duration::from_millis(self.tempo_poll_interval_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            max_connections: 64,
            max_send_queue: 256,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            send_timeout_ms: 5_000,
            max_message_size: 1024 * 1024,
            tempo_poll_interval_ms: 500,
        }
    }
}

impl From<&DirectorSettings> for ServerConfig {
    fn from(settings: &DirectorSettings) -> Self {
        let server = &settings.server;
        Self {
            host: server.host.clone(),
            port: server.port,
            max_connections: server.max_connections,
            max_send_queue: server.max_send_queue,
            heartbeat_interval_secs: server.heartbeat_interval_secs,
            heartbeat_timeout_secs: server.heartbeat_timeout_secs,
            send_timeout_ms: server.send_timeout_ms,
            max_message_size: server.max_message_size,
            tempo_poll_interval_ms: settings.audio.tempo_poll_interval_ms,
        }
    }
}
