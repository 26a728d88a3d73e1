//! Console and audio collaborator settings.

use serde::{Deserialize, Serialize};

/// Lighting console session settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsoleSettings {
    /// Budget for opening the console TCP session, in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
        }
    }
}

/// Audio monitoring settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioSettings {
    /// How often the tempo monitor samples the audio engine, in milliseconds.
    pub tempo_poll_interval_ms: u64,
    /// Input devices the audio engine accepts.
    pub devices: Vec<String>,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            tempo_poll_interval_ms: 500,
            devices: vec!["default".to_string()],
        }
    }
}
