//! Outbound realtime events.
//!
//! Every message pushed to a realtime client is an [`Event`]. The wire form
//! is a JSON object tagged by `type`:
//!
//! ```json
//! {"type":"tempo-update","tempo":128.0}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cue::CueRecord;
use crate::ids::SessionId;
use crate::state::SharedState;

/// Immutable message delivered to realtime clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    /// Console connection changed.
    ConsoleStatus {
        /// New connection flag.
        connected: bool,
        /// Console host when connected.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        host: Option<String>,
    },
    /// Audio monitoring started or stopped.
    MonitoringStatus {
        /// New monitoring flag.
        monitoring: bool,
    },
    /// Detected tempo changed.
    TempoUpdate {
        /// Tempo in BPM.
        tempo: f64,
    },
    /// Active cue changed (`null` when cleared).
    CueStatus {
        /// The new active cue.
        cue: Option<CueRecord>,
    },
    /// Reply to an unrecognized inbound message.
    Echo {
        /// The parsed inbound payload.
        data: Value,
    },
    /// Inbound message could not be handled.
    Error {
        /// Human-readable reason.
        message: String,
    },
    /// Reply to an inbound `ping`.
    Pong {},
    /// Full state snapshot, sent on request.
    State {
        /// Current shared state.
        state: SharedState,
    },
    /// First message on every new channel.
    #[serde(rename_all = "camelCase")]
    ConnectionEstablished {
        /// Identity assigned to the channel.
        session_id: SessionId,
    },
}

impl Event {
    /// Wire name of this event's `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConsoleStatus { .. } => "console-status",
            Self::MonitoringStatus { .. } => "monitoring-status",
            Self::TempoUpdate { .. } => "tempo-update",
            Self::CueStatus { .. } => "cue-status",
            Self::Echo { .. } => "echo",
            Self::Error { .. } => "error",
            Self::Pong {} => "pong",
            Self::State { .. } => "state",
            Self::ConnectionEstablished { .. } => "connection-established",
        }
    }

    /// Convenience constructor for [`Event::Error`].
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
