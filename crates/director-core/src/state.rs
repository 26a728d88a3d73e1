//! Process-wide shared state.
//!
//! [`StateStore`] guards one [`SharedState`] behind a single lock so readers
//! never observe a half-applied update. The store never broadcasts; callers
//! compose events from the values they just wrote.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::cue::CueRecord;
use crate::errors::ValidationError;

/// Where the lighting console session is connected to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleEndpoint {
    /// Console host name or IP address.
    pub host: String,
    /// Console port.
    pub port: u16,
    /// Remote protocol (`telnet`).
    pub protocol: String,
}

/// Snapshot of everything realtime clients care about.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedState {
    /// Whether a console session is live.
    pub console_connected: bool,
    /// Whether audio monitoring is running.
    pub monitoring_active: bool,
    /// Last detected tempo in BPM. Never negative.
    pub current_tempo: f64,
    /// Cue currently loaded, if any.
    pub active_cue: Option<CueRecord>,
    /// Endpoint of the live console session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console: Option<ConsoleEndpoint>,
    /// Input device used for monitoring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_device: Option<String>,
}

/// Lock-guarded owner of [`SharedState`].
#[derive(Debug, Default)]
pub struct StateStore {
    inner: RwLock<SharedState>,
}

impl StateStore {
    /// Create a store holding the startup defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consistent copy of the current state.
    pub fn get(&self) -> SharedState {
        self.inner.read().clone()
    }

    /// Set the console connection flag. Clears the endpoint when `false`.
    pub fn set_console_connected(&self, connected: bool) {
        let mut state = self.inner.write();
        state.console_connected = connected;
        if !connected {
            state.console = None;
        }
    }

    /// Set the monitoring flag. Clears the device when `false`.
    pub fn set_monitoring(&self, active: bool) {
        let mut state = self.inner.write();
        state.monitoring_active = active;
        if !active {
            state.audio_device = None;
        }
    }

    /// Store a new tempo. Rejects negative and non-finite values.
    pub fn set_tempo(&self, bpm: f64) -> Result<(), ValidationError> {
        validate_tempo(bpm)?;
        self.inner.write().current_tempo = bpm;
        Ok(())
    }

    /// Store a tempo sample taken while monitoring. Returns `true` when the
    /// value was written, `false` when monitoring is off or the change is
    /// within `min_change` BPM.
    pub fn record_tempo(&self, bpm: f64, min_change: f64) -> Result<bool, ValidationError> {
        validate_tempo(bpm)?;
        let mut state = self.inner.write();
        if !state.monitoring_active || (bpm - state.current_tempo).abs() <= min_change {
            return Ok(false);
        }
        state.current_tempo = bpm;
        Ok(true)
    }

    /// Replace the active cue.
    pub fn set_active_cue(&self, cue: Option<CueRecord>) {
        self.inner.write().active_cue = cue;
    }

    /// Apply several field changes under one write lock and return the
    /// resulting state.
    pub fn update<F>(&self, f: F) -> SharedState
    where
        F: FnOnce(&mut SharedState),
    {
        let mut state = self.inner.write();
        f(&mut state);
        state.clone()
    }

    /// Run `f` under the write lock and return what it computed from the
    /// state it saw.
    pub fn modify<R>(&self, f: impl FnOnce(&mut SharedState) -> R) -> R {
        f(&mut self.inner.write())
    }
}

fn validate_tempo(bpm: f64) -> Result<(), ValidationError> {
    if !bpm.is_finite() {
        return Err(ValidationError::new("tempo", "must be a finite number"));
    }
    if bpm < 0.0 {
        return Err(ValidationError::new("tempo", "must not be negative"));
    }
    Ok(())
}
