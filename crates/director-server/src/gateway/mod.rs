//! Request gateway: validated commands that drive the collaborators, update
//! shared state and broadcast the change.
//!
//! Every mutating command runs the same pipeline:
//! validate → collaborator call → state update → broadcast. A validation
//! failure stops before the collaborator; a collaborator failure stops before
//! the state update, so neither leaves a partial change behind.

pub mod commands;
mod errors;

pub use commands::{
    ConnectConsoleRequest, ConsoleCommandRequest, GenerateCueRequest, SetTempoRequest,
    StartMonitoringRequest,
};
pub use errors::GatewayError;

use std::sync::Arc;
use std::time::Instant;

use director_core::{
    CollaboratorError, ConsoleEndpoint, CueRecord, Event, StateStore, ValidationError,
};
use director_integrations::{AudioEngine, ConsoleClient, CueGenerator};
use metrics::counter;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::health::{HealthResponse, health_check};
use crate::metrics::GATEWAY_COMMANDS_TOTAL;
use crate::websocket::broadcast::{BroadcastHub, DeliveryReport};

/// Tempo changes at or below this many BPM are not broadcast.
pub const TEMPO_EPSILON: f64 = 0.01;

/// Result of a mutating command: the reply body plus what the broadcast did.
#[derive(Clone, Debug, PartialEq)]
pub struct Outcome<T> {
    /// Body returned to the caller.
    pub reply: T,
    /// Delivery of the resulting event.
    pub delivery: DeliveryReport,
}

/// Reply carrying only a message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Ack {
    /// Human-readable summary.
    pub message: String,
}

/// Reply to a successful console connect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConsoleConnected {
    /// Human-readable summary.
    pub message: String,
    /// Connected host.
    pub host: String,
    /// Connected port.
    pub port: u16,
}

/// Reply to a successful monitoring start.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MonitoringStarted {
    /// Human-readable summary.
    pub message: String,
    /// Device being captured.
    pub device: String,
}

/// Reply to a tap-tempo command.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TempoSet {
    /// Human-readable summary.
    pub message: String,
    /// Tempo now held by the audio engine.
    pub tempo: f64,
}

/// Reply to a successful cue generation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CueGenerated {
    /// Human-readable summary.
    pub message: String,
    /// The new active cue.
    pub cue: CueRecord,
}

/// `GET /console/status` body.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleStatus {
    /// Whether a console session is live.
    pub connected: bool,
    /// Active cue, if any.
    pub active_cue: Option<CueRecord>,
    /// Connected host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Connected port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// `GET /audio/status` body.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioStatus {
    /// Whether monitoring is running.
    pub monitoring: bool,
    /// Last detected tempo in BPM.
    pub current_tempo: f64,
    /// Device being captured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

/// External collaborators the gateway drives.
#[derive(Clone)]
pub struct Collaborators {
    /// Lighting console session.
    pub console: Arc<dyn ConsoleClient>,
    /// Audio capture and tempo analysis.
    pub audio: Arc<dyn AudioEngine>,
    /// Cue generation.
    pub cues: Arc<dyn CueGenerator>,
}

/// The command surface shared by HTTP routes and background tasks.
///
/// Console commands are serialized by one lock and audio commands by another.
/// Each lock is held across the collaborator call and the broadcast so
/// clients observe status events in command order.
pub struct Gateway {
    state: Arc<StateStore>,
    hub: BroadcastHub,
    collaborators: Collaborators,
    console_op: Mutex<()>,
    audio_op: Mutex<()>,
    started_at: Instant,
}

impl Gateway {
    /// Create a gateway over shared state, a broadcast hub and collaborators.
    pub fn new(state: Arc<StateStore>, hub: BroadcastHub, collaborators: Collaborators) -> Self {
        Self {
            state,
            hub,
            collaborators,
            console_op: Mutex::new(()),
            audio_op: Mutex::new(()),
            started_at: Instant::now(),
        }
    }

    /// Shared state handle.
    pub fn state(&self) -> &Arc<StateStore> {
        &self.state
    }

    /// Broadcast hub handle.
    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    /// Audio engine handle.
    pub fn audio(&self) -> &Arc<dyn AudioEngine> {
        &self.collaborators.audio
    }

    // ── Console ─────────────────────────────────────────────────────

    /// Open a console session and broadcast `console-status`.
    #[instrument(skip_all, fields(host = %request.host, port = request.port))]
    pub async fn connect_console(
        &self,
        request: &ConnectConsoleRequest,
    ) -> Result<Outcome<ConsoleConnected>, GatewayError> {
        const COMMAND: &str = "console.connect";
        validated(COMMAND, request.validate())?;

        let _op = self.console_op.lock().await;
        if let Err(source) = self
            .collaborators
            .console
            .connect(&request.host, request.port)
            .await
        {
            let _ = self.reconcile_console();
            return Err(collaborator_failed(COMMAND, source));
        }

        let _ = self.state.update(|s| {
            s.console_connected = true;
            s.console = Some(ConsoleEndpoint {
                host: request.host.clone(),
                port: request.port,
                protocol: request.protocol.clone(),
            });
        });
        let delivery = self.hub.broadcast(&Event::ConsoleStatus {
            connected: true,
            host: Some(request.host.clone()),
        });
        succeeded(COMMAND);
        info!(recipients = delivery.delivered, "console connected");

        Ok(Outcome {
            reply: ConsoleConnected {
                message: format!("Connected to console at {}:{}", request.host, request.port),
                host: request.host.clone(),
                port: request.port,
            },
            delivery,
        })
    }

    /// Close the console session and broadcast `console-status`.
    #[instrument(skip_all)]
    pub async fn disconnect_console(&self) -> Result<Outcome<Ack>, GatewayError> {
        const COMMAND: &str = "console.disconnect";
        let _op = self.console_op.lock().await;
        self.collaborators
            .console
            .disconnect()
            .await
            .map_err(|source| collaborator_failed(COMMAND, source))?;

        self.state.set_console_connected(false);
        let delivery = self.hub.broadcast(&Event::ConsoleStatus {
            connected: false,
            host: None,
        });
        succeeded(COMMAND);
        info!(recipients = delivery.delivered, "console disconnected");

        Ok(Outcome {
            reply: Ack {
                message: "Disconnected from console".into(),
            },
            delivery,
        })
    }

    /// Send one raw command line over the live console session.
    #[instrument(skip_all)]
    pub async fn send_console_command(
        &self,
        request: &ConsoleCommandRequest,
    ) -> Result<Ack, GatewayError> {
        const COMMAND: &str = "console.command";
        validated(COMMAND, request.validate())?;

        let _op = self.console_op.lock().await;
        if let Err(source) = self
            .collaborators
            .console
            .send_command(&request.command)
            .await
        {
            let _ = self.reconcile_console();
            return Err(collaborator_failed(COMMAND, source));
        }
        succeeded(COMMAND);
        debug!(command = %request.command, "console command sent");

        Ok(Ack {
            message: format!("Sent '{}' to console", request.command),
        })
    }

    /// Clear the console fields and broadcast `console-status` if state says
    /// connected but the client has no session. Caller holds `console_op`.
    fn reconcile_console(&self) -> Option<DeliveryReport> {
        if self.collaborators.console.is_connected() {
            return None;
        }
        let was_connected = self.state.modify(|s| {
            let was_connected = s.console_connected;
            s.console_connected = false;
            s.console = None;
            was_connected
        });
        if !was_connected {
            return None;
        }
        warn!("console session lost, clearing state");
        Some(self.hub.broadcast(&Event::ConsoleStatus {
            connected: false,
            host: None,
        }))
    }

    /// Console connection snapshot.
    pub fn console_status(&self) -> ConsoleStatus {
        let state = self.state.get();
        ConsoleStatus {
            connected: state.console_connected,
            active_cue: state.active_cue,
            host: state.console.as_ref().map(|c| c.host.clone()),
            port: state.console.as_ref().map(|c| c.port),
        }
    }

    // ── Audio ───────────────────────────────────────────────────────

    /// Start audio monitoring and broadcast `monitoring-status`.
    #[instrument(skip_all, fields(device = %request.input_device))]
    pub async fn start_monitoring(
        &self,
        request: &StartMonitoringRequest,
    ) -> Result<Outcome<MonitoringStarted>, GatewayError> {
        const COMMAND: &str = "audio.start";
        validated(COMMAND, request.validate())?;

        let _op = self.audio_op.lock().await;
        self.collaborators
            .audio
            .start(request.to_config())
            .await
            .map_err(|source| collaborator_failed(COMMAND, source))?;

        let _ = self.state.update(|s| {
            s.monitoring_active = true;
            s.audio_device = Some(request.input_device.clone());
        });
        let delivery = self
            .hub
            .broadcast(&Event::MonitoringStatus { monitoring: true });
        succeeded(COMMAND);
        info!(recipients = delivery.delivered, "audio monitoring started");

        Ok(Outcome {
            reply: MonitoringStarted {
                message: "Audio monitoring started".into(),
                device: request.input_device.clone(),
            },
            delivery,
        })
    }

    /// Stop audio monitoring, reset the tempo and broadcast
    /// `monitoring-status`.
    #[instrument(skip_all)]
    pub async fn stop_monitoring(&self) -> Result<Outcome<Ack>, GatewayError> {
        const COMMAND: &str = "audio.stop";
        let _op = self.audio_op.lock().await;
        self.collaborators
            .audio
            .stop()
            .await
            .map_err(|source| collaborator_failed(COMMAND, source))?;

        let previous = self.state.modify(|s| {
            s.monitoring_active = false;
            s.audio_device = None;
            std::mem::take(&mut s.current_tempo)
        });
        let delivery = self
            .hub
            .broadcast(&Event::MonitoringStatus { monitoring: false });
        if previous > TEMPO_EPSILON {
            let _ = self.hub.broadcast(&Event::TempoUpdate { tempo: 0.0 });
        }
        succeeded(COMMAND);
        info!(recipients = delivery.delivered, "audio monitoring stopped");

        Ok(Outcome {
            reply: Ack {
                message: "Audio monitoring stopped".into(),
            },
            delivery,
        })
    }

    /// Monitoring snapshot.
    pub fn audio_status(&self) -> AudioStatus {
        let state = self.state.get();
        AudioStatus {
            monitoring: state.monitoring_active,
            current_tempo: state.current_tempo,
            device: state.audio_device,
        }
    }

    /// Store a tempo sample from the monitor. Broadcasts `tempo-update` only
    /// while monitoring and when the tempo moved by more than
    /// [`TEMPO_EPSILON`]; returns `None` otherwise. A sample that arrives
    /// while an audio command is in flight is skipped.
    pub fn update_tempo(&self, bpm: f64) -> Result<Option<DeliveryReport>, ValidationError> {
        let Ok(_op) = self.audio_op.try_lock() else {
            debug!(bpm, "audio command in flight, skipping tempo sample");
            return Ok(None);
        };
        self.publish_tempo(bpm)
    }

    /// Feed a tapped tempo to the audio engine and broadcast it.
    #[instrument(skip_all, fields(bpm = request.bpm))]
    pub async fn set_tempo(&self, request: &SetTempoRequest) -> Result<TempoSet, GatewayError> {
        const COMMAND: &str = "audio.tempo";
        validated(COMMAND, request.validate())?;

        let _op = self.audio_op.lock().await;
        self.collaborators
            .audio
            .set_tempo(request.bpm)
            .map_err(|source| collaborator_failed(COMMAND, source))?;
        let delivery = self.publish_tempo(request.bpm)?;
        succeeded(COMMAND);
        info!(
            recipients = delivery.map_or(0, |d| d.delivered),
            "tempo set"
        );

        Ok(TempoSet {
            message: format!("Tempo set to {} BPM", request.bpm),
            tempo: request.bpm,
        })
    }

    /// Caller holds `audio_op`, so a stop cannot interleave between the
    /// write and the broadcast.
    fn publish_tempo(&self, bpm: f64) -> Result<Option<DeliveryReport>, ValidationError> {
        if !self.state.record_tempo(bpm, TEMPO_EPSILON)? {
            return Ok(None);
        }
        Ok(Some(self.hub.broadcast(&Event::TempoUpdate { tempo: bpm })))
    }

    // ── Cues ────────────────────────────────────────────────────────

    /// Generate a cue, make it active and broadcast `cue-status`.
    #[instrument(skip_all)]
    pub async fn generate_cue(
        &self,
        request: &GenerateCueRequest,
    ) -> Result<Outcome<CueGenerated>, GatewayError> {
        const COMMAND: &str = "cue.generate";
        validated(COMMAND, request.validate())?;

        let cue = self
            .collaborators
            .cues
            .generate(&request.text)
            .await
            .map_err(|source| collaborator_failed(COMMAND, source))?;

        self.state.set_active_cue(Some(cue.clone()));
        let delivery = self.hub.broadcast(&Event::CueStatus {
            cue: Some(cue.clone()),
        });
        succeeded(COMMAND);
        info!(cue_id = %cue.id, recipients = delivery.delivered, "cue generated");

        Ok(Outcome {
            reply: CueGenerated {
                message: format!("Cue '{}' generated", cue.label),
                cue,
            },
            delivery,
        })
    }

    /// Clear the active cue and broadcast `cue-status`.
    pub fn clear_cue(&self) -> Outcome<Ack> {
        self.state.set_active_cue(None);
        let delivery = self.hub.broadcast(&Event::CueStatus { cue: None });
        succeeded("cue.clear");
        Outcome {
            reply: Ack {
                message: "Cue cleared".into(),
            },
            delivery,
        }
    }

    // ── Health ──────────────────────────────────────────────────────

    /// Liveness snapshot.
    pub fn health(&self) -> HealthResponse {
        health_check(
            self.started_at,
            &self.state.get(),
            self.hub.registry().len(),
        )
    }
}

fn validated(command: &'static str, result: Result<(), ValidationError>) -> Result<(), GatewayError> {
    result.map_err(|err| {
        warn!(command, field = err.field, error = %err, "command rejected");
        counter!(GATEWAY_COMMANDS_TOTAL, "command" => command, "outcome" => "invalid").increment(1);
        GatewayError::Validation(err)
    })
}

fn collaborator_failed(
    command: &'static str,
    source: CollaboratorError,
) -> GatewayError {
    warn!(command, kind = source.error_kind(), error = %source, "collaborator failed");
    counter!(GATEWAY_COMMANDS_TOTAL, "command" => command, "outcome" => "failed").increment(1);
    GatewayError::Collaborator { command, source }
}

fn succeeded(command: &'static str) {
    counter!(GATEWAY_COMMANDS_TOTAL, "command" => command, "outcome" => "ok").increment(1);
}
