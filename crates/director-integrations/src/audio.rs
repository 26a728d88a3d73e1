//! Audio capture and tempo analysis.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use director_core::CollaboratorError;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Capture parameters for one monitoring run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioConfig {
    /// Input device name.
    pub input_device: String,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Frames per analysis buffer.
    pub buffer_size: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_device: "default".to_string(),
            sample_rate: 44_100,
            buffer_size: 512,
        }
    }
}

/// Audio capture and beat tracking.
#[async_trait]
pub trait AudioEngine: Send + Sync {
    /// Start capturing with `config`.
    async fn start(&self, config: AudioConfig) -> Result<(), CollaboratorError>;

    /// Stop capturing. Stopping an idle engine succeeds.
    async fn stop(&self) -> Result<(), CollaboratorError>;

    /// Most recent tempo estimate in BPM (0 when unknown).
    fn current_tempo(&self) -> f64;

    /// Whether capture is running.
    fn is_running(&self) -> bool;

    /// Override the tempo estimate from an external source (tap tempo, MIDI
    /// clock). Fails when capture is not running.
    fn set_tempo(&self, bpm: f64) -> Result<(), CollaboratorError>;
}

/// Audio engine whose tempo is supplied from outside (tap tempo, MIDI
/// clock, tests) rather than analysed from samples.
pub struct ManualTempoEngine {
    devices: Vec<String>,
    active: Mutex<Option<AudioConfig>>,
    running: AtomicBool,
    tempo_bits: AtomicU64,
}

impl ManualTempoEngine {
    /// Create an idle engine that accepts the named input devices.
    pub fn new(devices: Vec<String>) -> Self {
        Self {
            devices,
            active: Mutex::new(None),
            running: AtomicBool::new(false),
            tempo_bits: AtomicU64::new(0f64.to_bits()),
        }
    }

    /// Configuration of the running capture, if any.
    pub async fn active_config(&self) -> Option<AudioConfig> {
        self.active.lock().await.clone()
    }
}

#[async_trait]
impl AudioEngine for ManualTempoEngine {
    async fn start(&self, config: AudioConfig) -> Result<(), CollaboratorError> {
        let mut active = self.active.lock().await;
        if let Some(current) = active.as_ref() {
            return Err(CollaboratorError::Busy(format!(
                "audio device {}",
                current.input_device
            )));
        }
        if !self.devices.iter().any(|d| d == &config.input_device) {
            return Err(CollaboratorError::Rejected(format!(
                "unknown input device: {}",
                config.input_device
            )));
        }
        info!(
            device = %config.input_device,
            sample_rate = config.sample_rate,
            buffer_size = config.buffer_size,
            "audio capture started"
        );
        *active = Some(config);
        self.running.store(true, Ordering::Release);
        Ok(())
    }

    async fn stop(&self) -> Result<(), CollaboratorError> {
        let mut active = self.active.lock().await;
        if active.take().is_some() {
            info!("audio capture stopped");
        }
        self.running.store(false, Ordering::Release);
        self.tempo_bits.store(0f64.to_bits(), Ordering::Release);
        Ok(())
    }

    fn current_tempo(&self) -> f64 {
        f64::from_bits(self.tempo_bits.load(Ordering::Acquire))
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn set_tempo(&self, bpm: f64) -> Result<(), CollaboratorError> {
        if !bpm.is_finite() || bpm < 0.0 {
            return Err(CollaboratorError::Rejected(format!("invalid tempo: {bpm}")));
        }
        if !self.is_running() {
            return Err(CollaboratorError::NotConnected("audio input"));
        }
        self.tempo_bits.store(bpm.to_bits(), Ordering::Release);
        debug!(bpm, "tempo set");
        Ok(())
    }
}
