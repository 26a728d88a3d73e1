//! Background task that polls the audio engine and publishes tempo changes.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::gateway::Gateway;

/// Poll the audio engine every `interval` while monitoring is active and
/// hand each estimate to [`Gateway::update_tempo`], which broadcasts
/// `tempo-update` when the value moved.
///
/// Runs until `cancel` fires.
pub async fn run_tempo_monitor(gateway: Arc<Gateway>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(?interval, "tempo monitor started");

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if !gateway.state().get().monitoring_active {
            continue;
        }
        let bpm = gateway.audio().current_tempo();
        match gateway.update_tempo(bpm) {
            Ok(Some(report)) => debug!(bpm, recipients = report.delivered, "tempo changed"),
            Ok(None) => {}
            Err(err) => warn!(bpm, error = %err, "audio engine reported an invalid tempo"),
        }
    }

    debug!("tempo monitor stopped");
}
