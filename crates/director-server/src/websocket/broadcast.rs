//! Event fan-out to registered sessions.

use std::sync::Arc;

use director_core::{Event, SessionId};
use metrics::counter;
use serde::Serialize;
use tracing::{debug, error, warn};

use super::connection::DeliveryError;
use super::registry::SessionRegistry;
use crate::metrics::{WS_BROADCAST_EVENTS_TOTAL, WS_BROADCAST_FAILURES_TOTAL};

/// Outcome of one broadcast.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReport {
    /// `type` tag of the event.
    pub event_type: &'static str,
    /// Sessions in the snapshot.
    pub attempted: usize,
    /// Sessions the event was queued for.
    pub delivered: usize,
    /// Sessions the event could not be queued for.
    pub failed: usize,
    /// Sessions deregistered because delivery failed.
    pub removed: Vec<SessionId>,
}

/// Delivers events to every registered session.
///
/// Each broadcast serializes the event once, iterates a registry snapshot
/// and enqueues without blocking. A failing session never stops delivery to
/// the rest; failed sessions are deregistered after the loop.
#[derive(Clone)]
pub struct BroadcastHub {
    registry: Arc<SessionRegistry>,
}

impl BroadcastHub {
    /// Create a hub over `registry`.
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this hub delivers to.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Deliver `event` to every session registered right now.
    pub fn broadcast(&self, event: &Event) -> DeliveryReport {
        self.broadcast_payload(event.kind(), event)
    }

    fn broadcast_payload<T: Serialize + ?Sized>(
        &self,
        event_type: &'static str,
        payload: &T,
    ) -> DeliveryReport {
        let sessions = self.registry.snapshot();
        let attempted = sessions.len();
        counter!(WS_BROADCAST_EVENTS_TOTAL, "event_type" => event_type).increment(1);

        let json: Arc<str> = match serde_json::to_string(payload) {
            Ok(json) => Arc::from(json),
            Err(err) => {
                error!(event_type, error = %err, recipients = attempted, "failed to serialize event");
                counter!(WS_BROADCAST_FAILURES_TOTAL).increment(attempted as u64);
                return DeliveryReport {
                    event_type,
                    attempted,
                    delivered: 0,
                    failed: attempted,
                    removed: Vec::new(),
                };
            }
        };

        let mut delivered = 0;
        let mut failures: Vec<&SessionId> = Vec::new();
        for session in &sessions {
            match session.send(Arc::clone(&json)) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    warn!(session_id = %session.id(), event_type, error = %err, "delivery failed");
                    failures.push(session.id());
                }
            }
        }

        let removed: Vec<SessionId> = failures
            .iter()
            .filter_map(|id| self.registry.remove(id))
            .map(|session| session.id().clone())
            .collect();

        let failed = failures.len();
        if failed > 0 {
            counter!(WS_BROADCAST_FAILURES_TOTAL).increment(failed as u64);
        }
        debug!(event_type, recipients = attempted, delivered, failed, "broadcast event");

        DeliveryReport {
            event_type,
            attempted,
            delivered,
            failed,
            removed,
        }
    }

    /// Deliver `event` to one session. A failing session is deregistered.
    pub fn send_to(&self, id: &SessionId, event: &Event) -> Result<(), DeliveryError> {
        let Some(session) = self.registry.get(id) else {
            return Err(DeliveryError::Closed);
        };
        let json = serde_json::to_string(event).map_err(|err| {
            error!(session_id = %id, event_type = event.kind(), error = %err, "failed to serialize event");
            DeliveryError::Closed
        })?;
        session.send(Arc::from(json)).inspect_err(|err| {
            warn!(session_id = %id, event_type = event.kind(), error = %err, "delivery failed");
            let _ = self.registry.remove(id);
        })
    }
}
