//! Registry of live realtime sessions.

use std::collections::HashMap;
use std::sync::Arc;

use director_core::SessionId;
use metrics::{counter, gauge};
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, error, warn};

use super::connection::Session;
use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_REJECTIONS_TOTAL};

/// Why a session could not be registered.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A session with the same identity is already registered.
    #[error("session {0} is already registered")]
    DuplicateSession(SessionId),
    /// The registry is at capacity.
    #[error("connection limit of {limit} reached")]
    Full {
        /// Configured maximum.
        limit: usize,
    },
}

/// The set of registered sessions.
///
/// The lock is only held for map operations, never across an `.await`.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
    max_connections: usize,
}

impl SessionRegistry {
    /// Create an empty registry admitting at most `max_connections` sessions.
    pub fn new(max_connections: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_connections,
        }
    }

    /// Register a session.
    pub fn add(&self, session: Arc<Session>) -> Result<(), RegistryError> {
        let count = {
            let mut sessions = self.sessions.write();
            if sessions.contains_key(session.id()) {
                drop(sessions);
                error!(session_id = %session.id(), "duplicate session registration");
                counter!(WS_REJECTIONS_TOTAL, "reason" => "duplicate").increment(1);
                return Err(RegistryError::DuplicateSession(session.id().clone()));
            }
            if sessions.len() >= self.max_connections {
                drop(sessions);
                warn!(
                    session_id = %session.id(),
                    limit = self.max_connections,
                    "connection limit reached"
                );
                counter!(WS_REJECTIONS_TOTAL, "reason" => "full").increment(1);
                return Err(RegistryError::Full {
                    limit: self.max_connections,
                });
            }
            let _ = sessions.insert(session.id().clone(), Arc::clone(&session));
            sessions.len()
        };
        record_active(count);
        debug!(session_id = %session.id(), count, "session registered");
        Ok(())
    }

    /// Deregister a session, marking it dead and signalling its channel to
    /// close. Unknown IDs are a no-op.
    pub fn remove(&self, id: &SessionId) -> Option<Arc<Session>> {
        let (removed, count) = {
            let mut sessions = self.sessions.write();
            let removed = sessions.remove(id);
            (removed, sessions.len())
        };
        let session = removed?;
        let _ = session.close();
        record_active(count);
        debug!(session_id = %id, count, "session removed");
        Some(session)
    }

    /// Point-in-time copy of every registered session. Order is unspecified.
    pub fn snapshot(&self) -> Vec<Arc<Session>> {
        self.sessions.read().values().cloned().collect()
    }

    /// Look up a session.
    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether no session is registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Configured capacity.
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

#[allow(clippy::cast_precision_loss)]
fn record_active(count: usize) {
    gauge!(WS_CONNECTIONS_ACTIVE).set(count as f64);
}
