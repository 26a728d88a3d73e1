//! Per-connection session state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use director_core::SessionId;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Frame queued for the socket writer task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outbound {
    /// Serialized JSON text frame, shared across recipients of a broadcast.
    Text(Arc<str>),
    /// Heartbeat ping.
    Ping,
}

/// Lifecycle of a realtime channel. `Closed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ChannelState {
    /// Upgraded but not yet registered.
    Connecting = 0,
    /// Registered and exchanging frames.
    Open = 1,
    /// Torn down.
    Closed = 2,
}

impl ChannelState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Connecting,
            1 => Self::Open,
            _ => Self::Closed,
        }
    }
}

/// Why a message could not be queued for a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The writer task has gone away.
    #[error("outbound channel closed")]
    Closed,
    /// The outbound queue is at capacity.
    #[error("outbound queue full")]
    QueueFull,
    /// The session was already marked dead.
    #[error("session is dead")]
    Dead,
}

/// One connected realtime client.
///
/// Owned by the [`SessionRegistry`](super::registry::SessionRegistry) and
/// shared via `Arc`. Sending never blocks: messages go into a bounded queue
/// drained by the connection's writer task.
pub struct Session {
    id: SessionId,
    tx: mpsc::Sender<Outbound>,
    dead: AtomicBool,
    state: AtomicU8,
    closed: CancellationToken,
    is_alive: AtomicBool,
    last_pong: Mutex<Instant>,
    dropped_messages: AtomicU64,
    connected_at: Instant,
}

impl Session {
    /// Create a session in the `Connecting` state.
    ///
    /// `closed` is cancelled when the session is closed; pass a child of the
    /// server shutdown token so shutdown closes every session.
    pub fn new(id: SessionId, tx: mpsc::Sender<Outbound>, closed: CancellationToken) -> Self {
        let now = Instant::now();
        Self {
            id,
            tx,
            dead: AtomicBool::new(false),
            state: AtomicU8::new(ChannelState::Connecting as u8),
            closed,
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
            connected_at: now,
        }
    }

    /// Session identity.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ChannelState {
        ChannelState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move `Connecting` to `Open`. Returns `false` if the session already
    /// left `Connecting`.
    pub fn mark_open(&self) -> bool {
        self.state
            .compare_exchange(
                ChannelState::Connecting as u8,
                ChannelState::Open as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Whether the session has been marked dead.
    pub fn is_dead(&self) -> bool {
        self.dead.load(Ordering::Acquire)
    }

    /// Queue a text frame.
    ///
    /// Fails without enqueuing when the session is dead, the writer is gone
    /// or the queue is full.
    pub fn send(&self, message: Arc<str>) -> Result<(), DeliveryError> {
        if self.is_dead() {
            return Err(DeliveryError::Dead);
        }
        self.tx
            .try_send(Outbound::Text(message))
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => {
                    let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
                    DeliveryError::QueueFull
                }
                mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
            })
    }

    /// Queue a heartbeat ping. Returns `false` if it could not be queued.
    pub fn send_ping(&self) -> bool {
        !self.is_dead() && self.tx.try_send(Outbound::Ping).is_ok()
    }

    /// Mark the session dead, move it to `Closed` and wake every task
    /// waiting on [`closed`](Self::closed).
    ///
    /// Returns `true` for the call that performed the transition.
    pub fn close(&self) -> bool {
        let first = !self.dead.swap(true, Ordering::AcqRel);
        self.state.store(ChannelState::Closed as u8, Ordering::Release);
        self.closed.cancel();
        first
    }

    /// Resolves once the session is closed (or the server shuts down).
    pub async fn closed(&self) {
        self.closed.cancelled().await;
    }

    /// Token cancelled when the session closes.
    pub fn closed_token(&self) -> CancellationToken {
        self.closed.clone()
    }

    /// Whether [`closed`](Self::closed) has resolved.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Record inbound activity.
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Check and reset the alive flag. Returns `true` if the client showed
    /// activity since the previous check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Time since the last inbound activity.
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Messages refused because the queue was full.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Time since the channel was accepted.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("dead", &self.is_dead())
            .finish_non_exhaustive()
    }
}
