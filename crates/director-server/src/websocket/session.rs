//! Realtime channel lifecycle: one connected client from upgrade through
//! disconnect.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, close_code};
use director_core::{Event, SessionId, StateStore};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use metrics::{counter, histogram};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::connection::{Outbound, Session};
use super::handler::handle_inbound;
use super::heartbeat::{HeartbeatResult, run_heartbeat};
use super::registry::{RegistryError, SessionRegistry};
use crate::config::ServerConfig;
use crate::metrics::{WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL};

/// Per-channel timing and capacity limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelLimits {
    /// Outbound queue capacity.
    pub send_queue: usize,
    /// Heartbeat ping interval.
    pub heartbeat_interval: Duration,
    /// Silence tolerated before closing.
    pub heartbeat_timeout: Duration,
    /// Upper bound on one socket write.
    pub send_timeout: Duration,
}

impl From<&ServerConfig> for ChannelLimits {
    fn from(config: &ServerConfig) -> Self {
        Self {
            send_queue: config.max_send_queue.max(1),
            heartbeat_interval: config.heartbeat_interval(),
            heartbeat_timeout: config.heartbeat_timeout(),
            send_timeout: config.send_timeout(),
        }
    }
}

/// Shared handles a channel needs.
#[derive(Clone)]
pub struct ChannelContext {
    /// Where the session registers.
    pub registry: Arc<SessionRegistry>,
    /// Read for `get-state` replies.
    pub state: Arc<StateStore>,
    /// Server shutdown; the session token is a child of it.
    pub shutdown: CancellationToken,
    /// Timing and capacity limits.
    pub limits: ChannelLimits,
}

/// Run a realtime channel for an upgraded socket.
///
/// 1. Registers a new session (closing with 1013 when the server is full)
/// 2. Sends `connection-established`
/// 3. Replies to each inbound text frame in arrival order
/// 4. Pings on an interval and closes silent clients
/// 5. Deregisters exactly once on any exit path
#[allow(clippy::too_many_lines)]
#[instrument(skip_all, fields(session_id))]
pub async fn run_ws_session(ws: WebSocket, ctx: ChannelContext) {
    let session_id = SessionId::new();
    let _ = tracing::Span::current().record("session_id", session_id.as_str());
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (send_tx, send_rx) = mpsc::channel::<Outbound>(ctx.limits.send_queue);
    let session = Arc::new(Session::new(
        session_id.clone(),
        send_tx,
        ctx.shutdown.child_token(),
    ));

    if let Err(err) = ctx.registry.add(Arc::clone(&session)) {
        let (code, reason) = match err {
            RegistryError::Full { .. } => (close_code::AGAIN, "server at connection limit"),
            RegistryError::DuplicateSession(_) => (close_code::ERROR, "duplicate session"),
        };
        let _ = session.close();
        let frame = CloseFrame {
            code,
            reason: Utf8Bytes::from_static(reason),
        };
        let _ = tokio::time::timeout(
            ctx.limits.send_timeout,
            ws_tx.send(Message::Close(Some(frame))),
        )
        .await;
        return;
    }

    let started = Instant::now();
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    info!(connections = ctx.registry.len(), "client connected");

    let mut writer = tokio::spawn(write_loop(
        ws_tx,
        send_rx,
        Arc::clone(&session),
        ctx.limits.send_timeout,
    ));

    let heartbeat = {
        let session = Arc::clone(&session);
        let limits = ctx.limits;
        let cancel = session.closed_token();
        tokio::spawn(async move {
            let result = run_heartbeat(
                Arc::clone(&session),
                limits.heartbeat_interval,
                limits.heartbeat_timeout,
                cancel,
            )
            .await;
            if result == HeartbeatResult::TimedOut {
                warn!(
                    session_id = %session.id(),
                    silent_for = ?session.last_pong_elapsed(),
                    "client unresponsive, closing"
                );
                let _ = session.close();
            }
        })
    };

    let _ = session.mark_open();
    let _ = send_reply(
        &session,
        &Event::ConnectionEstablished {
            session_id: session_id.clone(),
        },
    );

    loop {
        let frame = tokio::select! {
            frame = ws_rx.next() => frame,
            () = session.closed() => {
                debug!("session closed, stopping reader");
                break;
            }
        };

        let msg = match frame {
            Some(Ok(msg)) => msg,
            Some(Err(err)) => {
                debug!(error = %err, "read error");
                break;
            }
            None => break,
        };
        session.mark_alive();

        let text = match msg {
            Message::Text(t) => t.to_string(),
            Message::Binary(data) => {
                if let Ok(s) = std::str::from_utf8(&data) {
                    s.to_owned()
                } else {
                    debug!(len = data.len(), "ignoring non-UTF-8 binary frame");
                    continue;
                }
            }
            Message::Close(_) => {
                info!("client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => continue,
        };

        let reply = handle_inbound(&text, &ctx.state);
        if !send_reply(&session, &reply) {
            break;
        }
    }

    // Cleanup: every exit path above lands here exactly once.
    let _ = session.close();
    let deregistered = ctx.registry.remove(&session_id).is_some();
    if tokio::time::timeout(ctx.limits.send_timeout, &mut writer)
        .await
        .is_err()
    {
        writer.abort();
    }
    heartbeat.abort();

    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
    info!(
        deregistered,
        dropped = session.drop_count(),
        connections = ctx.registry.len(),
        "client disconnected"
    );
}

/// Queue `event` for this session only. Returns `false` when the session
/// can no longer receive and the channel should close.
fn send_reply(session: &Session, event: &Event) -> bool {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(err) => {
            error!(event_type = event.kind(), error = %err, "failed to serialize reply");
            return true;
        }
    };
    match session.send(Arc::from(json)) {
        Ok(()) => true,
        Err(err) => {
            warn!(event_type = event.kind(), error = %err, "failed to enqueue reply, closing");
            false
        }
    }
}

/// Drain the outbound queue into the socket. Exits on write failure, write
/// timeout or session close, and closes the session on the way out.
async fn write_loop(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Outbound>,
    session: Arc<Session>,
    send_timeout: Duration,
) {
    loop {
        let outbound = tokio::select! {
            msg = rx.recv() => msg,
            () = session.closed() => None,
        };
        let frame = match outbound {
            Some(Outbound::Text(text)) => Message::Text(text.to_string().into()),
            Some(Outbound::Ping) => Message::Ping(Bytes::new()),
            None => break,
        };

        match tokio::time::timeout(send_timeout, ws_tx.send(frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                debug!(session_id = %session.id(), error = %err, "socket write failed");
                break;
            }
            Err(_) => {
                warn!(session_id = %session.id(), ?send_timeout, "socket write timed out");
                break;
            }
        }
    }

    let _ = session.close();
    let _ = tokio::time::timeout(send_timeout, ws_tx.close()).await;
}
