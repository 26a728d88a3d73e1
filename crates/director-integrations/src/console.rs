//! Lighting console session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use director_core::CollaboratorError;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Remote-control session with a lighting console.
///
/// Implementors must be `Send + Sync`; the gateway serializes calls, so an
/// implementation never sees two `connect`/`disconnect` calls at once.
#[async_trait]
pub trait ConsoleClient: Send + Sync {
    /// Open a session to `host:port`. Replaces any existing session on
    /// success; on failure the existing session is kept.
    async fn connect(&self, host: &str, port: u16) -> Result<(), CollaboratorError>;

    /// Close the session. Closing an already-closed session succeeds.
    async fn disconnect(&self) -> Result<(), CollaboratorError>;

    /// Whether a session is currently open.
    fn is_connected(&self) -> bool;

    /// Send one command line to the console.
    async fn send_command(&self, line: &str) -> Result<(), CollaboratorError>;
}

/// Console session over a raw TCP/telnet connection.
///
/// Only opens, holds and closes the transport and writes CRLF-terminated
/// command lines; it does not speak any console-specific dialect.
pub struct TelnetConsole {
    connect_timeout: Duration,
    stream: Mutex<Option<TcpStream>>,
    connected: AtomicBool,
}

impl TelnetConsole {
    /// Create a disconnected client.
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            stream: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ConsoleClient for TelnetConsole {
    async fn connect(&self, host: &str, port: u16) -> Result<(), CollaboratorError> {
        // A failed attempt leaves the current session in place.
        let attempt = tokio::time::timeout(self.connect_timeout, TcpStream::connect((host, port)));
        let stream = match attempt.await {
            Err(_) => {
                warn!(host, port, "console connect timed out");
                return Err(CollaboratorError::Timeout {
                    operation: "console connect",
                    timeout_ms: u64::try_from(self.connect_timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
            Ok(Err(err)) => {
                warn!(host, port, error = %err, "console unreachable");
                return Err(CollaboratorError::Unreachable {
                    target: format!("console at {host}:{port}"),
                    reason: err.to_string(),
                });
            }
            Ok(Ok(stream)) => stream,
        };
        let _ = stream.set_nodelay(true);

        let previous = {
            let mut guard = self.stream.lock().await;
            let previous = guard.replace(stream);
            self.connected.store(true, Ordering::Release);
            previous
        };
        info!(host, port, "console session opened");

        if let Some(mut old) = previous {
            let _ = old.shutdown().await;
            debug!("replaced existing console session");
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), CollaboratorError> {
        let mut guard = self.stream.lock().await;
        self.connected.store(false, Ordering::Release);
        if let Some(mut stream) = guard.take() {
            if let Err(err) = stream.shutdown().await {
                debug!(error = %err, "console shutdown returned an error");
            }
            info!("console session closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn send_command(&self, line: &str) -> Result<(), CollaboratorError> {
        if line.contains(['\r', '\n']) {
            return Err(CollaboratorError::Rejected(
                "command must be a single line".into(),
            ));
        }

        let mut guard = self.stream.lock().await;
        let Some(stream) = guard.as_mut() else {
            return Err(CollaboratorError::NotConnected("console"));
        };

        let framed = format!("{line}\r\n");
        if let Err(err) = stream.write_all(framed.as_bytes()).await {
            // the transport is gone; drop it so status reflects reality
            *guard = None;
            self.connected.store(false, Ordering::Release);
            warn!(error = %err, "console write failed, session dropped");
            return Err(err.into());
        }
        debug!(command = line, "console command sent");
        Ok(())
    }
}
