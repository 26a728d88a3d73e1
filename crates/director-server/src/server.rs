//! `DirectorServer`: owns the shared state, session registry and gateway, and
//! serves them over HTTP + WebSocket.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use director_core::StateStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::gateway::{Collaborators, Gateway};
use crate::routes::{AppState, build_router};
use crate::shutdown::ShutdownCoordinator;
use crate::tempo::run_tempo_monitor;
use crate::websocket::broadcast::BroadcastHub;
use crate::websocket::registry::SessionRegistry;
use crate::websocket::session::{ChannelContext, ChannelLimits};

/// The Director backend server.
pub struct DirectorServer {
    config: ServerConfig,
    state: Arc<StateStore>,
    registry: Arc<SessionRegistry>,
    hub: BroadcastHub,
    gateway: Arc<Gateway>,
    shutdown: ShutdownCoordinator,
    metrics: Option<PrometheusHandle>,
}

impl DirectorServer {
    /// Create a server with fresh state and an empty registry.
    pub fn new(config: ServerConfig, collaborators: Collaborators) -> Self {
        let state = Arc::new(StateStore::new());
        let registry = Arc::new(SessionRegistry::new(config.max_connections));
        let hub = BroadcastHub::new(Arc::clone(&registry));
        let gateway = Arc::new(Gateway::new(Arc::clone(&state), hub.clone(), collaborators));
        Self {
            config,
            state,
            registry,
            hub,
            gateway,
            shutdown: ShutdownCoordinator::new(),
            metrics: None,
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the axum router with all routes.
    pub fn router(&self) -> Router {
        build_router(AppState {
            gateway: Arc::clone(&self.gateway),
            channel: ChannelContext {
                registry: Arc::clone(&self.registry),
                state: Arc::clone(&self.state),
                shutdown: self.shutdown.token(),
                limits: ChannelLimits::from(&self.config),
            },
            metrics: self.metrics.clone(),
            max_message_size: self.config.max_message_size,
        })
    }

    /// Bind the configured address, start the tempo monitor and serve until
    /// shutdown. Returns the bound address and the serving task.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;

        let tempo = tokio::spawn(run_tempo_monitor(
            Arc::clone(&self.gateway),
            self.config.tempo_poll_interval(),
            self.shutdown.child_token(),
        ));

        let app = self.router();
        let token = self.shutdown.token();
        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(err) = served {
                error!(error = %err, "server error");
            }
            let _ = tempo.await;
        });

        info!(%addr, "director server listening");
        Ok((addr, handle))
    }

    /// Shared state store.
    pub fn state(&self) -> &Arc<StateStore> {
        &self.state
    }

    /// Session registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Broadcast hub.
    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    /// Request gateway.
    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    /// Shutdown coordinator.
    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
