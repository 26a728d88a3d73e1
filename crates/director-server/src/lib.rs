//! # director-server
//!
//! Axum HTTP + `WebSocket` server for the Director backend.
//!
//! - Session registry: the set of live realtime channels
//! - Broadcast hub: snapshot fan-out with per-session failure isolation
//! - Request gateway: validated console / audio / cue commands
//! - Channel handler: per-connection reader, writer and heartbeat tasks
//! - Tempo monitor, Prometheus metrics, graceful shutdown

#![deny(unsafe_code)]

pub mod config;
pub mod gateway;
pub mod health;
pub mod metrics;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod tempo;
pub mod websocket;

pub use config::ServerConfig;
pub use gateway::{Collaborators, Gateway, GatewayError};
pub use server::DirectorServer;
pub use websocket::broadcast::{BroadcastHub, DeliveryReport};
pub use websocket::registry::{RegistryError, SessionRegistry};
