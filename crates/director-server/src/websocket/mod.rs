//! Realtime channel management: sessions, registry, broadcast, heartbeat and
//! inbound dispatch.

pub mod broadcast;
pub mod connection;
pub mod handler;
pub mod heartbeat;
pub mod registry;
pub mod session;
