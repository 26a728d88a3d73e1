//! `/` and `/health` response bodies.

use std::time::Instant;

use director_core::SharedState;
use serde::Serialize;

/// Health check response body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `"healthy"` while the server runs.
    pub status: &'static str,
    /// Server version.
    pub version: &'static str,
    /// Whether a console session is live.
    pub console_connected: bool,
    /// Whether audio monitoring is running.
    pub monitoring_active: bool,
    /// Registered realtime sessions.
    pub connections: usize,
    /// Seconds since the server started.
    pub uptime_secs: u64,
}

/// Build a health response from live state.
pub fn health_check(start_time: Instant, state: &SharedState, connections: usize) -> HealthResponse {
    HealthResponse {
        status: "healthy",
        version: director_core::VERSION,
        console_connected: state.console_connected,
        monitoring_active: state.monitoring_active,
        connections,
        uptime_secs: start_time.elapsed().as_secs(),
    }
}

/// Body of `GET /`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RootResponse {
    /// Service banner.
    pub message: &'static str,
    /// Server version.
    pub version: &'static str,
    /// Always `"running"`.
    pub status: &'static str,
}

impl Default for RootResponse {
    fn default() -> Self {
        Self {
            message: "GrandMA3 AI Director API",
            version: director_core::VERSION,
            status: "running",
        }
    }
}
