//! HTTP routes.

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::gateway::{
    ConnectConsoleRequest, ConsoleCommandRequest, Gateway, GatewayError, GenerateCueRequest,
    Outcome, SetTempoRequest, StartMonitoringRequest,
};
use crate::health::RootResponse;
use crate::websocket::session::{ChannelContext, run_ws_session};

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Command surface.
    pub gateway: Arc<Gateway>,
    /// Handles each realtime channel needs.
    pub channel: ChannelContext,
    /// Prometheus handle; `/metrics` is 404 without one.
    pub metrics: Option<PrometheusHandle>,
    /// Max inbound WebSocket message size in bytes.
    pub max_message_size: usize,
}

/// Build the router with every route, CORS and request tracing.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/console/connect", post(connect_console))
        .route("/console/disconnect", post(disconnect_console))
        .route("/console/status", get(console_status))
        .route("/console/command", post(console_command))
        .route("/audio/start", post(start_monitoring))
        .route("/audio/stop", post(stop_monitoring))
        .route("/audio/status", get(audio_status))
        .route("/audio/tempo", post(set_tempo))
        .route("/cue/generate", post(generate_cue))
        .route("/cue/clear", post(clear_cue))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct Success<T> {
    success: bool,
    #[serde(flatten)]
    body: T,
}

#[derive(Serialize)]
struct Failure {
    success: bool,
    message: String,
    code: &'static str,
}

fn failure(status: StatusCode, message: String, code: &'static str) -> Response {
    (
        status,
        Json(Failure {
            success: false,
            message,
            code,
        }),
    )
        .into_response()
}

/// Parse a JSON body. An empty body yields the defaults.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|err| {
        debug!(error = %err, "rejecting malformed request body");
        failure(
            StatusCode::BAD_REQUEST,
            format!("Invalid request body: {err}"),
            "INVALID_BODY",
        )
    })
}

fn command_response<T: Serialize>(result: Result<Outcome<T>, GatewayError>) -> Response {
    reply_response(result.map(|outcome| outcome.reply))
}

/// Validation failures are the caller's fault (400). Collaborator failures
/// are reported in-band with `success:false`.
fn reply_response<T: Serialize>(result: Result<T, GatewayError>) -> Response {
    match result {
        Ok(body) => Json(Success {
            success: true,
            body,
        })
        .into_response(),
        Err(err) => {
            let status = if err.is_validation() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::OK
            };
            failure(status, err.to_string(), err.code())
        }
    }
}

async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse::default())
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.gateway.health())
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn connect_console(State(state): State<AppState>, body: Bytes) -> Response {
    let request: ConnectConsoleRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    command_response(state.gateway.connect_console(&request).await)
}

async fn disconnect_console(State(state): State<AppState>) -> Response {
    command_response(state.gateway.disconnect_console().await)
}

async fn console_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.gateway.console_status())
}

async fn console_command(State(state): State<AppState>, body: Bytes) -> Response {
    let request: ConsoleCommandRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    reply_response(state.gateway.send_console_command(&request).await)
}

async fn start_monitoring(State(state): State<AppState>, body: Bytes) -> Response {
    let request: StartMonitoringRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    command_response(state.gateway.start_monitoring(&request).await)
}

async fn stop_monitoring(State(state): State<AppState>) -> Response {
    command_response(state.gateway.stop_monitoring().await)
}

async fn audio_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.gateway.audio_status())
}

async fn set_tempo(State(state): State<AppState>, body: Bytes) -> Response {
    let request: SetTempoRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    reply_response(state.gateway.set_tempo(&request).await)
}

async fn generate_cue(State(state): State<AppState>, body: Bytes) -> Response {
    let request: GenerateCueRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    command_response(state.gateway.generate_cue(&request).await)
}

async fn clear_cue(State(state): State<AppState>) -> Response {
    command_response(Ok(state.gateway.clear_cue()))
}

/// GET /ws: upgrade to a realtime channel.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let channel = state.channel.clone();
    ws.max_message_size(state.max_message_size)
        .on_upgrade(move |socket| run_ws_session(socket, channel))
}
