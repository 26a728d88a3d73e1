//! End-to-end tests using a real WebSocket client against a bound server.

use std::sync::Arc;
use std::time::Duration;

use director_integrations::{AudioEngine, KeywordCueGenerator, ManualTempoEngine, TelnetConsole};
use director_server::config::ServerConfig;
use director_server::{Collaborators, DirectorServer};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

struct TestServer {
    server: DirectorServer,
    audio: Arc<ManualTempoEngine>,
    base: String,
    ws_url: String,
}

async fn boot_server(config: ServerConfig) -> TestServer {
    let audio = Arc::new(ManualTempoEngine::new(vec!["default".into()]));
    let server = DirectorServer::new(
        config,
        Collaborators {
            console: Arc::new(TelnetConsole::new(Duration::from_secs(1))),
            audio: audio.clone(),
            cues: Arc::new(KeywordCueGenerator::new()),
        },
    );
    let (addr, _handle) = server.listen().await.unwrap();
    TestServer {
        server,
        audio,
        base: format!("http://{addr}"),
        ws_url: format!("ws://{addr}/ws"),
    }
}

/// Connect and consume `connection-established`.
async fn connect_client(url: &str) -> (WsStream, String) {
    let (mut ws, _) = connect_async(url).await.unwrap();
    let hello = read_json(&mut ws).await;
    assert_eq!(hello["type"], "connection-established");
    let session_id = hello["sessionId"].as_str().unwrap().to_owned();
    (ws, session_id)
}

/// Next text frame as JSON, skipping control frames.
async fn read_json(ws: &mut WsStream) -> Value {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a message")
            .expect("stream ended")
            .expect("read error");
        match msg {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Ping(_) | Message::Pong(_) => {}
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn post(base: &str, path: &str, body: Value) -> Value {
    reqwest::Client::new()
        .post(format!("{base}{path}"))
        .json(&body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn get(base: &str, path: &str) -> Value {
    reqwest::get(format!("{base}{path}"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn connection_established_carries_session_id() {
    let t = boot_server(ServerConfig::default()).await;
    let (_ws, session_id) = connect_client(&t.ws_url).await;
    assert!(session_id.starts_with("ws_"));
    assert_eq!(t.server.registry().len(), 1);
}

#[tokio::test]
async fn broadcast_reaches_current_clients_only() {
    let t = boot_server(ServerConfig::default()).await;
    let (mut a, _) = connect_client(&t.ws_url).await;
    let (mut b, _) = connect_client(&t.ws_url).await;

    let reply = post(&t.base, "/audio/start", json!({})).await;
    assert_eq!(reply["success"], true);

    for ws in [&mut a, &mut b] {
        let event = read_json(ws).await;
        assert_eq!(event["type"], "monitoring-status");
        assert_eq!(event["monitoring"], true);
    }

    // A late joiner sees only what happens after it registered.
    let (mut late, _) = connect_client(&t.ws_url).await;
    let reply = post(&t.base, "/audio/stop", json!({})).await;
    assert_eq!(reply["success"], true);

    for ws in [&mut a, &mut b, &mut late] {
        let event = read_json(ws).await;
        assert_eq!(event["type"], "monitoring-status");
        assert_eq!(event["monitoring"], false);
    }
}

#[tokio::test]
async fn malformed_message_keeps_channel_open() {
    let t = boot_server(ServerConfig::default()).await;
    let (mut ws, _) = connect_client(&t.ws_url).await;

    ws.send(Message::text("{not json")).await.unwrap();
    let reply = read_json(&mut ws).await;
    assert_eq!(reply["type"], "error");
    assert!(reply["message"].as_str().unwrap().starts_with("Invalid JSON"));

    ws.send(Message::text(r#"{"type":"ping"}"#)).await.unwrap();
    assert_eq!(read_json(&mut ws).await["type"], "pong");

    ws.send(Message::text(r#"{"hello":"world"}"#)).await.unwrap();
    let echo = read_json(&mut ws).await;
    assert_eq!(echo["type"], "echo");
    assert_eq!(echo["data"]["hello"], "world");
}

#[tokio::test]
async fn get_state_returns_snapshot() {
    let t = boot_server(ServerConfig::default()).await;
    let (mut ws, _) = connect_client(&t.ws_url).await;

    let _ = post(&t.base, "/cue/generate", json!({"text": "amber wash half"})).await;
    let cue_event = read_json(&mut ws).await;
    assert_eq!(cue_event["type"], "cue-status");

    ws.send(Message::text(r#"{"type":"get-state"}"#)).await.unwrap();
    let snapshot = read_json(&mut ws).await;
    assert_eq!(snapshot["type"], "state");
    assert_eq!(snapshot["state"]["consoleConnected"], false);
    assert_eq!(snapshot["state"]["activeCue"]["color"], "amber");
    assert_eq!(snapshot["state"]["activeCue"]["intensity"], 50);
}

#[tokio::test]
async fn failed_console_connect_changes_nothing() {
    let t = boot_server(ServerConfig::default()).await;
    let (mut ws, _) = connect_client(&t.ws_url).await;

    let refused_port = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let reply = post(
        &t.base,
        "/console/connect",
        json!({"host": "127.0.0.1", "port": refused_port}),
    )
    .await;
    assert_eq!(reply["success"], false);
    assert!(!t.server.state().get().console_connected);

    // No console-status was broadcast: the next frame is the pong.
    ws.send(Message::text(r#"{"type":"ping"}"#)).await.unwrap();
    assert_eq!(read_json(&mut ws).await["type"], "pong");
}

#[tokio::test]
async fn tempo_changes_are_pushed() {
    let t = boot_server(ServerConfig {
        tempo_poll_interval_ms: 20,
        ..ServerConfig::default()
    })
    .await;
    let (mut ws, _) = connect_client(&t.ws_url).await;

    let _ = post(&t.base, "/audio/start", json!({})).await;
    assert_eq!(read_json(&mut ws).await["type"], "monitoring-status");

    t.audio.set_tempo(128.0).unwrap();
    let event = read_json(&mut ws).await;
    assert_eq!(event["type"], "tempo-update");
    assert_eq!(event["tempo"], 128.0);

    let status = get(&t.base, "/audio/status").await;
    assert_eq!(status["currentTempo"], 128.0);
}

#[tokio::test]
async fn tap_tempo_is_pushed_and_polled() {
    let t = boot_server(ServerConfig {
        tempo_poll_interval_ms: 20,
        ..ServerConfig::default()
    })
    .await;
    let (mut ws, _) = connect_client(&t.ws_url).await;

    let reply = post(&t.base, "/audio/tempo", json!({"bpm": 110})).await;
    assert_eq!(reply["success"], false);

    let _ = post(&t.base, "/audio/start", json!({})).await;
    assert_eq!(read_json(&mut ws).await["type"], "monitoring-status");

    let reply = post(&t.base, "/audio/tempo", json!({"bpm": 110})).await;
    assert_eq!(reply["success"], true);
    assert_eq!(reply["tempo"], 110.0);
    let event = read_json(&mut ws).await;
    assert_eq!(event["type"], "tempo-update");
    assert_eq!(event["tempo"], 110.0);
    assert!((t.audio.current_tempo() - 110.0).abs() < f64::EPSILON);

    // the monitor reads the same value back and stays quiet
    tokio::time::sleep(Duration::from_millis(100)).await;
    ws.send(Message::text(r#"{"type":"ping"}"#)).await.unwrap();
    assert_eq!(read_json(&mut ws).await["type"], "pong");
}

#[tokio::test]
async fn console_commands_reach_the_console() {
    let t = boot_server(ServerConfig::default()).await;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let console = tokio::spawn(async move {
        use tokio::io::AsyncBufReadExt;
        let (sock, _) = listener.accept().await.unwrap();
        let mut line = String::new();
        let _ = tokio::io::BufReader::new(sock)
            .read_line(&mut line)
            .await
            .unwrap();
        line
    });

    let reply = post(
        &t.base,
        "/console/connect",
        json!({"host": "127.0.0.1", "port": port}),
    )
    .await;
    assert_eq!(reply["success"], true);

    let reply = post(&t.base, "/console/command", json!({"command": "Go+ Sequence 1"})).await;
    assert_eq!(reply["success"], true);
    assert_eq!(timeout(TIMEOUT, console).await.unwrap().unwrap(), "Go+ Sequence 1\r\n");
}

#[tokio::test]
async fn full_registry_rejects_with_try_again_later() {
    let t = boot_server(ServerConfig {
        max_connections: 1,
        ..ServerConfig::default()
    })
    .await;
    let (_first, _) = connect_client(&t.ws_url).await;

    let (mut second, _) = connect_async(t.ws_url.as_str()).await.unwrap();
    let msg = timeout(TIMEOUT, second.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    match msg {
        Message::Close(Some(frame)) => assert_eq!(u16::from(frame.code), 1013),
        other => panic!("expected close frame, got {other:?}"),
    }
    assert_eq!(t.server.registry().len(), 1);
}

#[tokio::test]
async fn disconnect_deregisters_session() {
    let t = boot_server(ServerConfig::default()).await;
    let (mut ws, _) = connect_client(&t.ws_url).await;
    assert_eq!(get(&t.base, "/health").await["connections"], 1);

    ws.close(None).await.unwrap();
    timeout(TIMEOUT, async {
        while !t.server.registry().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(get(&t.base, "/health").await["connections"], 0);
}

#[tokio::test]
async fn shutdown_closes_channels() {
    let t = boot_server(ServerConfig::default()).await;
    let (mut ws, _) = connect_client(&t.ws_url).await;

    t.server.shutdown().shutdown();
    let ended = timeout(TIMEOUT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(ended.is_ok());

    timeout(TIMEOUT, async {
        while !t.server.registry().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}
