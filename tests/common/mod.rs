//! Shared harness: boots the coordinator on an ephemeral port against a
//! seeded in-memory workspace and drives it over real WebSockets.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use collab_server::coordinator::SessionCoordinator;
use collab_server::providers::memory::MemoryWorkspace;
use collab_server::providers::{AccessProvider, ActivitySink, FileStore, ProjectRole};
use collab_server::routes::build_router;
use collab_server::state::AppState;

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    pub workspace: Arc<MemoryWorkspace>,
}

/// Seed: project 42 owned by alice with bob as editor, project 43 owned
/// by alice, file 7, and carol who is a known user without project
/// access.
pub fn seeded_workspace() -> Arc<MemoryWorkspace> {
    let workspace = Arc::new(MemoryWorkspace::new());
    workspace.add_user("alice", "Alice", Some("alice.png"));
    workspace.add_user("bob", "Bob", None);
    workspace.add_user("carol", "Carol", None);
    workspace.add_project("42", "alice");
    workspace.add_collaborator("42", "bob", ProjectRole::Editor);
    workspace.add_project("43", "alice");
    workspace.add_file("7", "fn main() {}");
    workspace
}

pub async fn start_test_server() -> TestServer {
    let workspace = seeded_workspace();
    let files = workspace.clone();
    let activity = workspace.clone();
    start_custom(
        workspace.clone(),
        workspace,
        files,
        activity,
        Duration::from_secs(2),
    )
    .await
}

/// Start the server with a custom file store (e.g. one that fails every
/// write) while the rest of the providers use the seeded workspace.
pub async fn start_with_files(
    workspace: Arc<MemoryWorkspace>,
    files: Arc<dyn FileStore>,
) -> TestServer {
    let access = workspace.clone();
    let activity = workspace.clone();
    start_custom(workspace, access, files, activity, Duration::from_secs(2)).await
}

/// Fully custom wiring: swap in misbehaving providers or a short
/// provider deadline while keeping the seeded workspace for the rest.
pub async fn start_custom(
    workspace: Arc<MemoryWorkspace>,
    access: Arc<dyn AccessProvider>,
    files: Arc<dyn FileStore>,
    activity: Arc<dyn ActivitySink>,
    io_timeout: Duration,
) -> TestServer {
    let coordinator = Arc::new(SessionCoordinator::new(
        access,
        files,
        workspace.clone(),
        activity,
        io_timeout,
    ));
    let app = build_router(AppState { coordinator });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer { addr, workspace }
}

pub async fn connect(addr: SocketAddr, user: &str) -> WsClient {
    let url = format!("ws://{}/ws?user={}", addr, user);
    let (ws, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("Failed to connect to WebSocket");
    ws
}

pub async fn send_event(ws: &mut WsClient, event: &str, data: Value) {
    let frame = json!({ "event": event, "data": data }).to_string();
    ws.send(Message::Text(frame.into()))
        .await
        .expect("Failed to send event");
}

/// Next decoded text frame, within 2 seconds.
pub async fn recv_event(ws: &mut WsClient) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("Timed out waiting for event")
            .expect("Stream ended")
            .expect("WebSocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("Invalid JSON frame");
        }
    }
}

/// Skip frames until one with the given event tag arrives.
pub async fn recv_named(ws: &mut WsClient, event: &str) -> Value {
    loop {
        let value = recv_event(ws).await;
        if value["event"] == event {
            return value;
        }
    }
}

/// Assert no text frame arrives within the window.
pub async fn assert_silent(ws: &mut WsClient, window: Duration) {
    let deadline = Instant::now() + window;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return;
        }
        match tokio::time::timeout(remaining, ws.next()).await {
            Err(_) => return,
            Ok(Some(Ok(Message::Text(text)))) => {
                panic!("Expected silence, got frame: {}", text)
            }
            Ok(_) => continue,
        }
    }
}
