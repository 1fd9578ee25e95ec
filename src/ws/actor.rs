//! Actor-per-connection: one reader loop, one writer task, one keepalive.
//!
//! The reader loop awaits each handler to completion before taking the
//! next frame, which is what gives a connection in-order event
//! processing. The writer task owns the socket sink and drains an mpsc
//! channel, so broadcasts to this connection never block the sender.

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};

use crate::protocol::{ClientEvent, ServerEvent};
use crate::state::AppState;

/// Server pings every 30 seconds; prevents membership leaks from abrupt
/// disconnects.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// If a pong does not arrive within 10 seconds of a ping, the connection
/// is considered dead.
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Run an authenticated connection to completion. When this returns, the
/// connection has been fully deregistered and every room membership
/// cleaned up.
pub async fn run_connection(socket: WebSocket, state: AppState, user_id: String) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    let coordinator = state.coordinator.clone();
    let conn_id = coordinator.register(&user_id, tx.clone());

    tracing::info!(user_id = %user_id, conn_id = %conn_id, "WebSocket actor started");

    // Writer task: forwards mpsc messages to the socket sink.
    let writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    // Keepalive: periodic pings, close on missed pong.
    let (pong_tx, mut pong_rx) = mpsc::unbounded_channel::<()>();
    let ping_tx = tx.clone();
    let ping_handle = tokio::spawn(async move {
        let mut ping_timer = interval(PING_INTERVAL);
        // Skip the immediate first tick.
        ping_timer.tick().await;

        loop {
            ping_timer.tick().await;

            if ping_tx.send(Message::Ping(vec![1, 2, 3, 4].into())).is_err() {
                // Writer task has died, connection is gone.
                break;
            }

            match timeout(PONG_TIMEOUT, pong_rx.recv()).await {
                Ok(Some(())) => {}
                _ => {
                    tracing::warn!("Pong timeout, closing connection");
                    let _ = ping_tx.send(Message::Close(Some(CloseFrame {
                        code: 1001,
                        reason: "Pong timeout".into(),
                    })));
                    break;
                }
            }
        }
    });

    // Reader loop: frames are processed strictly in arrival order.
    loop {
        match ws_receiver.next().await {
            Some(Ok(msg)) => match msg {
                Message::Text(text) => match serde_json::from_str::<ClientEvent>(text.as_str()) {
                    Ok(event) => coordinator.handle_event(conn_id, event).await,
                    Err(e) => {
                        tracing::debug!(
                            user_id = %user_id,
                            error = %e,
                            "Undecodable client event"
                        );
                        let error = ServerEvent::Error {
                            message: "Malformed event".to_string(),
                        };
                        if let Ok(json) = error.to_json() {
                            let _ = tx.send(Message::Text(json.into()));
                        }
                    }
                },
                Message::Binary(_) => {
                    tracing::debug!(user_id = %user_id, "Ignoring binary frame (protocol is JSON text)");
                }
                Message::Pong(_) => {
                    let _ = pong_tx.send(());
                }
                Message::Ping(data) => {
                    let _ = tx.send(Message::Pong(data));
                }
                Message::Close(frame) => {
                    tracing::info!(user_id = %user_id, reason = ?frame, "Client initiated close");
                    break;
                }
            },
            Some(Err(e)) => {
                tracing::warn!(user_id = %user_id, error = %e, "WebSocket receive error");
                break;
            }
            None => {
                tracing::info!(user_id = %user_id, "WebSocket stream ended");
                break;
            }
        }
    }

    writer_handle.abort();
    ping_handle.abort();

    // Unconditional teardown, also on abrupt transport loss: the
    // coordinator still knows every room this connection was in.
    coordinator.disconnect(conn_id).await;

    tracing::info!(user_id = %user_id, conn_id = %conn_id, "WebSocket actor stopped");
}

/// Writer task: owns the sink half of the socket.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if ws_sender.send(msg).await.is_err() {
            // Socket send failed, connection is broken.
            break;
        }
    }
}
