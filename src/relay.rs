//! Broadcast relay: best-effort, at-most-once fan-out of server events.
//!
//! Delivery pushes onto each member's unbounded channel; the writer task
//! that owns the socket drains it, so one slow or broken connection never
//! delays the others. No acknowledgments, no retries.

use axum::extract::ws::Message;

use crate::protocol::ServerEvent;
use crate::rooms::{ConnId, RoomId, RoomRegistry};
use crate::ws::ConnectionRegistry;

/// Deliver an event to every member of `room`, optionally excluding one
/// connection (typically the sender).
pub fn broadcast(
    connections: &ConnectionRegistry,
    rooms: &RoomRegistry,
    room: &RoomId,
    event: &ServerEvent,
    exclude: Option<ConnId>,
) {
    let payload = match event.to_json() {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(room = %room, error = %e, "Failed to serialize event");
            return;
        }
    };

    for conn_id in rooms.members(room) {
        if Some(conn_id) == exclude {
            continue;
        }
        if let Some(conn) = connections.get(&conn_id) {
            let _ = conn.sender.send(Message::Text(payload.clone().into()));
        }
    }
}

/// Deliver an event to a single connection.
pub fn send_to(connections: &ConnectionRegistry, conn_id: ConnId, event: &ServerEvent) {
    let payload = match event.to_json() {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize event");
            return;
        }
    };
    if let Some(conn) = connections.get(&conn_id) {
        let _ = conn.sender.send(Message::Text(payload.into()));
    }
}
