pub mod actor;
pub mod handler;

use axum::extract::ws::Message;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::rooms::ConnId;

/// Sender half of a connection's outbound channel. The per-connection
/// writer task owns the socket sink, so pushing here never blocks on a
/// slow peer.
pub type ConnectionSender = mpsc::UnboundedSender<Message>;

/// What the coordinator knows about one live connection.
#[derive(Clone)]
pub struct ConnectionInfo {
    pub user_id: String,
    pub sender: ConnectionSender,
}

/// All active WebSocket connections, keyed by connection handle.
pub type ConnectionRegistry = Arc<DashMap<ConnId, ConnectionInfo>>;

pub fn new_connection_registry() -> ConnectionRegistry {
    Arc::new(DashMap::new())
}
