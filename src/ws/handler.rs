//! WebSocket upgrade endpoint.
//!
//! Session issuance lives outside this service; the upgrade request
//! carries an already-authenticated principal. The handler still refuses
//! principals the identity provider does not know, closing with an
//! application close code instead of a normal session.

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use serde::Deserialize;

use crate::state::AppState;
use crate::ws::actor;

/// Query parameters for the WebSocket upgrade.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub user: String,
}

/// Close code for an unknown or unresolvable principal.
const CLOSE_IDENTITY_UNKNOWN: u16 = 4001;

/// GET /ws?user=<id>
/// On identity failure, upgrades then immediately closes with 4001; on
/// success spawns the connection actor.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let identity = state.coordinator.resolve_identity(&params.user).await;

    match identity {
        Ok(identity) => {
            tracing::info!(user_id = %params.user, name = %identity.name, "WebSocket connection authenticated");
            let user_id = params.user;
            ws.on_upgrade(move |socket| actor::run_connection(socket, state, user_id))
        }
        Err(e) => {
            tracing::warn!(user_id = %params.user, error = %e, "WebSocket identity rejected");
            ws.on_upgrade(move |mut socket: WebSocket| async move {
                let close_frame = CloseFrame {
                    code: CLOSE_IDENTITY_UNKNOWN,
                    reason: "Unknown identity".into(),
                };
                let _ = socket.send(Message::Close(Some(close_frame))).await;
            })
        }
    }
}
