//! Wire protocol: JSON events exchanged with clients over WebSocket.
//!
//! Every frame is a tagged envelope `{"event": "...", "data": {...}}`.
//! Inbound events are decoded once at the transport boundary into
//! [`ClientEvent`]; everything the server emits is a [`ServerEvent`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound domain events. One variant per client action.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "join:project")]
    JoinProject {
        #[serde(rename = "projectId")]
        project_id: String,
    },
    #[serde(rename = "file:open")]
    OpenFile {
        #[serde(rename = "projectId")]
        project_id: String,
        #[serde(rename = "fileId")]
        file_id: String,
    },
    #[serde(rename = "file:update")]
    UpdateFile {
        #[serde(rename = "projectId")]
        project_id: String,
        #[serde(rename = "fileId")]
        file_id: String,
        content: String,
        /// Opaque editor cursor state, relayed as-is. No merge logic:
        /// concurrent updates are last-write-wins at the client.
        #[serde(rename = "cursorPosition", default)]
        cursor_position: Value,
    },
    #[serde(rename = "chat:message")]
    ChatMessage {
        #[serde(rename = "projectId")]
        project_id: String,
        content: String,
    },
    #[serde(rename = "call:join")]
    JoinCall {
        #[serde(rename = "projectId")]
        project_id: String,
    },
    #[serde(rename = "call:leave")]
    LeaveCall {
        #[serde(rename = "projectId")]
        project_id: String,
    },
}

/// A project member with resolved display identity and live status,
/// as carried by the `users:active` presence snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActiveUser {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub role: String,
    pub online: bool,
}

/// Display identity attached to chat messages and call events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireUser {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
}

/// Outbound events. Serialized with the same envelope as inbound ones.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "user:joined")]
    UserJoined {
        #[serde(rename = "userId")]
        user_id: String,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "user:left")]
    UserLeft {
        #[serde(rename = "userId")]
        user_id: String,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "users:active")]
    UsersActive(Vec<ActiveUser>),
    #[serde(rename = "file:content")]
    FileContent {
        #[serde(rename = "fileId")]
        file_id: String,
        content: String,
    },
    #[serde(rename = "file:user-editing")]
    FileUserEditing {
        #[serde(rename = "fileId")]
        file_id: String,
        #[serde(rename = "userId")]
        user_id: String,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "file:updated")]
    FileUpdated {
        #[serde(rename = "fileId")]
        file_id: String,
        content: String,
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "cursorPosition")]
        cursor_position: Value,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "chat:message")]
    ChatMessage {
        id: String,
        content: String,
        sender: WireUser,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "call:user-joined")]
    CallUserJoined {
        user: WireUser,
        participants: Vec<WireUser>,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "call:user-left")]
    CallUserLeft {
        user: WireUser,
        participants: Vec<WireUser>,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerEvent {
    /// Serialize to the wire representation. Events are plain data; failure
    /// here would be a programming error, so it is logged and dropped by
    /// the relay rather than propagated.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
