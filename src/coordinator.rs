//! Session coordinator: turns independent connections into shared,
//! ordered, presence-aware project sessions.
//!
//! One instance is constructed at startup and shared through `AppState`;
//! there is no ambient global. Each connection's events are dispatched
//! sequentially by its actor, so per-connection ordering holds; across
//! connections the room registry serializes membership changes.
//!
//! Every handler validates, mutates room state (fast, in-memory, atomic),
//! and fans out broadcasts. External I/O (access checks, persistence,
//! identity lookups, activity appends) is awaited under a bounded
//! timeout and never overlaps a registry lock.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::activity::{ActivityKind, ActivityRecord};
use crate::error::CollabError;
use crate::protocol::{ClientEvent, ServerEvent, WireUser};
use crate::providers::{AccessProvider, ActivitySink, FileStore, MessageStore, UserIdentity};
use crate::relay;
use crate::rooms::{ConnId, RoomId, RoomRegistry};
use crate::ws::{ConnectionInfo, ConnectionRegistry, ConnectionSender};
use crate::{presence, ws};

pub struct SessionCoordinator {
    rooms: RoomRegistry,
    connections: ConnectionRegistry,
    access: Arc<dyn AccessProvider>,
    files: Arc<dyn FileStore>,
    messages: Arc<dyn MessageStore>,
    activity: Arc<dyn ActivitySink>,
    io_timeout: Duration,
}

impl SessionCoordinator {
    pub fn new(
        access: Arc<dyn AccessProvider>,
        files: Arc<dyn FileStore>,
        messages: Arc<dyn MessageStore>,
        activity: Arc<dyn ActivitySink>,
        io_timeout: Duration,
    ) -> Self {
        Self {
            rooms: RoomRegistry::new(),
            connections: ws::new_connection_registry(),
            access,
            files,
            messages,
            activity,
            io_timeout,
        }
    }

    /// Resolve a principal's display identity under the provider
    /// deadline. Used by the upgrade handler before admitting a
    /// connection; a hung identity provider rejects instead of stalling
    /// the upgrade.
    pub async fn resolve_identity(&self, user_id: &str) -> Result<UserIdentity, CollabError> {
        self.bounded(self.access.user_identity(user_id)).await
    }

    /// Register an authenticated connection and hand back its handle.
    pub fn register(&self, user_id: &str, sender: ConnectionSender) -> ConnId {
        let conn_id = uuid::Uuid::new_v4();
        self.connections.insert(
            conn_id,
            ConnectionInfo {
                user_id: user_id.to_string(),
                sender,
            },
        );
        conn_id
    }

    fn user_of(&self, conn: ConnId) -> Option<String> {
        self.connections.get(&conn).map(|c| c.user_id.clone())
    }

    /// Bound an external call by the configured timeout. A timeout is
    /// indistinguishable from a provider failure for the caller.
    async fn bounded<T, F>(&self, fut: F) -> Result<T, CollabError>
    where
        F: Future<Output = Result<T, CollabError>>,
    {
        match tokio::time::timeout(self.io_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CollabError::Timeout),
        }
    }

    /// Append an activity record, best-effort. The broadcast that follows
    /// is never suppressed by a failed append.
    async fn record_activity(&self, record: ActivityRecord) {
        let kind = record.kind;
        if let Err(e) = self.bounded(self.activity.append(record)).await {
            tracing::warn!(kind = ?kind, error = %e, "Activity append failed");
        }
    }

    /// Dispatch one inbound event. Any handler failure becomes an `error`
    /// event to the originating connection only.
    pub async fn handle_event(&self, conn: ConnId, event: ClientEvent) {
        let result = match event {
            ClientEvent::JoinProject { project_id } => self.join_project(conn, &project_id).await,
            ClientEvent::OpenFile {
                project_id,
                file_id,
            } => self.open_file(conn, &project_id, &file_id).await,
            ClientEvent::UpdateFile {
                project_id,
                file_id,
                content,
                cursor_position,
            } => {
                self.update_file(conn, &project_id, &file_id, content, cursor_position)
                    .await
            }
            ClientEvent::ChatMessage {
                project_id,
                content,
            } => self.chat_message(conn, &project_id, &content).await,
            ClientEvent::JoinCall { project_id } => self.join_call(conn, &project_id).await,
            ClientEvent::LeaveCall { project_id } => self.leave_call(conn, &project_id).await,
        };

        if let Err(e) = result {
            relay::send_to(
                &self.connections,
                conn,
                &ServerEvent::Error {
                    message: e.wire_message(),
                },
            );
        }
    }

    async fn join_project(&self, conn: ConnId, project_id: &str) -> Result<(), CollabError> {
        let user_id = self.user_of(conn).ok_or(CollabError::NotFound("connection"))?;

        // Authorization comes first: a denied join mutates nothing.
        let allowed = self
            .bounded(self.access.has_project_access(project_id, &user_id))
            .await?;
        if !allowed {
            return Err(CollabError::Unauthorized);
        }

        let room = RoomId::project(project_id);
        if self.rooms.is_member(&room, conn) {
            // Idempotent re-join: no duplicate membership, no duplicate
            // broadcast.
            tracing::debug!(user_id = %user_id, room = %room, "Already joined");
            return Ok(());
        }

        // A connection is in at most one project at a time. Switching
        // leaves the previous project room and every sub-room first.
        let previous = self.rooms.rooms_of(conn);
        if previous.iter().any(|r| matches!(r, RoomId::Project(_))) {
            let left = self.rooms.remove_connection(conn);
            self.announce_departures(&user_id, &left).await;
        }

        self.rooms.join(&room, conn);

        self.record_activity(ActivityRecord::new(
            ActivityKind::UserJoined,
            project_id,
            &user_id,
        ))
        .await;

        relay::broadcast(
            &self.connections,
            &self.rooms,
            &room,
            &ServerEvent::UserJoined {
                user_id: user_id.clone(),
                timestamp: Utc::now(),
            },
            Some(conn),
        );
        self.broadcast_presence(project_id).await;

        tracing::info!(user_id = %user_id, project_id = %project_id, "User joined project");
        Ok(())
    }

    async fn open_file(
        &self,
        conn: ConnId,
        project_id: &str,
        file_id: &str,
    ) -> Result<(), CollabError> {
        let user_id = self.user_of(conn).ok_or(CollabError::NotFound("connection"))?;

        // Enforced by room membership; the access provider is not
        // re-consulted for sub-rooms.
        let project_room = RoomId::project(project_id);
        if !self.rooms.is_member(&project_room, conn) {
            return Err(CollabError::Unauthorized);
        }

        self.rooms.join(&RoomId::file(file_id), conn);

        // Collaborators see who is editing what without opening the file
        // themselves, so this goes to the project room.
        relay::broadcast(
            &self.connections,
            &self.rooms,
            &project_room,
            &ServerEvent::FileUserEditing {
                file_id: file_id.to_string(),
                user_id,
                timestamp: Utc::now(),
            },
            Some(conn),
        );

        let content = self
            .bounded(self.files.file_content(file_id))
            .await?
            .ok_or(CollabError::NotFound("file"))?;

        relay::send_to(
            &self.connections,
            conn,
            &ServerEvent::FileContent {
                file_id: file_id.to_string(),
                content,
            },
        );
        Ok(())
    }

    async fn update_file(
        &self,
        conn: ConnId,
        project_id: &str,
        file_id: &str,
        content: String,
        cursor_position: serde_json::Value,
    ) -> Result<(), CollabError> {
        let user_id = self.user_of(conn).ok_or(CollabError::NotFound("connection"))?;

        // Persist first: if the write fails nothing is broadcast and the
        // sender alone sees the error.
        self.bounded(self.files.save_file_content(file_id, &content))
            .await?;

        self.record_activity(
            ActivityRecord::new(ActivityKind::FileUpdated, project_id, &user_id)
                .with_file(file_id),
        )
        .await;

        // Fan out to everyone else editing this file. Last write wins at
        // the client; there is deliberately no merge or ordering protocol
        // here.
        relay::broadcast(
            &self.connections,
            &self.rooms,
            &RoomId::file(file_id),
            &ServerEvent::FileUpdated {
                file_id: file_id.to_string(),
                content,
                user_id,
                cursor_position,
                timestamp: Utc::now(),
            },
            Some(conn),
        );
        Ok(())
    }

    async fn chat_message(
        &self,
        conn: ConnId,
        project_id: &str,
        content: &str,
    ) -> Result<(), CollabError> {
        let user_id = self.user_of(conn).ok_or(CollabError::NotFound("connection"))?;

        let stored = self
            .bounded(self.messages.save_message(project_id, &user_id, content))
            .await?;

        let sender = self.wire_user(&user_id).await;

        // Self-inclusive: the sender's UI updates from the authoritative
        // broadcast, not from optimistic local state.
        relay::broadcast(
            &self.connections,
            &self.rooms,
            &RoomId::project(project_id),
            &ServerEvent::ChatMessage {
                id: stored.id,
                content: content.to_string(),
                sender,
                timestamp: stored.timestamp,
            },
            None,
        );
        Ok(())
    }

    async fn join_call(&self, conn: ConnId, project_id: &str) -> Result<(), CollabError> {
        let user_id = self.user_of(conn).ok_or(CollabError::NotFound("connection"))?;

        let room = RoomId::call(project_id);
        if !self.rooms.join(&room, conn) {
            return Ok(());
        }

        self.record_activity(ActivityRecord::new(
            ActivityKind::VoiceCallStarted,
            project_id,
            &user_id,
        ))
        .await;

        let user = self.wire_user(&user_id).await;
        let participants = self.call_participants(&room).await;
        relay::broadcast(
            &self.connections,
            &self.rooms,
            &room,
            &ServerEvent::CallUserJoined {
                user,
                participants,
                timestamp: Utc::now(),
            },
            None,
        );
        Ok(())
    }

    async fn leave_call(&self, conn: ConnId, project_id: &str) -> Result<(), CollabError> {
        let user_id = self.user_of(conn).ok_or(CollabError::NotFound("connection"))?;

        let room = RoomId::call(project_id);
        if !self.rooms.leave(&room, conn) {
            return Ok(());
        }

        self.record_activity(ActivityRecord::new(
            ActivityKind::VoiceCallEnded,
            project_id,
            &user_id,
        ))
        .await;

        let user = self.wire_user(&user_id).await;
        let participants = self.call_participants(&room).await;
        relay::broadcast(
            &self.connections,
            &self.rooms,
            &room,
            &ServerEvent::CallUserLeft {
                user,
                participants,
                timestamp: Utc::now(),
            },
            None,
        );
        Ok(())
    }

    /// Tear down a connection. Runs unconditionally on transport close,
    /// clean or abrupt: every remaining membership is removed first, then
    /// departures are announced best-effort.
    pub async fn disconnect(&self, conn: ConnId) {
        let Some(user_id) = self.user_of(conn) else {
            return;
        };

        let left = self.rooms.remove_connection(conn);
        self.announce_departures(&user_id, &left).await;
        self.connections.remove(&conn);

        tracing::info!(user_id = %user_id, rooms = left.len(), "Connection torn down");
    }

    /// Announce that a connection left the given rooms. One `USER_LEFT`
    /// record and one `user:left` + presence pair per project room; an
    /// updated participant list per call room; file rooms need nothing.
    /// Individual failures are logged and skipped; cleanup already
    /// happened and must stay complete.
    async fn announce_departures(&self, user_id: &str, left: &[RoomId]) {
        for room in left {
            match room {
                RoomId::Project(project_id) => {
                    self.record_activity(ActivityRecord::new(
                        ActivityKind::UserLeft,
                        project_id,
                        user_id,
                    ))
                    .await;

                    relay::broadcast(
                        &self.connections,
                        &self.rooms,
                        room,
                        &ServerEvent::UserLeft {
                            user_id: user_id.to_string(),
                            timestamp: Utc::now(),
                        },
                        None,
                    );
                    self.broadcast_presence(project_id).await;
                }
                RoomId::Call(_) => {
                    let user = self.wire_user(user_id).await;
                    let participants = self.call_participants(room).await;
                    relay::broadcast(
                        &self.connections,
                        &self.rooms,
                        room,
                        &ServerEvent::CallUserLeft {
                            user,
                            participants,
                            timestamp: Utc::now(),
                        },
                        None,
                    );
                }
                RoomId::File(_) => {}
            }
        }
    }

    /// Recompute and fan out the presence snapshot to the whole project
    /// room. Best-effort: a provider failure here is logged, not surfaced.
    async fn broadcast_presence(&self, project_id: &str) {
        match self
            .bounded(presence::project_snapshot(
                self.access.as_ref(),
                &self.rooms,
                &self.connections,
                project_id,
            ))
            .await
        {
            Ok(snapshot) => {
                relay::broadcast(
                    &self.connections,
                    &self.rooms,
                    &RoomId::project(project_id),
                    &ServerEvent::UsersActive(snapshot),
                    None,
                );
            }
            Err(e) => {
                tracing::warn!(project_id = %project_id, error = %e, "Presence snapshot failed");
            }
        }
    }

    /// Resolve a user's display identity, falling back to a placeholder
    /// when the directory cannot answer.
    async fn wire_user(&self, user_id: &str) -> WireUser {
        match self.bounded(self.access.user_identity(user_id)).await {
            Ok(identity) => WireUser {
                id: user_id.to_string(),
                name: identity.name,
                image: identity.image,
            },
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Identity lookup failed");
                WireUser {
                    id: user_id.to_string(),
                    name: "Unknown User".to_string(),
                    image: None,
                }
            }
        }
    }

    /// Current call participants: room members resolved to identities,
    /// de-duplicated per user.
    async fn call_participants(&self, room: &RoomId) -> Vec<WireUser> {
        let mut user_ids: Vec<String> = Vec::new();
        for conn_id in self.rooms.members(room) {
            if let Some(conn) = self.connections.get(&conn_id) {
                if !user_ids.contains(&conn.user_id) {
                    user_ids.push(conn.user_id.clone());
                }
            }
        }

        let mut participants = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            participants.push(self.wire_user(&user_id).await);
        }
        participants
    }
}
