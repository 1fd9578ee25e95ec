//! Presence tracking: the `users:active` snapshot for a project room.
//!
//! Derived, never cached. Membership changes are rare relative to reads
//! in this domain and a stale snapshot would be worse than the cost of
//! recomputation.

use std::collections::HashSet;

use crate::error::CollabError;
use crate::protocol::ActiveUser;
use crate::providers::AccessProvider;
use crate::rooms::{RoomId, RoomRegistry};
use crate::ws::ConnectionRegistry;

/// Compute the ordered presence snapshot for a project: owner first, then
/// collaborators in provider order, each annotated `online` iff one of
/// that user's connections is in the project room right now.
pub async fn project_snapshot(
    access: &dyn AccessProvider,
    rooms: &RoomRegistry,
    connections: &ConnectionRegistry,
    project_id: &str,
) -> Result<Vec<ActiveUser>, CollabError> {
    let members = access.project_members(project_id).await?;

    // One consistent read of the room at computation time.
    let online_users: HashSet<String> = rooms
        .members(&RoomId::project(project_id))
        .into_iter()
        .filter_map(|conn_id| connections.get(&conn_id).map(|c| c.user_id.clone()))
        .collect();

    let mut snapshot = Vec::with_capacity(members.len());
    for member in members {
        // A member without a resolvable identity still shows up in the
        // list; display attributes just stay empty.
        let identity = access.user_identity(&member.user_id).await.ok();
        let online = online_users.contains(&member.user_id);
        snapshot.push(ActiveUser {
            id: member.user_id,
            name: identity
                .as_ref()
                .map(|i| i.name.clone())
                .unwrap_or_else(|| "Unknown User".to_string()),
            image: identity.and_then(|i| i.image),
            role: member.role.as_str().to_string(),
            online,
        });
    }

    // Owner first regardless of provider ordering.
    snapshot.sort_by_key(|u| u.role != "OWNER");
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::memory::MemoryWorkspace;
    use crate::providers::ProjectRole;
    use crate::ws::{new_connection_registry, ConnectionInfo};
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn workspace() -> MemoryWorkspace {
        let ws = MemoryWorkspace::new();
        ws.add_user("alice", "Alice", Some("alice.png"));
        ws.add_user("bob", "Bob", None);
        ws.add_project("42", "alice");
        ws.add_collaborator("42", "bob", ProjectRole::Editor);
        ws
    }

    fn connect(connections: &ConnectionRegistry, user: &str) -> crate::rooms::ConnId {
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn_id = Uuid::new_v4();
        connections.insert(
            conn_id,
            ConnectionInfo {
                user_id: user.to_string(),
                sender: tx,
            },
        );
        conn_id
    }

    #[tokio::test]
    async fn owner_is_listed_first_and_online_tracks_room_membership() {
        let ws = workspace();
        let rooms = RoomRegistry::new();
        let connections = new_connection_registry();

        let bob_conn = connect(&connections, "bob");
        rooms.join(&RoomId::project("42"), bob_conn);

        let snapshot = project_snapshot(&ws, &rooms, &connections, "42")
            .await
            .unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].id, "alice");
        assert_eq!(snapshot[0].role, "OWNER");
        assert!(!snapshot[0].online);
        assert_eq!(snapshot[1].id, "bob");
        assert!(snapshot[1].online);
    }

    #[tokio::test]
    async fn connections_outside_the_project_room_do_not_count() {
        let ws = workspace();
        let rooms = RoomRegistry::new();
        let connections = new_connection_registry();

        // Alice connected but never joined the project room.
        connect(&connections, "alice");

        let snapshot = project_snapshot(&ws, &rooms, &connections, "42")
            .await
            .unwrap();
        assert!(snapshot.iter().all(|u| !u.online));
    }

    #[tokio::test]
    async fn unknown_project_is_an_error() {
        let ws = workspace();
        let rooms = RoomRegistry::new();
        let connections = new_connection_registry();

        let result = project_snapshot(&ws, &rooms, &connections, "missing").await;
        assert!(matches!(result, Err(CollabError::NotFound(_))));
    }
}
