//! Room registry: which connections are in which rooms.
//!
//! Rooms are created lazily on first join and removed when their member
//! set empties. The registry keeps both directions of the membership
//! relation (room -> connections, connection -> rooms) behind a single
//! mutex so that joins, leaves, and disconnect teardown stay atomic under
//! concurrency. All operations are fast and in-memory; callers must not
//! hold results of `members()` as if they were live views.
//!
//! The registry has no authorization knowledge. Access checks happen in
//! the session coordinator before any join.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Mutex;

use uuid::Uuid;

/// Opaque handle for one connection, assigned at registration.
pub type ConnId = Uuid;

/// Room identifier. The display form (`project:<id>` etc.) is the stable
/// tag used in logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoomId {
    Project(String),
    File(String),
    Call(String),
}

impl RoomId {
    pub fn project(id: impl Into<String>) -> Self {
        RoomId::Project(id.into())
    }

    pub fn file(id: impl Into<String>) -> Self {
        RoomId::File(id.into())
    }

    pub fn call(id: impl Into<String>) -> Self {
        RoomId::Call(id.into())
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomId::Project(id) => write!(f, "project:{}", id),
            RoomId::File(id) => write!(f, "file:{}", id),
            RoomId::Call(id) => write!(f, "call:{}", id),
        }
    }
}

#[derive(Default)]
struct RegistryInner {
    rooms: HashMap<RoomId, HashSet<ConnId>>,
    memberships: HashMap<ConnId, HashSet<RoomId>>,
}

/// In-memory membership map shared by the coordinator and the relay.
#[derive(Default)]
pub struct RoomRegistry {
    inner: Mutex<RegistryInner>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room. Returns `true` if the membership is
    /// new, `false` if the connection was already in the room (callers use
    /// this to suppress duplicate join broadcasts).
    pub fn join(&self, room: &RoomId, conn: ConnId) -> bool {
        let mut inner = self.inner.lock().expect("room registry poisoned");
        let newly_joined = inner.rooms.entry(room.clone()).or_default().insert(conn);
        if newly_joined {
            inner.memberships.entry(conn).or_default().insert(room.clone());
        }
        newly_joined
    }

    /// Remove a connection from a room, deleting the room once empty.
    /// Returns `true` if the connection was a member.
    pub fn leave(&self, room: &RoomId, conn: ConnId) -> bool {
        let mut inner = self.inner.lock().expect("room registry poisoned");
        Self::leave_locked(&mut inner, room, conn)
    }

    fn leave_locked(inner: &mut RegistryInner, room: &RoomId, conn: ConnId) -> bool {
        let was_member = match inner.rooms.get_mut(room) {
            Some(members) => members.remove(&conn),
            None => false,
        };
        if was_member {
            if inner.rooms.get(room).is_some_and(|m| m.is_empty()) {
                inner.rooms.remove(room);
            }
            if let Some(rooms) = inner.memberships.get_mut(&conn) {
                rooms.remove(room);
                if rooms.is_empty() {
                    inner.memberships.remove(&conn);
                }
            }
        }
        was_member
    }

    /// Snapshot of the room's member set at this instant.
    pub fn members(&self, room: &RoomId) -> Vec<ConnId> {
        let inner = self.inner.lock().expect("room registry poisoned");
        inner
            .rooms
            .get(room)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Snapshot of every room the connection currently belongs to.
    pub fn rooms_of(&self, conn: ConnId) -> Vec<RoomId> {
        let inner = self.inner.lock().expect("room registry poisoned");
        inner
            .memberships
            .get(&conn)
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_member(&self, room: &RoomId, conn: ConnId) -> bool {
        let inner = self.inner.lock().expect("room registry poisoned");
        inner.rooms.get(room).is_some_and(|m| m.contains(&conn))
    }

    /// Atomically remove a connection from every room it belongs to,
    /// returning the rooms it left. Used for disconnect teardown and for
    /// leaving a project (with its sub-rooms) when switching projects.
    pub fn remove_connection(&self, conn: ConnId) -> Vec<RoomId> {
        let mut inner = self.inner.lock().expect("room registry poisoned");
        let rooms: Vec<RoomId> = inner
            .memberships
            .get(&conn)
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default();
        for room in &rooms {
            Self::leave_locked(&mut inner, room, conn);
        }
        rooms
    }
}
