//! Interfaces to the surrounding system.
//!
//! The coordinator owns no durable state: project membership, user
//! identity, file content, chat history, and the activity log all live
//! behind these traits. The binary wires in the in-memory implementation
//! from [`memory`]; a real deployment constructs the coordinator through
//! the library with its own implementations.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::activity::ActivityRecord;
use crate::error::CollabError;

/// Role of a project member as reported by the access provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectRole {
    Owner,
    Editor,
    Viewer,
}

impl ProjectRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Owner => "OWNER",
            ProjectRole::Editor => "EDITOR",
            ProjectRole::Viewer => "VIEWER",
        }
    }
}

/// One entry of a project's owner-and-collaborators list.
#[derive(Debug, Clone)]
pub struct ProjectMember {
    pub user_id: String,
    pub role: ProjectRole,
}

/// Display attributes of a user.
#[derive(Debug, Clone)]
pub struct UserIdentity {
    pub name: String,
    pub image: Option<String>,
}

/// A persisted chat message, as returned by the message store.
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
}

/// Answers authorization and identity questions for projects and users.
#[async_trait]
pub trait AccessProvider: Send + Sync {
    async fn has_project_access(
        &self,
        project_id: &str,
        user_id: &str,
    ) -> Result<bool, CollabError>;

    /// Owner and collaborators of a project, owner first.
    async fn project_members(&self, project_id: &str) -> Result<Vec<ProjectMember>, CollabError>;

    async fn user_identity(&self, user_id: &str) -> Result<UserIdentity, CollabError>;
}

/// Reads and writes file content in the external document store.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// `Ok(None)` when the file does not exist.
    async fn file_content(&self, file_id: &str) -> Result<Option<String>, CollabError>;

    async fn save_file_content(&self, file_id: &str, content: &str) -> Result<(), CollabError>;
}

/// Persists chat messages.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn save_message(
        &self,
        project_id: &str,
        user_id: &str,
        content: &str,
    ) -> Result<StoredMessage, CollabError>;
}

/// Append-only sink for collaboration activity records. Best-effort from
/// the coordinator's side: failures are logged, never propagated.
#[async_trait]
pub trait ActivitySink: Send + Sync {
    async fn append(&self, record: ActivityRecord) -> Result<(), CollabError>;
}
