//! In-memory provider implementation.
//!
//! Backs the standalone binary and the integration tests: seedable maps
//! of users, projects, and files, plus an inspectable activity log.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::activity::ActivityRecord;
use crate::error::CollabError;
use crate::providers::{
    AccessProvider, ActivitySink, FileStore, MessageStore, ProjectMember, ProjectRole,
    StoredMessage, UserIdentity,
};

#[derive(Debug, Clone)]
struct ProjectEntry {
    owner: String,
    /// Collaborators in insertion order with their role.
    collaborators: Vec<(String, ProjectRole)>,
}

/// Seedable in-memory workspace store implementing every provider trait.
#[derive(Default)]
pub struct MemoryWorkspace {
    users: Mutex<HashMap<String, UserIdentity>>,
    projects: Mutex<HashMap<String, ProjectEntry>>,
    files: Mutex<HashMap<String, String>>,
    activities: Mutex<Vec<ActivityRecord>>,
}

impl MemoryWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user_id: &str, name: &str, image: Option<&str>) {
        self.users.lock().unwrap().insert(
            user_id.to_string(),
            UserIdentity {
                name: name.to_string(),
                image: image.map(str::to_string),
            },
        );
    }

    pub fn add_project(&self, project_id: &str, owner: &str) {
        self.projects.lock().unwrap().insert(
            project_id.to_string(),
            ProjectEntry {
                owner: owner.to_string(),
                collaborators: Vec::new(),
            },
        );
    }

    pub fn add_collaborator(&self, project_id: &str, user_id: &str, role: ProjectRole) {
        if let Some(project) = self.projects.lock().unwrap().get_mut(project_id) {
            project
                .collaborators
                .push((user_id.to_string(), role));
        }
    }

    pub fn add_file(&self, file_id: &str, content: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(file_id.to_string(), content.to_string());
    }

    pub fn file(&self, file_id: &str) -> Option<String> {
        self.files.lock().unwrap().get(file_id).cloned()
    }

    /// Activity records appended so far, in append order.
    pub fn activities(&self) -> Vec<ActivityRecord> {
        self.activities.lock().unwrap().clone()
    }
}

#[async_trait]
impl AccessProvider for MemoryWorkspace {
    async fn has_project_access(
        &self,
        project_id: &str,
        user_id: &str,
    ) -> Result<bool, CollabError> {
        let projects = self.projects.lock().unwrap();
        Ok(projects.get(project_id).is_some_and(|p| {
            p.owner == user_id || p.collaborators.iter().any(|(id, _)| id == user_id)
        }))
    }

    async fn project_members(&self, project_id: &str) -> Result<Vec<ProjectMember>, CollabError> {
        let projects = self.projects.lock().unwrap();
        let project = projects
            .get(project_id)
            .ok_or(CollabError::NotFound("project"))?;

        let mut members = vec![ProjectMember {
            user_id: project.owner.clone(),
            role: ProjectRole::Owner,
        }];
        members.extend(project.collaborators.iter().map(|(id, role)| ProjectMember {
            user_id: id.clone(),
            role: *role,
        }));
        Ok(members)
    }

    async fn user_identity(&self, user_id: &str) -> Result<UserIdentity, CollabError> {
        self.users
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .ok_or(CollabError::NotFound("user"))
    }
}

#[async_trait]
impl FileStore for MemoryWorkspace {
    async fn file_content(&self, file_id: &str) -> Result<Option<String>, CollabError> {
        Ok(self.files.lock().unwrap().get(file_id).cloned())
    }

    async fn save_file_content(&self, file_id: &str, content: &str) -> Result<(), CollabError> {
        self.files
            .lock()
            .unwrap()
            .insert(file_id.to_string(), content.to_string());
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MemoryWorkspace {
    async fn save_message(
        &self,
        _project_id: &str,
        _user_id: &str,
        _content: &str,
    ) -> Result<StoredMessage, CollabError> {
        Ok(StoredMessage {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
        })
    }
}

#[async_trait]
impl ActivitySink for MemoryWorkspace {
    async fn append(&self, record: ActivityRecord) -> Result<(), CollabError> {
        self.activities.lock().unwrap().push(record);
        Ok(())
    }
}
