//! Durable collaboration activity records.
//!
//! Write-only from the coordinator's perspective: records are handed to
//! the external [`ActivitySink`](crate::providers::ActivitySink) in the
//! order the coordinator issues them, with no transactional link to the
//! broadcasts that accompany them. A failed append is logged and the
//! broadcast proceeds regardless.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Activity type tags, matching the audit vocabulary of the surrounding
/// system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    UserJoined,
    UserLeft,
    FileUpdated,
    VoiceCallStarted,
    VoiceCallEnded,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityRecord {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    #[serde(rename = "projectId")]
    pub project_id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "fileId", skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl ActivityRecord {
    pub fn new(kind: ActivityKind, project_id: &str, user_id: &str) -> Self {
        Self {
            kind,
            project_id: project_id.to_string(),
            user_id: user_id.to_string(),
            file_id: None,
            metadata: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_file(mut self, file_id: &str) -> Self {
        self.file_id = Some(file_id.to_string());
        self
    }
}
