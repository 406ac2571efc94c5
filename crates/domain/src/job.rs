use std::fmt;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::post::ModerationStatus;
use crate::util::uuid_v7_without_dashes;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobContentType {
    Text,
    Image,
}

impl fmt::Display for JobContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Image => write!(f, "image"),
        }
    }
}

/// One content unit the job factory carved out of a post snapshot.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobSpec {
    pub source_field: String,
    pub content_type: JobContentType,
    pub payload: String,
}

impl JobSpec {
    pub fn text(source_field: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            source_field: source_field.into(),
            content_type: JobContentType::Text,
            payload: payload.into(),
        }
    }

    pub fn image(source_field: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            source_field: source_field.into(),
            content_type: JobContentType::Image,
            payload: payload.into(),
        }
    }
}

/// Moderation of exactly one content unit of one post edition.
///
/// `post_version` pins the job to an immutable edition and never changes;
/// staleness is detected by comparing it against the post's current version.
/// `(post_id, post_version, source_field)` is unique in the store.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModerationJob {
    pub id: String,
    pub post_id: String,
    pub post_version: i64,
    pub source_field: String,
    pub content_type: JobContentType,
    pub payload: String,
    pub status: ModerationStatus,
    pub error_message: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl ModerationJob {
    pub fn from_spec(spec: JobSpec, post_id: impl Into<String>, post_version: i64, now_ms: i64) -> Self {
        Self {
            id: uuid_v7_without_dashes(),
            post_id: post_id.into(),
            post_version,
            source_field: spec.source_field,
            content_type: spec.content_type,
            payload: spec.payload,
            status: ModerationStatus::Pending,
            error_message: None,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ModerationStatus::Pending
    }

    /// Single-shot transition out of `pending`. A job that already reached a
    /// terminal state never changes again, and `pending` is not a valid
    /// resolution target.
    pub fn resolve(
        &mut self,
        status: ModerationStatus,
        error_message: Option<String>,
        now_ms: i64,
    ) -> DomainResult<()> {
        if !status.is_terminal() {
            return Err(DomainError::Validation(
                "jobs cannot be resolved back to pending".to_string(),
            ));
        }
        if self.status.is_terminal() {
            return Err(DomainError::Conflict);
        }
        self.status = status;
        self.error_message = error_message;
        self.updated_at_ms = now_ms;
        Ok(())
    }
}
