use serde::{Deserialize, Serialize};

use crate::job::{JobContentType, ModerationJob};
use crate::post::ModerationStatus;

/// Outbound "job requested" event, one per created job. The job id doubles
/// as the transport-level correlation identifier.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobRequestedMessage {
    pub job_id: String,
    pub post_id: String,
    pub post_version: i64,
    pub source_field: String,
    pub content_type: JobContentType,
    pub payload: String,
}

impl JobRequestedMessage {
    pub fn for_job(job: &ModerationJob) -> Self {
        Self {
            job_id: job.id.clone(),
            post_id: job.post_id.clone(),
            post_version: job.post_version,
            source_field: job.source_field.clone(),
            content_type: job.content_type,
            payload: job.payload.clone(),
        }
    }
}

/// Inbound "job completed" event. Workers are not trusted to produce a
/// well-formed payload, so every field is optional and unknown fields are
/// ignored; the reconciler decides what is droppable.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobResultMessage {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub status: Option<ModerationStatus>,
    #[serde(default)]
    pub error_message: Option<String>,
}
