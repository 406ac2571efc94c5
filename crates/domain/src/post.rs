use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Terminal-or-pending moderation outcome, shared by jobs and posts.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Rejected,
    Failed,
}

impl ModerationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationStatusParseError {
    Unknown,
}

impl fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for ModerationStatus {
    type Err = ModerationStatusParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "failed" => Ok(Self::Failed),
            _ => Err(ModerationStatusParseError::Unknown),
        }
    }
}

/// Image attachment as seen by the job factory.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostImage {
    pub id: String,
    pub url: String,
}

/// The moderatable content of one post edition, captured at orchestration
/// time. Everything else about the post belongs to the CRUD layer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostSnapshot {
    pub post_id: String,
    pub version: i64,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub images: Vec<PostImage>,
}

/// What the core reads back from the post store: current version plus the
/// moderation status this core owns.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostHead {
    pub post_id: String,
    pub version: i64,
    pub moderation_status: ModerationStatus,
}
